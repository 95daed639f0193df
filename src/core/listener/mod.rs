// src/core/listener/mod.rs

//! The event-listening loop.
//!
//! The loop waits for at least one queue to exist, subscribes to every
//! queue's channel, drains events for a bounded cycle, and resubscribes
//! whenever the discovered queue set changes. Store outages and dead pub/sub
//! connections are retried; only the shutdown signal ends the loop.

pub mod dispatcher;
pub mod subscription;

pub use dispatcher::EventDispatcher;
pub use subscription::SubscriptionManager;

use crate::core::discovery::QueueDiscovery;
use crate::core::names::QueueName;
use crate::core::store::QueueStore;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{info, warn};

/// Delay between discovery polls while no queue exists yet.
const EMPTY_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Delay before rebuilding the pub/sub connection after it failed.
const RESUBSCRIBE_DELAY: Duration = Duration::from_secs(1);

/// Outcome of one bounded drain cycle.
enum DrainOutcome {
    CycleElapsed,
    SubscriptionLost,
    Shutdown,
}

pub struct ListenerLoop {
    store: Arc<dyn QueueStore>,
    discovery: Arc<QueueDiscovery>,
    dispatcher: EventDispatcher,
    drain_cycle: Duration,
    receive_timeout: Duration,
}

impl ListenerLoop {
    pub fn new(
        store: Arc<dyn QueueStore>,
        discovery: Arc<QueueDiscovery>,
        dispatcher: EventDispatcher,
        drain_cycle: Duration,
        receive_timeout: Duration,
    ) -> Self {
        Self {
            store,
            discovery,
            dispatcher,
            drain_cycle,
            receive_timeout,
        }
    }

    /// Runs until the shutdown signal fires. The loop never exits on its own.
    pub async fn run(self, mut shutdown_rx: broadcast::Receiver<()>) {
        info!("Event listener started.");
        loop {
            let Some(queues) = self.wait_for_queues(&mut shutdown_rx).await else {
                break;
            };

            let subscriber = match self.store.subscriber().await {
                Ok(subscriber) => subscriber,
                Err(e) => {
                    warn!("Failed to open pub/sub connection: {}. Retrying.", e);
                    if backoff(&mut shutdown_rx, RESUBSCRIBE_DELAY).await {
                        break;
                    }
                    continue;
                }
            };

            let mut subscription = SubscriptionManager::new(subscriber);
            if let Err(e) = subscription.subscribe(&queues).await {
                warn!("Subscription failed: {}. Retrying.", e);
                if backoff(&mut shutdown_rx, RESUBSCRIBE_DELAY).await {
                    break;
                }
                continue;
            }

            if self
                .drain_until_shutdown(&mut subscription, &mut shutdown_rx)
                .await
            {
                break;
            }

            // Reaching here means the subscription went bad; rebuild it.
            if backoff(&mut shutdown_rx, RESUBSCRIBE_DELAY).await {
                break;
            }
        }
        info!("Event listener shutting down.");
    }

    /// Polls discovery until at least one queue exists. Returns `None` when
    /// shutdown fires first.
    async fn wait_for_queues(
        &self,
        shutdown_rx: &mut broadcast::Receiver<()>,
    ) -> Option<HashSet<QueueName>> {
        loop {
            match self.discovery.cached_queues().await {
                Ok(queues) if !queues.is_empty() => return Some(queues),
                Ok(_) => warn!("No queues discovered yet. Waiting."),
                Err(e) => warn!("Queue discovery failed: {}", e),
            }
            tokio::select! {
                _ = tokio::time::sleep(EMPTY_POLL_INTERVAL) => {}
                _ = shutdown_rx.recv() => return None,
            }
        }
    }

    /// Repeats drain cycles against one healthy subscription. Returns `true`
    /// when shutdown was observed, `false` when the subscription must be
    /// rebuilt.
    async fn drain_until_shutdown(
        &self,
        subscription: &mut SubscriptionManager,
        shutdown_rx: &mut broadcast::Receiver<()>,
    ) -> bool {
        loop {
            match self.drain_cycle(subscription, shutdown_rx).await {
                DrainOutcome::Shutdown => return true,
                DrainOutcome::SubscriptionLost => return false,
                DrainOutcome::CycleElapsed => {}
            }

            // After each cycle, resubscribe if the queue set changed.
            match self.discovery.cached_queues().await {
                Ok(queues) if queues.is_empty() => {
                    // Cannot subscribe to nothing; hold the current set until
                    // a queue reappears.
                    warn!("Queue set emptied. Keeping the current subscription.");
                }
                Ok(queues) => {
                    if queues != *subscription.channels() {
                        info!("Queue set changed to {} queue(s), resubscribing", queues.len());
                        if let Err(e) = subscription.subscribe(&queues).await {
                            warn!("Resubscription failed: {}", e);
                            return false;
                        }
                    }
                }
                Err(e) => {
                    warn!(
                        "Queue discovery failed: {}. Keeping the current subscription.",
                        e
                    );
                }
            }
        }
    }

    /// One bounded drain cycle: receives and dispatches messages until the
    /// cycle duration elapses on the wall clock.
    async fn drain_cycle(
        &self,
        subscription: &mut SubscriptionManager,
        shutdown_rx: &mut broadcast::Receiver<()>,
    ) -> DrainOutcome {
        let cycle_start = tokio::time::Instant::now();
        while cycle_start.elapsed() < self.drain_cycle {
            let received = tokio::select! {
                result = subscription.receive(self.receive_timeout) => result,
                _ = shutdown_rx.recv() => return DrainOutcome::Shutdown,
            };
            match received {
                Ok(Some(message)) => self.dispatcher.handle(&message.channel, &message.payload),
                Ok(None) => {} // Receive timeout; check the cycle clock again.
                Err(e) => {
                    warn!("Receive failed: {}", e);
                    return DrainOutcome::SubscriptionLost;
                }
            }
        }
        DrainOutcome::CycleElapsed
    }
}

/// Sleeps for `delay` unless shutdown fires first; `true` means shutdown.
async fn backoff(shutdown_rx: &mut broadcast::Receiver<()>, delay: Duration) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(delay) => false,
        _ = shutdown_rx.recv() => true,
    }
}
