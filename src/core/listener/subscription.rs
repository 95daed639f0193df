// src/core/listener/subscription.rs

//! Ownership of the pub/sub subscription state.

use crate::core::errors::ExporterError;
use crate::core::names::QueueName;
use crate::core::store::{MessageKind, StoreMessage, StoreSubscriber};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info};

/// Sole owner of the subscribed channel set. Every change goes through
/// [`subscribe`](SubscriptionManager::subscribe), which replaces the set
/// wholesale.
pub struct SubscriptionManager {
    subscriber: Box<dyn StoreSubscriber>,
    subscribed: HashSet<QueueName>,
}

impl SubscriptionManager {
    pub fn new(subscriber: Box<dyn StoreSubscriber>) -> Self {
        Self {
            subscriber,
            subscribed: HashSet::new(),
        }
    }

    /// The currently subscribed queue set.
    pub fn channels(&self) -> &HashSet<QueueName> {
        &self.subscribed
    }

    pub fn is_active(&self) -> bool {
        !self.subscribed.is_empty()
    }

    /// Replaces the subscription with `queues`: unsubscribes everything
    /// currently registered, then subscribes the new set. An empty set is a
    /// caller error, never a silent no-op.
    pub async fn subscribe(&mut self, queues: &HashSet<QueueName>) -> Result<(), ExporterError> {
        if queues.is_empty() {
            return Err(ExporterError::EmptySubscription);
        }

        if !self.subscribed.is_empty() {
            let previous: Vec<String> = self
                .subscribed
                .iter()
                .map(|queue| queue.cleaned().to_string())
                .collect();
            self.subscriber.unsubscribe(&previous).await?;
        }

        let channels: Vec<String> = queues
            .iter()
            .map(|queue| queue.cleaned().to_string())
            .collect();
        self.subscriber.subscribe(&channels).await?;
        self.subscribed = queues.clone();

        info!("Subscribed to {} queue channel(s)", channels.len());
        Ok(())
    }

    /// Polls for one application payload, returning `None` on timeout.
    /// Control acknowledgements are drained here and never surface.
    pub async fn receive(
        &mut self,
        timeout: Duration,
    ) -> Result<Option<StoreMessage>, ExporterError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                return Ok(None);
            }
            match self.subscriber.next_message(remaining).await? {
                Some(message) if message.kind == MessageKind::Control => {
                    debug!("Dropped control message on channel '{}'", message.channel);
                }
                other => return Ok(other),
            }
        }
    }
}
