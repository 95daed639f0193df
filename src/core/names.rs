// src/core/names.rs

//! Queue and task naming rules.
//!
//! Huey keeps one Redis list per queue under a fixed key namespace. The part
//! after the namespace prefix is the queue's name; it doubles as the pub/sub
//! channel for the queue's events and as a metric label value, so it is
//! reduced to `[a-z0-9]` before use. Task identifiers arrive with a fixed
//! wire prefix that is stripped for display.

use lazy_static::lazy_static;
use regex::Regex;
use std::fmt;
use std::hash::{Hash, Hasher};

/// The key namespace under which the store keeps one list key per queue.
pub const QUEUE_KEY_PREFIX: &str = "huey.redis.";

/// The prefix Huey prepends to task identifiers on the wire.
pub const TASK_NAME_PREFIX: &str = "queue_task_";

lazy_static! {
    /// Everything outside `[a-z0-9]` is removed (not transliterated), so the
    /// result is safe as both a channel name and a label value.
    static ref UNSAFE_NAME_CHARS: Regex =
        Regex::new("[^a-z0-9]").expect("static pattern compiles");
}

/// Removes every character outside `[a-z0-9]`. Idempotent.
pub fn clean_queue_name(raw: &str) -> String {
    UNSAFE_NAME_CHARS.replace_all(raw, "").into_owned()
}

/// Strips the task wire prefix. Names without the prefix pass through
/// unchanged.
pub fn clean_task_name(raw: &str) -> &str {
    raw.strip_prefix(TASK_NAME_PREFIX).unwrap_or(raw)
}

/// A discovered queue: the raw store-facing name paired with its cleaned
/// form.
///
/// Equality and hashing use the cleaned form only. Two raw names that clean
/// to the same string are the same queue as far as subscriptions and labels
/// are concerned; the raw form is kept purely to rebuild the store key.
#[derive(Debug, Clone)]
pub struct QueueName {
    raw: String,
    cleaned: String,
}

impl QueueName {
    pub fn from_raw(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let cleaned = clean_queue_name(&raw);
        Self { raw, cleaned }
    }

    /// Builds a queue name from a full store key. Returns `None` for keys
    /// outside the queue namespace.
    pub fn from_store_key(key: &str) -> Option<Self> {
        key.strip_prefix(QUEUE_KEY_PREFIX).map(Self::from_raw)
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn cleaned(&self) -> &str {
        &self.cleaned
    }

    /// The store key whose list holds this queue's backlog.
    pub fn store_key(&self) -> String {
        format!("{QUEUE_KEY_PREFIX}{}", self.raw)
    }
}

impl PartialEq for QueueName {
    fn eq(&self, other: &Self) -> bool {
        self.cleaned == other.cleaned
    }
}

impl Eq for QueueName {}

impl Hash for QueueName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.cleaned.hash(state);
    }
}

impl fmt::Display for QueueName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.cleaned)
    }
}
