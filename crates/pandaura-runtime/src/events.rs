//! Tag event stream.
//!
//! Subscribers receive `(tag, value, timestamp)` events in intra-tick write
//! order over bounded channels. A slow subscriber loses messages rather than
//! stalling the scan loop; a disconnected subscriber is dropped on the next
//! publish.

use std::sync::mpsc;

use rustc_hash::FxHashSet;
use serde::Serialize;
use smol_str::SmolStr;
use tracing::debug;

use crate::value::Value;

/// One variable-update event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TagEvent {
    /// Tag name.
    pub tag: SmolStr,
    /// Value after the write.
    pub value: Value,
    /// Scan-cycle timestamp, epoch milliseconds.
    pub timestamp_ms: i64,
}

/// Per-subscriber channel capacity before messages are dropped.
pub const SUBSCRIBER_CAPACITY: usize = 256;

struct Subscriber {
    /// Tags of interest; `None` subscribes to everything.
    filter: Option<FxHashSet<SmolStr>>,
    tx: mpsc::SyncSender<TagEvent>,
    lost: u64,
    disconnected: bool,
}

/// Fan-out hub owned by the scan engine.
#[derive(Default)]
pub struct EventHub {
    subscribers: Vec<Subscriber>,
}

impl EventHub {
    /// Create an empty hub.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber; `tags` empty means all tags.
    pub fn subscribe(&mut self, tags: Vec<SmolStr>) -> mpsc::Receiver<TagEvent> {
        let (tx, rx) = mpsc::sync_channel(SUBSCRIBER_CAPACITY);
        let filter = if tags.is_empty() {
            None
        } else {
            Some(tags.into_iter().collect())
        };
        self.subscribers.push(Subscriber {
            filter,
            tx,
            lost: 0,
            disconnected: false,
        });
        rx
    }

    /// Publish one event to every interested subscriber.
    pub fn publish(&mut self, event: &TagEvent) {
        for sub in &mut self.subscribers {
            if let Some(filter) = &sub.filter {
                if !filter.contains(&event.tag) {
                    continue;
                }
            }
            match sub.tx.try_send(event.clone()) {
                Ok(()) => {}
                Err(mpsc::TrySendError::Full(_)) => {
                    sub.lost = sub.lost.saturating_add(1);
                }
                Err(mpsc::TrySendError::Disconnected(_)) => {
                    sub.disconnected = true;
                }
            }
        }
        let before = self.subscribers.len();
        self.subscribers.retain(|sub| !sub.disconnected);
        if self.subscribers.len() != before {
            debug!(
                remaining = self.subscribers.len(),
                "dropped disconnected tag subscribers"
            );
        }
    }

    /// Number of registered subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Total messages dropped across subscribers since startup.
    #[must_use]
    pub fn lost_total(&self) -> u64 {
        self.subscribers.iter().map(|sub| sub.lost).sum()
    }
}
