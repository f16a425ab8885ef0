//! I/O latency modelling.
//!
//! Writes travelling between the outside world and the runtime sit in a
//! queue until they mature at `base ± jitter` milliseconds. Each entry is
//! delivered exactly once, in enqueue order.

use std::collections::VecDeque;

use rand::Rng;
use smol_str::SmolStr;

use crate::value::Value;

/// What happens when an entry matures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteKind {
    /// Write the value into the runtime cell.
    Apply,
    /// Deliver the value to the event stream without touching the cell.
    Publish,
}

/// A queued write waiting to mature.
#[derive(Debug, Clone)]
pub struct QueuedWrite {
    /// Target tag.
    pub tag: SmolStr,
    /// Value to deliver.
    pub value: Value,
    /// Enqueue timestamp, epoch milliseconds.
    pub enqueued_ms: i64,
    /// Sampled latency for this entry.
    pub latency_ms: f64,
    /// Maturation behaviour.
    pub kind: WriteKind,
}

/// FIFO latency queue with per-entry jittered latency.
#[derive(Debug)]
pub struct LatencyQueue {
    base_ms: f64,
    jitter_ms: f64,
    entries: VecDeque<QueuedWrite>,
}

impl LatencyQueue {
    /// Create a queue with the given base latency and jitter amplitude.
    #[must_use]
    pub fn new(base_ms: f64, jitter_ms: f64) -> Self {
        Self {
            base_ms,
            jitter_ms,
            entries: VecDeque::new(),
        }
    }

    /// Enqueue a write, sampling its latency once.
    pub fn push(&mut self, tag: SmolStr, value: Value, now_ms: i64, kind: WriteKind) {
        let jitter = if self.jitter_ms > 0.0 {
            rand::thread_rng().gen_range(-self.jitter_ms..=self.jitter_ms)
        } else {
            0.0
        };
        self.entries.push_back(QueuedWrite {
            tag,
            value,
            enqueued_ms: now_ms,
            latency_ms: (self.base_ms + jitter).max(0.0),
            kind,
        });
    }

    /// Pop every matured entry, preserving enqueue order.
    pub fn drain_mature(&mut self, now_ms: i64) -> Vec<QueuedWrite> {
        let mut mature = Vec::new();
        // Entries mature in enqueue order because latency jitter is bounded
        // well below the scan interval; a later entry maturing first would
        // still be delivered after its predecessors.
        while self
            .entries
            .front()
            .is_some_and(|front| (now_ms - front.enqueued_ms) as f64 >= front.latency_ms)
        {
            if let Some(entry) = self.entries.pop_front() {
                mature.push(entry);
            }
        }
        mature
    }

    /// Entries still waiting.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop all queued entries.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
