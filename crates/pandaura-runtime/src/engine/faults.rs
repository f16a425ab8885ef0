//! Fault injection.
//!
//! Active faults are keyed by target tag; injecting a new fault on a tag
//! replaces the previous one. Expired faults move to a bounded history.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use tracing::info;

use crate::memory::Cells;
use crate::value::{round2, Value};

/// Kind of injected fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FaultKind {
    /// Ramp the target at `parameter` units per second.
    ValueDrift,
    /// Force the target to the value it held at activation.
    LockValue,
    /// Raise the `<target>_ERROR` companion tag while active.
    ForceIoError,
}

/// Injection request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaultConfig {
    /// Target tag name.
    pub target: SmolStr,
    /// Fault kind.
    pub kind: FaultKind,
    /// Kind-specific parameter (drift rate per second).
    #[serde(default)]
    pub parameter: f64,
    /// Active duration once started.
    pub duration_ms: i64,
    /// Defer activation relative to the request.
    #[serde(default)]
    pub delay_ms: i64,
}

/// An activated fault.
#[derive(Debug, Clone)]
pub struct ActiveFault {
    /// Generated identifier.
    pub id: SmolStr,
    /// Request this fault was made from.
    pub config: FaultConfig,
    /// Activation timestamp.
    pub start_ms: i64,
    /// Expiry deadline (`start + duration`).
    pub end_ms: i64,
    state: FaultState,
}

#[derive(Debug, Clone)]
enum FaultState {
    Drift { value: f64, last_update_ms: i64 },
    Lock { value: Value },
    IoError,
}

/// History entry for an expired or removed fault.
#[derive(Debug, Clone, Serialize)]
pub struct FaultRecord {
    /// Fault id.
    pub id: SmolStr,
    /// Target tag.
    pub target: SmolStr,
    /// Fault kind.
    pub kind: FaultKind,
    /// Activation timestamp.
    pub start_ms: i64,
    /// Removal timestamp.
    pub removed_ms: i64,
    /// True when the fault ran its full duration.
    pub expired: bool,
}

const HISTORY_LIMIT: usize = 256;

#[derive(Debug, Clone)]
struct PendingFault {
    id: SmolStr,
    config: FaultConfig,
    activate_at_ms: i64,
}

/// Owns pending and active faults; driven once per scan cycle.
#[derive(Debug, Default)]
pub struct FaultInjector {
    pending: Vec<PendingFault>,
    active: IndexMap<SmolStr, ActiveFault>,
    history: Vec<FaultRecord>,
    next_id: u64,
}

impl FaultInjector {
    /// Create an empty injector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule an injection; activation may be deferred by `delay_ms`.
    pub fn inject(&mut self, config: FaultConfig, now_ms: i64) -> SmolStr {
        self.next_id += 1;
        let id: SmolStr = format!("fault-{}", self.next_id).into();
        let activate_at_ms = now_ms + config.delay_ms.max(0);
        info!(target = %config.target, kind = ?config.kind, "fault scheduled");
        self.pending.push(PendingFault {
            id: id.clone(),
            config,
            activate_at_ms,
        });
        id
    }

    /// Remove any pending or active fault on `target`.
    pub fn remove(&mut self, target: &str, now_ms: i64) -> bool {
        let pending_before = self.pending.len();
        self.pending.retain(|p| p.config.target != target);
        let removed_pending = self.pending.len() != pending_before;
        match self.active.shift_remove(target) {
            Some(fault) => {
                self.history_push(FaultRecord {
                    id: fault.id,
                    target: fault.config.target,
                    kind: fault.config.kind,
                    start_ms: fault.start_ms,
                    removed_ms: now_ms,
                    expired: false,
                });
                true
            }
            None => removed_pending,
        }
    }

    /// Activate due injections, apply active faults, expire finished ones.
    ///
    /// Called once per cycle, after the latency inbox and before program
    /// execution.
    pub fn apply_cycle(&mut self, cells: &mut Cells, now_ms: i64) {
        self.activate_due(cells, now_ms);
        self.expire_finished(cells, now_ms);
        for fault in self.active.values_mut() {
            match &mut fault.state {
                FaultState::Drift {
                    value,
                    last_update_ms,
                } => {
                    let elapsed = (now_ms - *last_update_ms).max(0) as f64;
                    *value += fault.config.parameter * elapsed / 1000.0;
                    *last_update_ms = now_ms;
                    let _ = cells.set(&fault.config.target, Value::Real(round2(*value)));
                }
                FaultState::Lock { value } => {
                    let _ = cells.set(&fault.config.target, value.clone());
                }
                FaultState::IoError => {
                    let companion = error_tag(&fault.config.target);
                    if cells.contains(&companion) {
                        let _ = cells.set(&companion, Value::Bool(true));
                    }
                }
            }
        }
    }

    fn activate_due(&mut self, cells: &Cells, now_ms: i64) {
        let due: Vec<PendingFault> = {
            let (due, rest): (Vec<_>, Vec<_>) = self
                .pending
                .drain(..)
                .partition(|p| p.activate_at_ms <= now_ms);
            self.pending = rest;
            due
        };
        for pending in due {
            let current = cells.get(&pending.config.target).cloned();
            let state = match pending.config.kind {
                FaultKind::ValueDrift => FaultState::Drift {
                    value: current.as_ref().and_then(Value::as_f64).unwrap_or(0.0),
                    last_update_ms: now_ms,
                },
                FaultKind::LockValue => FaultState::Lock {
                    value: current.unwrap_or(Value::Real(0.0)),
                },
                FaultKind::ForceIoError => FaultState::IoError,
            };
            let fault = ActiveFault {
                id: pending.id,
                end_ms: now_ms + pending.config.duration_ms.max(0),
                start_ms: now_ms,
                config: pending.config,
                state,
            };
            // Replaces an existing fault on the same target.
            self.active.insert(fault.config.target.clone(), fault);
        }
    }

    fn expire_finished(&mut self, cells: &mut Cells, now_ms: i64) {
        let expired: Vec<SmolStr> = self
            .active
            .values()
            .filter(|fault| now_ms >= fault.end_ms)
            .map(|fault| fault.config.target.clone())
            .collect();
        for target in expired {
            if let Some(fault) = self.active.shift_remove(&target) {
                if fault.config.kind == FaultKind::ForceIoError {
                    let companion = error_tag(&target);
                    if cells.contains(&companion) {
                        let _ = cells.set(&companion, Value::Bool(false));
                    }
                }
                info!(target = %target, "fault expired");
                self.history_push(FaultRecord {
                    id: fault.id,
                    target: fault.config.target,
                    kind: fault.config.kind,
                    start_ms: fault.start_ms,
                    removed_ms: now_ms,
                    expired: true,
                });
            }
        }
    }

    fn history_push(&mut self, record: FaultRecord) {
        if self.history.len() >= HISTORY_LIMIT {
            self.history.remove(0);
        }
        self.history.push(record);
    }

    /// Active faults in activation order.
    #[must_use]
    pub fn active(&self) -> Vec<&ActiveFault> {
        self.active.values().collect()
    }

    /// True when a fault is active on `target`.
    #[must_use]
    pub fn is_active(&self, target: &str) -> bool {
        self.active.contains_key(target)
    }

    /// Expired/removed fault records, oldest first.
    #[must_use]
    pub fn history(&self) -> &[FaultRecord] {
        &self.history
    }

    /// Drop all pending and active faults without history entries.
    pub fn clear(&mut self) {
        self.pending.clear();
        self.active.clear();
    }
}

fn error_tag(target: &str) -> SmolStr {
    format!("{target}_ERROR").into()
}
