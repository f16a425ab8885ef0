//! The sync/command surface over a running engine.
//!
//! Owns the engine control handle plus the storage handles, and translates
//! external commands into core operations. Variable writes and fault
//! injections are serialised onto the scan loop; reads are snapshots taken
//! between ticks.

use std::sync::mpsc;

use pandaura_runtime::engine::{EngineAlert, FaultConfig};
use pandaura_runtime::events::TagEvent;
use pandaura_runtime::scheduler::{Clock, EngineControl, EngineState};
use pandaura_runtime::Value;
use pandaura_store::rows::Stage;
use pandaura_store::Store;
use pandaura_syntax::validate::ValidationReport;
use pandaura_vault::blob::BlobStore;
use pandaura_vault::snapshots::PromotionOutcome;
use pandaura_vault::VersionEngine;
use serde::Serialize;
use smol_str::SmolStr;
use tracing::info;

use crate::error::ControlError;
use crate::events::Event;

/// Where a logic push lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushTarget {
    /// The shadow runtime; free to iterate.
    Shadow,
    /// The live runtime; advisory warnings apply.
    Live,
}

/// Advisory raised by a live push.
#[derive(Debug, Clone, Serialize)]
pub struct PushAdvisory {
    /// Stable advisory code.
    pub code: &'static str,
    /// Human-readable description.
    pub message: String,
}

/// Outcome of a logic push.
#[derive(Debug, Clone, Serialize)]
pub struct PushReport {
    /// `shadow` or `live`.
    pub target: String,
    /// Advisories; empty for shadow pushes.
    pub warnings: Vec<PushAdvisory>,
}

/// Live pushes larger than this raise a size advisory.
pub const LIVE_PUSH_SIZE_WARNING: usize = 256 * 1024;

/// The command surface.
pub struct SyncSurface<C: Clock + Clone> {
    engine: EngineControl<C>,
    store: Store,
    blobs: BlobStore,
}

impl<C: Clock + Clone> SyncSurface<C> {
    /// Assemble the surface over a running engine and its storage.
    #[must_use]
    pub fn new(engine: EngineControl<C>, store: Store, blobs: BlobStore) -> Self {
        Self {
            engine,
            store,
            blobs,
        }
    }

    /// The persistence handle, for project/tag/logic verbs.
    #[must_use]
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// A version engine over this surface's storage.
    #[must_use]
    pub fn versions(&self) -> VersionEngine<'_> {
        VersionEngine::new(&self.store, &self.blobs)
    }

    /// A deployment engine over this surface's storage.
    #[must_use]
    pub fn deploys(&self) -> pandaura_deploy::DeployEngine<'_> {
        pandaura_deploy::DeployEngine::new(&self.store, &self.blobs)
    }

    /// The engine control handle.
    #[must_use]
    pub fn engine(&self) -> &EngineControl<C> {
        &self.engine
    }

    /// Write a variable into the runtime. Output-named tags take the
    /// latency outbox; the write lands before step 1 of the next tick.
    pub fn set_variable(
        &self,
        tag: impl Into<SmolStr>,
        value: Value,
    ) -> Result<(), ControlError> {
        Ok(self.engine.write_variable(tag, value)?)
    }

    /// Schedule a fault injection.
    pub fn inject_fault(&self, config: FaultConfig) -> Result<(), ControlError> {
        Ok(self.engine.inject_fault(config)?)
    }

    /// Remove a fault by target tag.
    pub fn remove_fault(&self, target: impl Into<SmolStr>) -> Result<(), ControlError> {
        Ok(self.engine.remove_fault(target)?)
    }

    /// Validate logic without touching any runtime.
    #[must_use]
    pub fn validate_logic(&self, content: &str) -> ValidationReport {
        pandaura_syntax::validate::validate(content)
    }

    /// Push a logic file onto a runtime. The content is validated first;
    /// live pushes also collect advisory warnings.
    pub fn push_logic(
        &self,
        logic_id: &str,
        target: PushTarget,
    ) -> Result<PushReport, ControlError> {
        let file = self.store.get_logic_file(logic_id)?;
        let report = self.validate_logic(&file.content);
        if !report.is_valid {
            let first = report
                .issues
                .iter()
                .find(|i| i.severity == pandaura_syntax::validate::Severity::Error);
            return Err(ControlError::InvalidLogic(match first {
                Some(issue) => format!("{}:{}: {}", issue.line, issue.column, issue.message),
                None => "validation failed".into(),
            }));
        }

        let warnings = match target {
            PushTarget::Shadow => Vec::new(),
            PushTarget::Live => live_push_advisories(&file.content),
        };

        let program = pandaura_syntax::parse_program(&file.content)
            .map_err(|err| ControlError::InvalidLogic(err.to_string()))?;
        self.engine.swap_program(program)?;
        info!(logic = logic_id, ?target, "logic pushed");
        Ok(PushReport {
            target: match target {
                PushTarget::Shadow => "shadow".into(),
                PushTarget::Live => "live".into(),
            },
            warnings,
        })
    }

    /// Subscribe to `(tag, value, timestamp)` events; empty filter receives
    /// every tag.
    pub fn stream_tags(
        &self,
        tags: Vec<SmolStr>,
    ) -> Result<mpsc::Receiver<TagEvent>, ControlError> {
        Ok(self.engine.subscribe(tags)?)
    }

    /// Engine status as a `systemStatus` event.
    pub fn system_status(&self) -> Result<Event, ControlError> {
        let status = self.engine.status()?;
        Ok(Event::SystemStatus {
            state: state_name(self.engine.state()).into(),
            scan_count: status.scan_count,
            scan_time_ms: status.scan_time_ms,
        })
    }

    /// Drain background alerts as `error` events.
    pub fn drain_alerts(&self) -> Result<Vec<Event>, ControlError> {
        let alerts = self.engine.take_alerts()?;
        Ok(alerts.into_iter().map(alert_event).collect())
    }

    /// External tag names a logic file depends on (declared variables
    /// subtracted).
    pub fn tag_dependencies(&self, logic_id: &str) -> Result<Vec<SmolStr>, ControlError> {
        let file = self.store.get_logic_file(logic_id)?;
        let program = pandaura_syntax::parse_program(&file.content)
            .map_err(|err| ControlError::InvalidLogic(err.to_string()))?;
        Ok(pandaura_syntax::analysis::external_dependencies(&program))
    }

    /// Promote a snapshot through the stage ladder; staging and prod mint
    /// a release.
    pub fn promote_snapshot(
        &self,
        snapshot_id: &str,
        to_stage: Stage,
        promoted_by: &str,
        notes: Option<&str>,
    ) -> Result<PromotionOutcome, ControlError> {
        Ok(self
            .versions()
            .promote_snapshot(snapshot_id, to_stage, promoted_by, notes)?)
    }
}

fn state_name(state: EngineState) -> &'static str {
    match state {
        EngineState::Boot => "boot",
        EngineState::Running => "running",
        EngineState::Paused => "paused",
        EngineState::Stopped => "stopped",
        EngineState::Faulted => "faulted",
    }
}

fn alert_event(alert: EngineAlert) -> Event {
    match alert {
        EngineAlert::WatchdogTimeout { cycle, elapsed_us } => Event::Error {
            message: format!("WATCHDOG_TIMEOUT in cycle {cycle} ({elapsed_us}us)"),
        },
        EngineAlert::IntOverflow { tag, cycle } => Event::Error {
            message: format!("INT_OVERFLOW on {tag} in cycle {cycle}"),
        },
        EngineAlert::RuntimeFault { message, cycle } => Event::Error {
            message: format!("runtime fault in cycle {cycle}: {message}"),
        },
    }
}

/// Validate a tag's alarm thresholds: `low ≤ high ≤ critical` where present.
pub fn validate_alarm_rules(alarms_json: &str) -> Result<(), ControlError> {
    #[derive(serde::Deserialize)]
    struct Alarms {
        low: Option<f64>,
        high: Option<f64>,
        critical: Option<f64>,
    }
    let alarms: Alarms = serde_json::from_str(alarms_json)?;
    if let (Some(low), Some(high)) = (alarms.low, alarms.high) {
        if low > high {
            return Err(ControlError::Validation(format!(
                "alarm low {low} exceeds high {high}"
            )));
        }
    }
    if let (Some(high), Some(critical)) = (alarms.high, alarms.critical) {
        if high > critical {
            return Err(ControlError::Validation(format!(
                "alarm high {high} exceeds critical {critical}"
            )));
        }
    }
    Ok(())
}

/// Advisories raised before content reaches a live runtime: emergency-system
/// references, size, and leftover work markers.
#[must_use]
pub fn live_push_advisories(content: &str) -> Vec<PushAdvisory> {
    let mut warnings = Vec::new();
    let upper = content.to_ascii_uppercase();
    for marker in ["EMERGENCY", "E_STOP", "ESTOP", "SAFETY_RELAY"] {
        if upper.contains(marker) {
            warnings.push(PushAdvisory {
                code: "emergency-system-reference",
                message: format!("content references emergency system '{marker}'"),
            });
            break;
        }
    }
    if content.len() > LIVE_PUSH_SIZE_WARNING {
        warnings.push(PushAdvisory {
            code: "oversized-push",
            message: format!(
                "content is {} bytes (threshold {LIVE_PUSH_SIZE_WARNING})",
                content.len()
            ),
        });
    }
    if content.contains("TODO") || content.contains("FIXME") {
        warnings.push(PushAdvisory {
            code: "unfinished-markers",
            message: "content contains TODO/FIXME markers".into(),
        });
    }
    warnings
}
