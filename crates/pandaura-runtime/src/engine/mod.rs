//! Scan-cycle engine state and accessors.

mod cycle;
mod faults;
mod latency;
mod metrics;
mod physics;

pub use cycle::CycleReport;
pub use faults::{ActiveFault, FaultConfig, FaultInjector, FaultKind, FaultRecord};
pub use latency::{LatencyQueue, QueuedWrite, WriteKind};
pub use metrics::EngineMetrics;
pub use physics::{default_rules, Drive, PhysicsRule};

use indexmap::IndexMap;
use pandaura_syntax::ast::Program;
use serde::Serialize;
use smol_str::SmolStr;

use crate::error::RuntimeError;
use crate::events::{EventHub, TagEvent};
use crate::memory::Cells;
use crate::program::load_declarations;
use crate::value::{rounded, Value};

/// Integer wrap range applied by the overflow pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverflowRange {
    /// Signed 16-bit `[-32768, 32767]`.
    #[default]
    Int16,
    /// Signed 32-bit, opt-in for DINT-heavy programs.
    Int32,
}

impl OverflowRange {
    /// Inclusive bounds of the wrap range.
    #[must_use]
    pub fn bounds(self) -> (i64, i64) {
        match self {
            OverflowRange::Int16 => (i64::from(i16::MIN), i64::from(i16::MAX)),
            OverflowRange::Int32 => (i64::from(i32::MIN), i64::from(i32::MAX)),
        }
    }
}

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Scan interval in milliseconds (legacy deployments run at 100).
    pub scan_time_ms: i64,
    /// Watchdog budget for one program execution, milliseconds.
    pub watchdog_limit_ms: u64,
    /// Base I/O latency, milliseconds.
    pub latency_base_ms: f64,
    /// Latency jitter amplitude, milliseconds.
    pub latency_jitter_ms: f64,
    /// Integer wrap range.
    pub overflow_range: OverflowRange,
    /// Abort the loop on a runtime error instead of logging and continuing.
    pub stop_on_error: bool,
    /// Physics pairing table.
    pub physics: Vec<PhysicsRule>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            scan_time_ms: 10,
            watchdog_limit_ms: 50,
            latency_base_ms: 2.0,
            latency_jitter_ms: 0.5,
            overflow_range: OverflowRange::default(),
            stop_on_error: false,
            physics: physics::default_rules(),
        }
    }
}

/// Overflow exception recorded by the wrap pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OverflowException {
    /// Offending cell.
    pub tag: SmolStr,
    /// Cycle in which the wrap happened.
    pub cycle: u64,
}

/// Background alert surfaced through the control status query.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EngineAlert {
    /// Program execution exceeded the watchdog budget.
    WatchdogTimeout {
        /// Offending cycle.
        cycle: u64,
        /// Measured execution time, microseconds.
        elapsed_us: u64,
    },
    /// An integer cell wrapped.
    IntOverflow {
        /// Offending cell.
        tag: SmolStr,
        /// Offending cycle.
        cycle: u64,
    },
    /// A runtime error faulted the cycle; the loop continued.
    RuntimeFault {
        /// Error text.
        message: String,
        /// Offending cycle.
        cycle: u64,
    },
}

/// Point-in-time engine status.
#[derive(Debug, Clone, Serialize)]
pub struct EngineStatus {
    /// Cycles executed.
    pub scan_count: u64,
    /// Configured interval.
    pub scan_time_ms: i64,
    /// Names of tags with an active fault.
    pub active_faults: Vec<SmolStr>,
    /// Registered subscribers.
    pub subscribers: usize,
    /// Mean cycle duration, microseconds.
    pub mean_cycle_us: u64,
    /// Longest cycle, microseconds.
    pub max_cycle_us: u64,
    /// Watchdog events since start.
    pub watchdog_events: u64,
    /// Overflow exceptions since start.
    pub overflow_events: u64,
    /// Most recent runtime error, if any.
    pub last_error: Option<String>,
}

/// The scan-cycle engine.
///
/// Owns the compiled program, the variable cells and every per-cycle
/// subsystem. Single logical execution line: a tick is atomic, and all
/// externally visible state is sampled between ticks.
pub struct ScanEngine {
    pub(super) program: Program,
    pub(super) cells: Cells,
    pub(super) config: ScanConfig,
    pub(super) scan_count: u64,
    pub(super) inbox: LatencyQueue,
    pub(super) outbox: LatencyQueue,
    pub(super) faults: FaultInjector,
    pub(super) exceptions: Vec<OverflowException>,
    pub(super) alerts: Vec<EngineAlert>,
    pub(super) hub: EventHub,
    pub(super) metrics: EngineMetrics,
    pub(super) last_error: Option<RuntimeError>,
}

impl ScanEngine {
    /// Compile-load a program into a fresh engine.
    pub fn new(program: Program, config: ScanConfig, now_ms: i64) -> Result<Self, RuntimeError> {
        let mut cells = Cells::new();
        load_declarations(&program, &mut cells, now_ms)?;
        let inbox = LatencyQueue::new(config.latency_base_ms, config.latency_jitter_ms);
        let outbox = LatencyQueue::new(config.latency_base_ms, config.latency_jitter_ms);
        Ok(Self {
            program,
            cells,
            config,
            scan_count: 0,
            inbox,
            outbox,
            faults: FaultInjector::new(),
            exceptions: Vec::new(),
            alerts: Vec::new(),
            hub: EventHub::new(),
            metrics: EngineMetrics::default(),
            last_error: None,
        })
    }

    /// Replace the active program, reloading all cells.
    pub fn swap_program(&mut self, program: Program, now_ms: i64) -> Result<(), RuntimeError> {
        self.program = program;
        self.reset(now_ms)
    }

    /// Tear down cells and FB instances and re-evaluate initialisers.
    /// The compiled program is retained.
    pub fn reset(&mut self, now_ms: i64) -> Result<(), RuntimeError> {
        self.cells.clear();
        load_declarations(&self.program, &mut self.cells, now_ms)?;
        self.scan_count = 0;
        self.inbox.clear();
        self.outbox.clear();
        self.faults.clear();
        self.exceptions.clear();
        self.alerts.clear();
        self.metrics = EngineMetrics::default();
        self.last_error = None;
        Ok(())
    }

    /// External variable write, serialised by the caller onto the loop.
    ///
    /// Output-named tags route through the latency outbox; everything else
    /// lands directly, rounded like any engine write.
    pub fn write_variable(
        &mut self,
        name: &str,
        value: Value,
        now_ms: i64,
    ) -> Result<(), RuntimeError> {
        if is_output_name(name) {
            self.outbox
                .push(name.into(), rounded(value), now_ms, WriteKind::Apply);
            Ok(())
        } else {
            self.cells.set(name, rounded(value))
        }
    }

    /// Queue a mirrored input write through the latency inbox.
    ///
    /// Used by sync bridges mirroring live I/O; the value reaches the cell
    /// once it matures at `base ± jitter`.
    pub fn queue_input(&mut self, name: impl Into<SmolStr>, value: Value, now_ms: i64) {
        self.inbox
            .push(name.into(), rounded(value), now_ms, WriteKind::Apply);
    }

    /// Read a single variable.
    #[must_use]
    pub fn read_variable(&self, name: &str) -> Option<Value> {
        self.cells.get(name).cloned()
    }

    /// Read a member of a function-block instance cell (e.g. `T1.Q`).
    #[must_use]
    pub fn read_member(&self, name: &str, field: &str) -> Option<Value> {
        match self.cells.get(name) {
            Some(Value::Instance(id)) => self.cells.instance_var(*id, field).cloned(),
            _ => None,
        }
    }

    /// Snapshot all cell values.
    #[must_use]
    pub fn snapshot_variables(&self) -> IndexMap<SmolStr, Value> {
        self.cells.snapshot()
    }

    /// Schedule a fault injection.
    pub fn inject_fault(&mut self, config: FaultConfig, now_ms: i64) -> SmolStr {
        self.faults.inject(config, now_ms)
    }

    /// Remove a pending or active fault by target tag.
    pub fn remove_fault(&mut self, target: &str, now_ms: i64) -> bool {
        self.faults.remove(target, now_ms)
    }

    /// Register an event subscriber; empty filter receives all tags.
    pub fn subscribe(&mut self, tags: Vec<SmolStr>) -> std::sync::mpsc::Receiver<TagEvent> {
        self.hub.subscribe(tags)
    }

    /// Current status snapshot.
    #[must_use]
    pub fn status(&self) -> EngineStatus {
        EngineStatus {
            scan_count: self.scan_count,
            scan_time_ms: self.config.scan_time_ms,
            active_faults: self
                .faults
                .active()
                .iter()
                .map(|fault| fault.config.target.clone())
                .collect(),
            subscribers: self.hub.subscriber_count(),
            mean_cycle_us: self.metrics.mean_cycle_us(),
            max_cycle_us: self.metrics.max_cycle_us,
            watchdog_events: self.metrics.watchdog_events,
            overflow_events: self.metrics.overflow_events,
            last_error: self.last_error.as_ref().map(ToString::to_string),
        }
    }

    /// Cycles executed so far.
    #[must_use]
    pub fn scan_count(&self) -> u64 {
        self.scan_count
    }

    /// Engine configuration.
    #[must_use]
    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Recorded overflow exceptions.
    #[must_use]
    pub fn exceptions(&self) -> &[OverflowException] {
        &self.exceptions
    }

    /// Fault injector state.
    #[must_use]
    pub fn faults(&self) -> &FaultInjector {
        &self.faults
    }

    /// Drain accumulated background alerts.
    pub fn take_alerts(&mut self) -> Vec<EngineAlert> {
        std::mem::take(&mut self.alerts)
    }

    /// Cycle metrics.
    #[must_use]
    pub fn metrics(&self) -> &EngineMetrics {
        &self.metrics
    }
}

impl std::fmt::Debug for ScanEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanEngine")
            .field("scan_count", &self.scan_count)
            .field("scan_time_ms", &self.config.scan_time_ms)
            .field("inbox", &self.inbox.len())
            .field("outbox", &self.outbox.len())
            .field("last_error", &self.last_error)
            .finish()
    }
}

/// Output naming convention: prefix `Output`, suffix `_OUT`, or any
/// occurrence of `OUTPUT` regardless of case.
#[must_use]
pub fn is_output_name(name: &str) -> bool {
    name.starts_with("Output")
        || name.ends_with("_OUT")
        || name.to_ascii_uppercase().contains("OUTPUT")
}
