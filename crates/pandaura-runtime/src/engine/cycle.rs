//! Scan-cycle execution.
//!
//! One tick performs, in this exact order: publish system variables, drain
//! the I/O latency inbox, apply fault injections, execute the program under
//! the watchdog, wrap integer overflow, queue outbound I/O, and run the
//! physics post-pass. The write journal captures the intra-tick write order
//! for the event stream.

use tracing::warn;

use super::{physics, EngineAlert, OverflowException, ScanEngine};
use crate::error::RuntimeError;
use crate::eval::{exec_block, EvalContext};
use crate::events::TagEvent;
use crate::value::{rounded, CellType, Value};

/// Outcome of one tick.
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    /// Watchdog budget was exceeded this cycle.
    pub watchdog: bool,
    /// Cells wrapped by the overflow pass this cycle.
    pub overflowed: Vec<smol_str::SmolStr>,
    /// Runtime error that faulted the cycle (loop continued unless
    /// `stop_on_error`).
    pub error: Option<RuntimeError>,
    /// Variable-update events published this cycle.
    pub events: usize,
}

impl ScanEngine {
    /// Execute one scan cycle at the given timestamp.
    ///
    /// Returns `Err` only when `stop_on_error` is set and the program
    /// faulted; otherwise errors are reported in the [`CycleReport`] and the
    /// loop keeps running.
    pub fn execute_cycle(&mut self, now_ms: i64) -> Result<CycleReport, RuntimeError> {
        let cycle_timer = std::time::Instant::now();
        let mut report = CycleReport::default();
        self.cells.begin_journal();

        // 1. System variables.
        self.scan_count += 1;
        self.publish_system_variables();

        // 2. I/O latency inbox: matured external writes, enqueue order.
        for entry in self.inbox.drain_mature(now_ms) {
            if self.cells.contains(&entry.tag) {
                self.cells.set(&entry.tag, rounded(entry.value))?;
            } else {
                warn!(tag = %entry.tag, "dropping write to unknown tag");
            }
        }

        // 3. Fault injections.
        self.faults.apply_cycle(&mut self.cells, now_ms);

        // 4. Program execution under the watchdog.
        let exec_timer = std::time::Instant::now();
        let result = {
            let mut ctx = EvalContext {
                cells: &mut self.cells,
                now_ms,
            };
            exec_block(&mut ctx, &self.program.body)
        };
        let elapsed_us = exec_timer.elapsed().as_micros() as u64;
        if elapsed_us > self.config.watchdog_limit_ms * 1000 {
            // Exactly one event per offending cycle. A real controller would
            // halt; this engine models the event and keeps running so
            // operators can observe the recovery.
            self.metrics.watchdog_events += 1;
            self.alerts.push(EngineAlert::WatchdogTimeout {
                cycle: self.scan_count,
                elapsed_us,
            });
            report.watchdog = true;
            warn!(cycle = self.scan_count, elapsed_us, "watchdog timeout");
        }
        if let Err(err) = result {
            self.metrics.faulted_cycles += 1;
            self.last_error = Some(err.clone());
            self.alerts.push(EngineAlert::RuntimeFault {
                message: err.to_string(),
                cycle: self.scan_count,
            });
            if self.config.stop_on_error {
                self.cells.end_journal();
                return Err(err);
            }
            report.error = Some(err);
        }

        // 5. Integer overflow wrap.
        report.overflowed = self.wrap_overflows();

        // 6. Matured outbound entries: command writes land in their cells,
        // program output values deliver to the event stream. Then every
        // output-named cell queues for the next delivery window.
        for entry in self.outbox.drain_mature(now_ms) {
            match entry.kind {
                super::WriteKind::Apply => {
                    if self.cells.contains(&entry.tag) {
                        self.cells.set(&entry.tag, rounded(entry.value))?;
                    }
                }
                super::WriteKind::Publish => {
                    self.hub.publish(&TagEvent {
                        tag: entry.tag,
                        value: entry.value,
                        timestamp_ms: now_ms,
                    });
                    report.events += 1;
                }
            }
        }
        self.queue_outputs(now_ms);

        // 7. Physics post-pass.
        physics::apply(&self.config.physics, &mut self.cells);

        // Tick is atomic: events for the whole cycle publish at the end, in
        // write order. Output-named tags are reported through the outbox so
        // their events carry the modelled delivery latency.
        let writes = self.cells.end_journal();
        for (tag, value) in writes {
            if super::is_output_name(&tag) {
                continue;
            }
            report.events += 1;
            self.hub.publish(&TagEvent {
                tag,
                value,
                timestamp_ms: now_ms,
            });
        }
        self.metrics.record_cycle(cycle_timer.elapsed().as_micros() as u64);
        Ok(report)
    }

    fn publish_system_variables(&mut self) {
        for (name, value) in [
            ("ScanTime_ms", Value::Int(self.config.scan_time_ms)),
            ("ScanCount", Value::Int(self.scan_count as i64)),
        ] {
            if !self.cells.contains(name) {
                // Allocate at the type default so the first publish below is
                // journaled as a change.
                self.cells
                    .allocate(name.into(), CellType::Int, Value::Int(0));
            }
            let _ = self.cells.set(name, value);
        }
    }

    /// Wrap every integer cell outside the configured range, recording one
    /// exception per offending cell per cycle.
    fn wrap_overflows(&mut self) -> Vec<smol_str::SmolStr> {
        let (min, max) = self.config.overflow_range.bounds();
        let span = max - min + 1;
        let offenders: Vec<(smol_str::SmolStr, i64)> = self
            .cells
            .names()
            // The engine-owned counters are not program state and never wrap.
            .filter(|name| *name != "ScanCount" && *name != "ScanTime_ms")
            .filter_map(|name| match self.cells.get(name) {
                Some(Value::Int(v)) if *v < min || *v > max => Some((name.clone(), *v)),
                _ => None,
            })
            .collect();
        let mut wrapped_names = Vec::with_capacity(offenders.len());
        for (name, v) in offenders {
            let wrapped = (v - min).rem_euclid(span) + min;
            let _ = self.cells.set(&name, Value::Int(wrapped));
            self.metrics.overflow_events += 1;
            self.exceptions.push(OverflowException {
                tag: name.clone(),
                cycle: self.scan_count,
            });
            self.alerts.push(EngineAlert::IntOverflow {
                tag: name.clone(),
                cycle: self.scan_count,
            });
            wrapped_names.push(name);
        }
        wrapped_names
    }

    /// Append `(name, value, now)` for every output-named cell.
    fn queue_outputs(&mut self, now_ms: i64) {
        let outputs: Vec<(smol_str::SmolStr, Value)> = self
            .cells
            .names()
            .filter(|name| super::is_output_name(name))
            .filter_map(|name| {
                self.cells
                    .get(name)
                    .map(|value| (name.clone(), value.clone()))
            })
            .collect();
        for (name, value) in outputs {
            self.outbox
                .push(name, value, now_ms, super::WriteKind::Publish);
        }
    }
}
