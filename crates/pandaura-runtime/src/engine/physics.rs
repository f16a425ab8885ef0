//! Physics post-pass.
//!
//! After program execution, domain-recognised pairings nudge process
//! variables so shadow programs see plausible plant feedback. The pairing
//! table is data-driven; [`default_rules`] carries the two built-in models.

use smol_str::SmolStr;

use crate::memory::Cells;
use crate::value::{round2, Value};

/// How a driver tag contributes to its process variable.
#[derive(Debug, Clone)]
pub enum Drive {
    /// `pv += driver / divisor * gain` (analog actuators).
    Proportional {
        /// Scale of the driver value.
        divisor: f64,
        /// Contribution per cycle at full drive.
        gain: f64,
    },
    /// `pv += rate` while the driver is truthy (on/off actuators).
    OnOff {
        /// Contribution per cycle while on.
        rate: f64,
    },
}

/// One process-variable pairing.
#[derive(Debug, Clone)]
pub struct PhysicsRule {
    /// Process variable tag.
    pub pv: SmolStr,
    /// Driver tag.
    pub driver: SmolStr,
    /// Contribution model.
    pub drive: Drive,
    /// Passive loss per cycle.
    pub loss: f64,
    /// Clamp range for the process variable.
    pub min: f64,
    /// Clamp range for the process variable.
    pub max: f64,
}

/// The built-in pairing table: heater/temperature and pump/tank-level.
#[must_use]
pub fn default_rules() -> Vec<PhysicsRule> {
    vec![
        PhysicsRule {
            pv: "Temperature_PV".into(),
            driver: "Heater_Output".into(),
            drive: Drive::Proportional {
                divisor: 100.0,
                gain: 0.3,
            },
            loss: 0.05,
            min: 0.0,
            max: 150.0,
        },
        PhysicsRule {
            pv: "Tank_Level".into(),
            driver: "Pump_Run".into(),
            drive: Drive::OnOff { rate: 0.5 },
            loss: 0.15,
            min: 0.0,
            max: 100.0,
        },
    ]
}

/// Apply every rule whose process variable and driver both exist.
pub fn apply(rules: &[PhysicsRule], cells: &mut Cells) {
    for rule in rules {
        let Some(pv) = cells.get(&rule.pv).and_then(Value::as_f64) else {
            continue;
        };
        let Some(driver) = cells.get(&rule.driver) else {
            continue;
        };
        let contribution = match &rule.drive {
            Drive::Proportional { divisor, gain } => {
                driver.as_f64().unwrap_or(0.0) / divisor * gain
            }
            Drive::OnOff { rate } => {
                if driver.truthy() {
                    *rate
                } else {
                    0.0
                }
            }
        };
        let next = (pv + contribution - rule.loss).clamp(rule.min, rule.max);
        let _ = cells.set(&rule.pv, Value::Real(round2(next)));
    }
}
