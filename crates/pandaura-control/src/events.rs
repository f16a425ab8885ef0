//! JSON event message model.
//!
//! Every message is an object with a `type` discriminator. Variable updates
//! originate from scan-cycle writes; `error` events surface background
//! failures (watchdog, automatic rollback).

use pandaura_runtime::Value;
use serde::Serialize;
use smol_str::SmolStr;

/// One `(tag, value, timestamp)` update inside a bulk message.
#[derive(Debug, Clone, Serialize)]
pub struct VariableUpdate {
    /// Tag name.
    pub tag: SmolStr,
    /// Value after the write.
    pub value: Value,
    /// Scan-cycle timestamp, epoch milliseconds.
    pub timestamp: i64,
}

/// Outbound event messages.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum Event {
    /// First message on a new subscriber connection.
    #[serde(rename = "welcome")]
    Welcome {
        /// Server identity string.
        server: String,
    },
    /// Subscription acknowledged.
    #[serde(rename = "subscribed")]
    Subscribed {
        /// Tags now subscribed; empty means all.
        tags: Vec<SmolStr>,
    },
    /// Unsubscription acknowledged.
    #[serde(rename = "unsubscribed")]
    Unsubscribed {
        /// Tags released.
        tags: Vec<SmolStr>,
    },
    /// One variable changed.
    #[serde(rename = "variableUpdate")]
    VariableUpdate {
        /// Tag name.
        tag: SmolStr,
        /// Value after the write.
        value: Value,
        /// Scan-cycle timestamp, epoch milliseconds.
        timestamp: i64,
    },
    /// A batch of updates from one tick.
    #[serde(rename = "bulkUpdate")]
    BulkUpdate {
        /// Updates in intra-tick write order.
        updates: Vec<VariableUpdate>,
    },
    /// Engine status snapshot.
    #[serde(rename = "systemStatus")]
    SystemStatus {
        /// Loop state, e.g. `running`.
        state: String,
        /// Cycles executed.
        scan_count: u64,
        /// Configured interval.
        scan_time_ms: i64,
    },
    /// Fault injection state change.
    #[serde(rename = "faultStatus")]
    FaultStatus {
        /// Target tag.
        target: SmolStr,
        /// `active`, `expired` or `removed`.
        state: String,
    },
    /// Scenario playback advanced a step.
    #[serde(rename = "scenarioStep")]
    ScenarioStep {
        /// Scenario identifier.
        scenario: String,
        /// Step index.
        step: usize,
    },
    /// Authentication failed; the connection will be closed.
    #[serde(rename = "auth_failed")]
    AuthFailed {
        /// Failure cause.
        reason: String,
    },
    /// Reply to a client heartbeat.
    #[serde(rename = "heartbeat_response")]
    HeartbeatResponse {
        /// Millisecond timestamp echoed back.
        timestamp: i64,
    },
    /// Background failure (watchdog, automatic rollback).
    #[serde(rename = "error")]
    Error {
        /// Failure description.
        message: String,
    },
}

impl Event {
    /// Serialise to the wire JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
