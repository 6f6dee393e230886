//! Log packet wire model
//!
//! A packet is the atomic unit of ingest: one or more log messages with
//! shared provenance. The distributor never splits a packet; the routing
//! engine only ever reads the message count.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Severity of a single log message.
///
/// Order of severity: `Fatal > Error > Warn > [Debug, Info]`.
/// Serialized upper-case on the wire (`"INFO"`, `"ERROR"`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
}

/// A single log message within a packet.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogMessage {
    /// Message identifier assigned by the emitter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Severity level.
    pub level: LogLevel,

    /// Originating application or service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    /// Message text.
    pub message: String,
}

/// A batch of log messages from a single emitter agent.
///
/// `timestamp`, `totalMessages` and `checksum` are carried for downstream
/// consumers but never inspected by the distributor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogPacket {
    /// Opaque correlation id.
    pub packet_id: String,

    /// Opaque source agent id.
    pub agent_id: String,

    /// Emission time, if the emitter supplied one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,

    /// Emitter-declared message count (not trusted; `messages.len()` wins).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_messages: Option<u64>,

    /// The log messages. Must be non-empty for a packet to be routable.
    pub messages: Vec<LogMessage>,

    /// Integrity checksum, if the emitter supplied one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
}

impl LogPacket {
    /// Number of messages carried by this packet.
    ///
    /// This is the only field the routing engine reads.
    #[inline]
    pub fn message_count(&self) -> u64 {
        self.messages.len() as u64
    }
}
