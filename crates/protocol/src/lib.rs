//! Splay - Protocol
//!
//! The JSON wire model shared by emitters, the distributor and analyzers.
//! Field names are camelCase on the wire; unknown fields are tolerated so
//! that packets survive the hop through the distributor unchanged.
//!
//! # Example
//!
//! ```
//! use splay_protocol::LogPacket;
//!
//! let raw = r#"{
//!     "packetId": "pkt-1",
//!     "agentId": "emitter-a",
//!     "messages": [{"level": "INFO", "message": "started"}]
//! }"#;
//!
//! let packet: LogPacket = serde_json::from_str(raw).unwrap();
//! assert_eq!(packet.message_count(), 1);
//! ```

mod packet;

pub use packet::{LogLevel, LogMessage, LogPacket};
