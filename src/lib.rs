#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

//! An async driver and server runtime for the INDI (Instrument Neutral
//! Distributed Interface) protocol, commonly used in astronomy for device
//! control and automation.
//!
//! # Layout
//! - [`xml`] — the incremental XML element codec (wire framing)
//! - [`message`] — typed, serde-driven DTOs for every protocol element
//! - [`property`], [`format`], [`timestamp`] — value types shared across
//!   the wire and object-model layers
//! - [`model`] — the in-memory device/vector/member graph and event stream
//! - [`blob_policy`] — per-connection `enableBLOB` admission
//! - [`driver`] — the runtime a device driver is built against
//! - [`connection`] — a single client/subprocess/remote endpoint
//! - [`server`] — the router multiplexing all of the above
//! - [`remote`] — an outgoing link to an upstream INDI server

/// Per-connection BLOB transfer policy engine.
pub mod blob_policy;
/// A single connection endpoint (reader/writer tasks, bounded queues).
pub mod connection;
/// Driver runtime: callbacks, queues, snoop subscriptions, send API.
pub mod driver;
/// Error types and handling
pub mod error;
/// Number/sexagesimal format parsing and rendering.
pub mod format;
/// Message types and handling
pub mod message;
/// In-memory object model: devices, vectors, members, events.
pub mod model;
/// Property types and handling
pub mod property;
/// Client to an upstream INDI server, for chaining servers.
pub mod remote;
/// Server implementation for the INDI protocol.
/// This module provides functionality for running an INDI server that can handle
/// device connections and property updates.
pub mod server;
/// INDI timestamp parsing/formatting.
pub mod timestamp;
/// Incremental XML stream codec.
pub mod xml;

/// Common types and traits
pub mod prelude {
    pub use crate::error::Error;
    pub use crate::message::MessageType;
    pub use crate::property::{Property, PropertyPerm, PropertyState};
    pub use crate::server::{Server, ServerConfig};
}

/// Result type for INDI operations
pub type Result<T> = std::result::Result<T, error::Error>;

/// Version of the INDI protocol implemented by this library
pub const PROTOCOL_VERSION: &str = "1.7";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_version() {
        assert_eq!(PROTOCOL_VERSION, "1.7");
    }
}
