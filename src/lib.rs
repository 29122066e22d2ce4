//! gnss-agent: distribution and control plane for a GNSS aggregation daemon
//!
//! The daemon owns one authoritative, frequently-updated "current fix"
//! state. This crate implements the two mechanisms that distribute it:
//! a lock-free shared-memory broadcast channel that publishes snapshots
//! to any number of independent reader processes without ever blocking
//! the daemon's update path, and a tiny text control protocol that adds
//! or removes devices from the daemon's active set, launching the daemon
//! if it is not already running.
//!
//! # Modules
//!
//! - `shm`: the broadcast segment (publisher and subscriber)
//! - `control`: the control channel (client, server, wire framing)
//! - `source`: endpoint-spec (`server:port:device`) parsing
//! - `export`: export-method registry for client tools
//! - `state`: the fixed-size aggregated snapshot payload
//! - `config`: compiled defaults, environment overrides, daemon config
//! - `error`: error types and handling

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod control;
pub mod error;
pub mod export;
pub mod shm;
pub mod source;
pub mod state;

// Re-export commonly used types
pub use error::{AgentError, Result};
pub use source::EndpointSpec;
pub use state::{FixMode, GpsState, Snapshot};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
