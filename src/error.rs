//! Error types for gnss-agent
//!
//! This module defines the error types used throughout the crate.
//! We use `thiserror` for ergonomic error definitions and `anyhow` for
//! error propagation in the binaries.

use thiserror::Error;

/// Main error type for gnss-agent operations
#[derive(Error, Debug)]
pub enum AgentError {
    /// Configuration-related errors (bad key literal, unreadable file)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Shared-memory segment errors (shmget/shmat failures)
    #[error("Shared memory error: {0}")]
    Shm(String),

    /// No daemon has published yet; the broadcast segment does not exist.
    ///
    /// This is "no data yet", not a hard failure. Clients typically poll
    /// again later.
    #[error("No daemon instance has published data yet")]
    NoDaemon,

    /// Every snapshot attempt overlapped a concurrent publish
    #[error("Snapshot inconsistent after {attempts} attempts")]
    Inconsistent {
        /// Number of marker-mismatched read attempts before giving up
        attempts: usize,
    },

    /// Control-channel action string was not `add` or `remove`
    #[error("Unknown control action: {0:?}")]
    UnknownAction(String),

    /// No daemon was reachable at the control socket, even after a launch
    #[error("Cannot reach a daemon at {0}")]
    DaemonUnreachable(String),

    /// Launching the daemon binary failed
    #[error("Daemon launch failed: {0}")]
    Launch(String),

    /// Control protocol errors (socket write, rejected command)
    #[error("Control channel error: {0}")]
    Control(String),

    /// Input validation errors (oversized paths, bad action length)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Operation exceeded its deadline
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using AgentError
pub type Result<T> = std::result::Result<T, AgentError>;

impl From<toml::de::Error> for AgentError {
    fn from(err: toml::de::Error) -> Self {
        AgentError::Config(err.to_string())
    }
}
