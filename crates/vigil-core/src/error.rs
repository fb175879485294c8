//! Error types for vigil-core.

use std::path::PathBuf;

use thiserror::Error;

use crate::workload::Role;

/// Result type for vigil-core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while orchestrating workloads.
///
/// Only resource-level failures surface here. A workload whose program image
/// fails to load is reported through its stats, never as an `Error`.
#[derive(Debug, Error)]
pub enum Error {
    /// Failed to create a channel (descriptor exhaustion).
    #[error("failed to create channel: {0}")]
    ChannelCreate(#[source] std::io::Error),

    /// Failed to replicate the orchestrator process for a workload.
    #[error("failed to spawn {role} workload: {source}")]
    Spawn {
        role: Role,
        #[source]
        source: std::io::Error,
    },

    /// Failed to deliver a control signal to a live workload.
    #[error("failed to deliver {signal} to pid {pid}: {source}")]
    Signal {
        pid: i32,
        signal: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// Failed to read the telemetry file.
    #[error("telemetry error for {path}: {source}")]
    Telemetry {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to read or write a report file.
    #[error("report error for {path}: {source}")]
    Report {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON encoding or decoding error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Protocol number outside the fixed set.
    #[error("invalid protocol: {0} (expected 1-4)")]
    InvalidProtocol(u8),
}

impl Error {
    /// Short recovery hint for operator-facing output.
    pub fn with_hint(&self) -> String {
        let hint = match self {
            Error::ChannelCreate(_) | Error::Spawn { .. } => {
                Some("the system may be out of file descriptors or process slots")
            }
            Error::Telemetry { .. } => Some("generate one with `vigil generate`"),
            Error::InvalidProtocol(_) => Some("choose one of 1, 2, 3 or 4"),
            _ => None,
        };
        match hint {
            Some(hint) => format!("{self}\n  hint: {hint}"),
            None => self.to_string(),
        }
    }
}
