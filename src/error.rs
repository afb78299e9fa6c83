//! # Migration Error Types
//!
//! Structured error taxonomy for the migration pipeline. Every phase returns
//! [`MigrationError`]; the orchestrator catches exactly once at the top level,
//! runs compensation and re-raises the original error to the caller.

use crate::state_machine::InternalStatus;
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by the migration orchestration core
#[derive(Error, Debug)]
pub enum MigrationError {
    #[error("Provider operation failed: {operation}: {message}")]
    ProviderOperation { operation: String, message: String },

    #[error("Migration {process_id} cancelled at {phase}")]
    Cancelled {
        process_id: String,
        phase: InternalStatus,
    },

    #[error("Precondition failed: {message}")]
    Precondition { message: String },

    #[error("Connectivity check to {host} failed after {attempts} attempts: {message}")]
    Connectivity {
        host: String,
        attempts: u32,
        message: String,
    },

    #[error("Remote command failed during {step} (exit code {exit_code}): {stderr}")]
    RemoteCommand {
        step: String,
        exit_code: i32,
        stderr: String,
    },

    #[error("Local I/O error during {operation}: {source}")]
    LocalIo {
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Timed out waiting for {operation} after {waited:?}")]
    Timeout { operation: String, waited: Duration },

    #[error("Invalid phase transition from {from} to {to}")]
    InvalidTransition {
        from: InternalStatus,
        to: InternalStatus,
    },

    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

impl MigrationError {
    /// Create a provider operation error
    pub fn provider(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ProviderOperation {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Create a cancellation signal observed at the given phase
    pub fn cancelled(process_id: impl Into<String>, phase: InternalStatus) -> Self {
        Self::Cancelled {
            process_id: process_id.into(),
            phase,
        }
    }

    /// Create a precondition error
    pub fn precondition(message: impl Into<String>) -> Self {
        Self::Precondition {
            message: message.into(),
        }
    }

    /// Create a connectivity error
    pub fn connectivity(host: impl Into<String>, attempts: u32, message: impl Into<String>) -> Self {
        Self::Connectivity {
            host: host.into(),
            attempts,
            message: message.into(),
        }
    }

    /// Create a remote command failure
    pub fn remote_command(step: impl Into<String>, exit_code: i32, stderr: impl Into<String>) -> Self {
        Self::RemoteCommand {
            step: step.into(),
            exit_code,
            stderr: stderr.into(),
        }
    }

    /// Wrap a filesystem or subprocess failure
    pub fn local_io(operation: impl Into<String>, source: std::io::Error) -> Self {
        Self::LocalIo {
            operation: operation.into(),
            source,
        }
    }

    /// Create a polling timeout error
    pub fn timeout(operation: impl Into<String>, waited: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            waited,
        }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Whether this error is the cooperative cancellation signal
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// Short machine-readable classification used in logs and status events
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ProviderOperation { .. } => "provider_operation",
            Self::Cancelled { .. } => "cancelled",
            Self::Precondition { .. } => "precondition",
            Self::Connectivity { .. } => "connectivity",
            Self::RemoteCommand { .. } => "remote_command",
            Self::LocalIo { .. } => "local_io",
            Self::Timeout { .. } => "timeout",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::Configuration { .. } => "configuration",
        }
    }
}

pub type Result<T> = std::result::Result<T, MigrationError>;
