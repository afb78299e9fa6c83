use super::states::InternalStatus;
use serde::{Deserialize, Serialize};

/// Events that can trigger migration phase transitions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum MigrationEvent {
    /// Commit entry into the given phase
    Enter(InternalStatus),
    /// Cooperative cancellation observed at a checkpoint
    Cancel,
    /// A phase failed with the given error message
    Fail(String),
}

impl MigrationEvent {
    /// Get a string representation of the event type for logging
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Enter(_) => "enter",
            Self::Cancel => "cancel",
            Self::Fail(_) => "fail",
        }
    }

    /// Extract error message if this is a failure event
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Fail(msg) => Some(msg),
            _ => None,
        }
    }

    /// Create a failure event with the given error message
    pub fn fail_with_error(error: impl Into<String>) -> Self {
        Self::Fail(error.into())
    }
}
