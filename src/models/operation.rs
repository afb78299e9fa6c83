use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a provider-side resource (and its operation) lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceScope {
    /// Project-wide resources such as disk images and machine images
    Global,
    /// Zone-scoped resources such as disks and instances
    Zonal,
}

impl fmt::Display for ResourceScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Global => write!(f, "global"),
            Self::Zonal => write!(f, "zonal"),
        }
    }
}

/// Lifecycle of a provider asynchronous operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationStatus {
    Pending,
    Running,
    Done,
}

/// Handle on a provider asynchronous task, polled until `Done`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub id: String,
    pub status: OperationStatus,
    /// 0-100
    pub progress: u8,
    pub error: Option<String>,
    pub scope: ResourceScope,
    /// Zone for zonal operations, region or project for global ones
    pub location: String,
    /// Provider id of the resource the operation creates, when known
    pub target_id: Option<String>,
}

impl Operation {
    /// Create a freshly submitted operation
    pub fn pending(id: impl Into<String>, scope: ResourceScope, location: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: OperationStatus::Pending,
            progress: 0,
            error: None,
            scope,
            location: location.into(),
            target_id: None,
        }
    }

    /// Attach the id of the resource the operation produces
    pub fn with_target(mut self, target_id: impl Into<String>) -> Self {
        self.target_id = Some(target_id.into());
        self
    }

    pub fn is_done(&self) -> bool {
        self.status == OperationStatus::Done
    }

    /// Done with an error reported by the provider
    pub fn is_failed(&self) -> bool {
        self.is_done() && self.error.is_some()
    }

    /// Merge a fresh poll result into this handle
    ///
    /// Returns `false` when the operation was already `Done`; a finished
    /// operation is never modified again.
    pub fn apply_update(&mut self, update: &Operation) -> bool {
        if self.is_done() {
            return false;
        }
        self.status = update.status;
        self.progress = update.progress.min(100);
        self.error = update.error.clone();
        if update.target_id.is_some() {
            self.target_id = update.target_id.clone();
        }
        true
    }
}
