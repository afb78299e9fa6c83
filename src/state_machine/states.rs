use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse, externally visible migration status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationStatus {
    /// Process handed to the orchestrator but not yet started
    Pending,
    /// Pipeline is running
    InProgress,
    /// Instance (and machine image) created successfully
    Completed,
    /// Cooperative cancellation observed and compensated
    Cancelled,
    /// A phase failed and compensation ran
    Failed,
}

impl MigrationStatus {
    /// Check if this is a terminal state (no further transitions allowed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Failed)
    }

    /// Check if this is an active state
    pub fn is_active(&self) -> bool {
        matches!(self, Self::InProgress)
    }
}

impl fmt::Display for MigrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::InProgress => write!(f, "in_progress"),
            Self::Completed => write!(f, "completed"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl Default for MigrationStatus {
    fn default() -> Self {
        Self::Pending
    }
}

/// Fine-grained pipeline phase, used to pick the compensation scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InternalStatus {
    /// Nothing has been committed yet
    Pending,
    CreateRawFiles,
    CreatedRawFiles,
    Compressing,
    UploadToStorage,
    CreatingDiskImage,
    CreatedDiskImage,
    CreatingDisk,
    CreatedDisk,
    CreatingInstance,
    InitiateInstance,
    CreatingMachineImage,
    Completed,
    Cancelled,
    Failed,
}

impl InternalStatus {
    /// Check if this is a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Failed)
    }

    /// Whether an instance may exist once this phase has been committed
    pub fn is_post_instance_creation(&self) -> bool {
        matches!(
            self,
            Self::CreatingInstance | Self::InitiateInstance | Self::CreatingMachineImage
        )
    }

    /// Stable upper snake case name, matching the externally published phase names
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::CreateRawFiles => "CREATE_RAW_FILES",
            Self::CreatedRawFiles => "CREATED_RAW_FILES",
            Self::Compressing => "COMPRESSING",
            Self::UploadToStorage => "UPLOAD_TO_STORAGE",
            Self::CreatingDiskImage => "CREATING_DISK_IMAGE",
            Self::CreatedDiskImage => "CREATED_DISK_IMAGE",
            Self::CreatingDisk => "CREATING_DISK",
            Self::CreatedDisk => "CREATED_DISK",
            Self::CreatingInstance => "CREATING_INSTANCE",
            Self::InitiateInstance => "INITIATE_INSTANCE",
            Self::CreatingMachineImage => "CREATING_MACHINE_IMAGE",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
            Self::Failed => "FAILED",
        }
    }
}

impl fmt::Display for InternalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lower = self.as_str().to_ascii_lowercase();
        write!(f, "{lower}")
    }
}

impl std::str::FromStr for InternalStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let status = match s.to_ascii_uppercase().as_str() {
            "PENDING" => Self::Pending,
            "CREATE_RAW_FILES" => Self::CreateRawFiles,
            "CREATED_RAW_FILES" => Self::CreatedRawFiles,
            "COMPRESSING" => Self::Compressing,
            "UPLOAD_TO_STORAGE" => Self::UploadToStorage,
            "CREATING_DISK_IMAGE" => Self::CreatingDiskImage,
            "CREATED_DISK_IMAGE" => Self::CreatedDiskImage,
            "CREATING_DISK" => Self::CreatingDisk,
            "CREATED_DISK" => Self::CreatedDisk,
            "CREATING_INSTANCE" => Self::CreatingInstance,
            "INITIATE_INSTANCE" => Self::InitiateInstance,
            "CREATING_MACHINE_IMAGE" => Self::CreatingMachineImage,
            "COMPLETED" => Self::Completed,
            "CANCELLED" => Self::Cancelled,
            "FAILED" => Self::Failed,
            _ => return Err(format!("Invalid internal status: {s}")),
        };
        Ok(status)
    }
}

impl Default for InternalStatus {
    fn default() -> Self {
        Self::Pending
    }
}

/// Phase order of a rehost (lift-and-shift) run
pub const REHOST_PHASES: &[InternalStatus] = &[
    InternalStatus::CreateRawFiles,
    InternalStatus::CreatedRawFiles,
    InternalStatus::Compressing,
    InternalStatus::UploadToStorage,
    InternalStatus::CreatingDiskImage,
    InternalStatus::CreatedDiskImage,
    InternalStatus::CreatingDisk,
    InternalStatus::CreatedDisk,
    InternalStatus::CreatingInstance,
    InternalStatus::InitiateInstance,
    InternalStatus::CreatingMachineImage,
    InternalStatus::Completed,
];

/// Phase order of a replatform run; configuration over SSH happens inside `CreatingInstance`
pub const REPLATFORM_PHASES: &[InternalStatus] = &[
    InternalStatus::CreateRawFiles,
    InternalStatus::CreatedRawFiles,
    InternalStatus::UploadToStorage,
    InternalStatus::CreatingDisk,
    InternalStatus::CreatedDisk,
    InternalStatus::CreatingInstance,
    InternalStatus::CreatingMachineImage,
    InternalStatus::Completed,
];
