//! # Provider Types
//!
//! Provider-neutral request and snapshot types exchanged with a [`ProviderClient`](super::ProviderClient).

use crate::constants::power_states;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Network looked up by id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkInfo {
    pub id: String,
    pub name: String,
}

/// Subnet looked up by region and id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubnetInfo {
    pub id: String,
    pub name: String,
    pub region: String,
    pub cidr: Option<String>,
}

/// Firewall rule / security group attached to a network
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FirewallRule {
    pub name: String,
    pub network: String,
    #[serde(default)]
    pub target_tags: Vec<String>,
}

/// Existing machine image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineImageInfo {
    pub id: String,
    pub name: String,
}

/// Request to turn an uploaded archive into a disk image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiskImageRequest {
    pub image_name: String,
    pub bucket: String,
    pub object_key: String,
}

/// What a new disk is built from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DiskSource {
    /// Disk image produced from an uploaded archive (rehost)
    DiskImage(String),
    /// Existing base machine image (replatform root disk)
    BaseImage(String),
    /// Empty disk (replatform data disks)
    Blank,
}

/// Request to create a zonal disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiskRequest {
    pub disk_name: String,
    pub zone: String,
    pub size_gb: u64,
    pub source: DiskSource,
}

/// A created disk attached to the instance being launched
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttachedDisk {
    pub volume_id: String,
    pub disk_id: String,
    pub boot: bool,
    /// `None` for the boot disk
    pub device_name: Option<String>,
}

/// Metadata passed to the instance at launch
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstanceMetadata {
    pub items: HashMap<String, String>,
    pub network_tags: Vec<String>,
}

/// Result of submitting an instance launch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceLaunch {
    pub instance_id: String,
    pub name: String,
}

/// Provider power state of an instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PowerState {
    Provisioning,
    Staging,
    Running,
    Stopping,
    Stopped,
    Suspending,
    Suspended,
    Repairing,
    Terminated,
    Unknown(String),
}

impl PowerState {
    /// Still coming up; keep polling
    pub fn is_booting(&self) -> bool {
        matches!(self, Self::Provisioning | Self::Staging)
    }
}

impl From<&str> for PowerState {
    fn from(value: &str) -> Self {
        match value.to_ascii_uppercase().as_str() {
            power_states::PROVISIONING => Self::Provisioning,
            power_states::STAGING => Self::Staging,
            power_states::RUNNING => Self::Running,
            power_states::STOPPING => Self::Stopping,
            power_states::STOPPED => Self::Stopped,
            power_states::SUSPENDING => Self::Suspending,
            power_states::SUSPENDED => Self::Suspended,
            power_states::REPAIRING => Self::Repairing,
            power_states::TERMINATED => Self::Terminated,
            other => Self::Unknown(other.to_string()),
        }
    }
}

impl fmt::Display for PowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Provisioning => power_states::PROVISIONING,
            Self::Staging => power_states::STAGING,
            Self::Running => power_states::RUNNING,
            Self::Stopping => power_states::STOPPING,
            Self::Stopped => power_states::STOPPED,
            Self::Suspending => power_states::SUSPENDING,
            Self::Suspended => power_states::SUSPENDED,
            Self::Repairing => power_states::REPAIRING,
            Self::Terminated => power_states::TERMINATED,
            Self::Unknown(other) => other.as_str(),
        };
        write!(f, "{s}")
    }
}

/// Point-in-time view of an instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceSnapshot {
    pub instance_id: String,
    pub name: String,
    pub power_state: PowerState,
    /// Provider's own explanation of the current state
    pub status_message: Option<String>,
    pub private_ip: Option<String>,
    pub public_ip: Option<String>,
    pub block_devices: Vec<String>,
    pub launched_at: Option<DateTime<Utc>>,
}
