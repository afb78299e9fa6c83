use super::volume::{validate_single_root, Volume};
use crate::error::Result;
use crate::provider::InstanceSnapshot;
use crate::remote::OsFamily;
use crate::state_machine::{InternalStatus, MigrationStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Kind of migration a process performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MigrationKind {
    /// Capture the full disks and recreate them as a cloud instance
    Rehost,
    /// Provision a fresh instance from a base image, then configure it
    Replatform,
}

impl fmt::Display for MigrationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rehost => write!(f, "rehost"),
            Self::Replatform => write!(f, "replatform"),
        }
    }
}

/// Target placement of the migrated instance
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub provider: String,
    pub region: String,
    pub availability_zone: String,
    pub network_id: String,
    pub subnet_id: String,
    pub network_name: Option<String>,
    pub subnet_name: Option<String>,
    pub machine_type: String,
    #[serde(default)]
    pub assign_public_ip: bool,
}

/// Connection descriptor for the source (and, for replatform, target) host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceHost {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub os_family: OsFamily,
}

/// Credential reference; only the key file path is carried, never its content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credential {
    pub key_file_path: PathBuf,
}

/// A group to create on a replatformed instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupSpec {
    pub name: String,
    pub gid: Option<u32>,
}

/// A user to create on a replatformed instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSpec {
    pub name: String,
    pub uid: Option<u32>,
    pub groups: Vec<String>,
    pub home: Option<String>,
    pub shell: Option<String>,
}

/// A file captured from the source and placed on the new instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileTransfer {
    pub local_path: PathBuf,
    pub remote_path: String,
    pub owner: Option<String>,
    pub mode: Option<String>,
}

/// A data volume mount point on the new instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MountSpec {
    pub volume_id: String,
    pub mount_point: String,
    pub filesystem: String,
}

/// Configuration applied to a freshly provisioned replatform instance
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReplatformPlan {
    /// Base machine image the root disk is created from; must already exist
    pub base_image: String,
    #[serde(default)]
    pub mounts: Vec<MountSpec>,
    #[serde(default)]
    pub groups: Vec<GroupSpec>,
    #[serde(default)]
    pub users: Vec<UserSpec>,
    #[serde(default)]
    pub files: Vec<FileTransfer>,
    #[serde(default)]
    pub packages: Vec<String>,
}

/// Values produced by the run and written back into the record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuntimeOutputs {
    pub instance_id: Option<String>,
    pub instance_name: Option<String>,
    pub private_ip: Option<String>,
    pub public_ip: Option<String>,
    pub block_devices: Vec<String>,
    pub security_groups: Vec<String>,
    pub image_id: Option<String>,
    pub image_name: Option<String>,
    pub launched_at: Option<DateTime<Utc>>,
}

/// Aggregate root for one migration run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationProcess {
    pub process_id: String,
    pub kind: MigrationKind,
    pub placement: Placement,
    pub source: SourceHost,
    pub credential: Credential,
    pub volumes: Vec<Volume>,
    pub replatform: Option<ReplatformPlan>,
    #[serde(default)]
    pub outputs: RuntimeOutputs,
    #[serde(default)]
    pub status: MigrationStatus,
    #[serde(default)]
    pub internal_status: InternalStatus,
}

impl MigrationProcess {
    /// Validate structural invariants before a run starts
    pub fn validate(&self) -> Result<()> {
        validate_single_root(&self.volumes)?;
        if self.kind == MigrationKind::Replatform && self.replatform.is_none() {
            return Err(crate::error::MigrationError::precondition(format!(
                "replatform process {} has no replatform plan",
                self.process_id
            )));
        }
        Ok(())
    }

    pub fn root_volume(&self) -> Option<&Volume> {
        self.volumes.iter().find(|v| v.is_root)
    }

    pub fn volume(&self, volume_id: &str) -> Option<&Volume> {
        self.volumes.iter().find(|v| v.id == volume_id)
    }

    pub fn volume_mut(&mut self, volume_id: &str) -> Option<&mut Volume> {
        self.volumes.iter_mut().find(|v| v.id == volume_id)
    }

    /// Name used for provider resources created by this run
    pub fn resource_name(&self, suffix: &str) -> String {
        let base: String = self
            .process_id
            .to_ascii_lowercase()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
            .collect();
        format!("mig-{base}-{suffix}")
    }

    /// Copy instance details reported by the provider into the record
    pub fn apply_instance_snapshot(&mut self, snapshot: &InstanceSnapshot) {
        self.outputs.instance_id = Some(snapshot.instance_id.clone());
        self.outputs.instance_name = Some(snapshot.name.clone());
        if snapshot.private_ip.is_some() {
            self.outputs.private_ip = snapshot.private_ip.clone();
        }
        if snapshot.public_ip.is_some() {
            self.outputs.public_ip = snapshot.public_ip.clone();
        }
        if !snapshot.block_devices.is_empty() {
            self.outputs.block_devices = snapshot.block_devices.clone();
        }
        if snapshot.launched_at.is_some() {
            self.outputs.launched_at = snapshot.launched_at;
        }
    }
}
