//! # Provider Capability Interfaces
//!
//! The orchestrator is generic over these traits. A concrete cloud adapter
//! implements [`ProviderClient`] and [`ObjectStore`] over its SDK; the wire
//! calls themselves live outside this crate.

pub mod object_store;
pub mod types;

pub use object_store::{object_key, ObjectStore};
pub use types::{
    AttachedDisk, DiskImageRequest, DiskRequest, DiskSource, FirewallRule, InstanceLaunch,
    InstanceMetadata, InstanceSnapshot, MachineImageInfo, NetworkInfo, PowerState, SubnetInfo,
};

use crate::error::Result;
use crate::models::{MigrationProcess, Operation, ResourceScope};
use async_trait::async_trait;

/// Compute capabilities the migration pipeline needs from a cloud provider
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// Provider name for logging
    fn provider_name(&self) -> &'static str;

    async fn get_network(&self, network_id: &str) -> Result<NetworkInfo>;

    async fn get_subnet(&self, region: &str, subnet_id: &str) -> Result<SubnetInfo>;

    /// Submit creation of a global disk image from an uploaded archive
    async fn create_disk_image(&self, request: &DiskImageRequest) -> Result<Operation>;

    /// Submit creation of a zonal disk
    async fn create_disk(&self, request: &DiskRequest) -> Result<Operation>;

    /// Fetch the current state of an asynchronous operation
    async fn get_operation_state(
        &self,
        operation_id: &str,
        scope: ResourceScope,
        location: &str,
    ) -> Result<Operation>;

    /// Ask the provider to cancel an in-flight operation
    async fn cancel_operation(
        &self,
        operation_id: &str,
        scope: ResourceScope,
        location: &str,
    ) -> Result<()>;

    /// Launch the instance from the created disks
    async fn run_instance(
        &self,
        process: &MigrationProcess,
        disks: &[AttachedDisk],
        metadata: &InstanceMetadata,
    ) -> Result<InstanceLaunch>;

    /// Give the instance an external address
    async fn add_public_access(&self, process: &MigrationProcess) -> Result<()>;

    async fn get_instance(&self, process: &MigrationProcess) -> Result<InstanceSnapshot>;

    /// Submit creation of a machine image of the migrated instance
    async fn create_machine_image(&self, process: &MigrationProcess) -> Result<Operation>;

    async fn get_machine_image(&self, name: &str) -> Result<Option<MachineImageInfo>>;

    async fn delete_disk(&self, zone: &str, disk_id: &str) -> Result<()>;

    async fn delete_instance(&self, zone: &str, instance_id: &str) -> Result<()>;

    async fn list_firewalls(&self, network: &str) -> Result<Vec<FirewallRule>>;
}
