//! # Migration Data Model
//!
//! - [`process`] - `MigrationProcess` aggregate root and its placement/source/output records
//! - [`volume`] - captured volumes and deterministic target device naming
//! - [`operation`] - provider asynchronous operation handles
//! - [`handle`] - per-volume, per-run resource handles

pub mod handle;
pub mod operation;
pub mod process;
pub mod volume;

pub use handle::{HandleSet, VolumeResourceHandle};
pub use operation::{Operation, OperationStatus, ResourceScope};
pub use process::{
    Credential, FileTransfer, GroupSpec, MigrationKind, MigrationProcess, MountSpec, Placement,
    ReplatformPlan, RuntimeOutputs, SourceHost, UserSpec,
};
pub use volume::{assign_device_names, device_name_for, validate_single_root, Volume};
