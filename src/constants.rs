//! # System Constants
//!
//! Fixed values shared across the migration pipeline.

use std::time::Duration;

/// Prefix for target device names of non-root volumes
pub const DEVICE_PREFIX: &str = "/dev/sd";

/// Member name the provider requires inside an uploaded disk archive
pub const ARCHIVE_MEMBER_NAME: &str = "disk.raw";

/// Extension appended to a volume id for its compressed archive
pub const ARCHIVE_EXTENSION: &str = "tar.gz";

/// Reference polling cadences
pub mod intervals {
    use super::Duration;

    /// Provider operation status checks
    pub const OPERATION_POLL: Duration = Duration::from_secs(3);
    /// Instance boot-state checks
    pub const INSTANCE_POLL: Duration = Duration::from_secs(3);
    /// Upload worker completion checks
    pub const UPLOAD_POLL: Duration = Duration::from_secs(1);
}

/// Provider power states reported by `get_instance`
pub mod power_states {
    pub const PROVISIONING: &str = "PROVISIONING";
    pub const STAGING: &str = "STAGING";
    pub const RUNNING: &str = "RUNNING";
    pub const STOPPING: &str = "STOPPING";
    pub const STOPPED: &str = "STOPPED";
    pub const SUSPENDING: &str = "SUSPENDING";
    pub const SUSPENDED: &str = "SUSPENDED";
    pub const REPAIRING: &str = "REPAIRING";
    pub const TERMINATED: &str = "TERMINATED";
}

/// Component names used in structured log records
pub mod components {
    pub const ORCHESTRATOR: &str = "migration_orchestrator";
    pub const UPLOAD_COORDINATOR: &str = "upload_coordinator";
    pub const COMPENSATION: &str = "compensation_handler";
    pub const COMPRESSION: &str = "compression";
    pub const REPLATFORM: &str = "replatform_configurator";
}
