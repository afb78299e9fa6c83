//! # Migrator Configuration System
//!
//! Immutable run configuration handed to the orchestrator at construction.
//! Nothing here is read from process-wide statics: callers load a
//! [`MigratorConfig`] once (usually through [`ConfigManager`]) and pass it in.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use migrator_core::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let bucket = &manager.config().storage.bucket;
//! let operation_poll = manager.config().polling.operation_policy();
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

use crate::resilience::PollPolicy;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;

/// Root configuration structure mirroring migrator.yaml
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MigratorConfig {
    /// Object store used to transfer captures
    pub storage: StorageConfig,

    /// What to delete after a successful run
    #[serde(default)]
    pub cleanup: CleanupConfig,

    /// Local working area and capture abort script
    #[serde(default)]
    pub capture: CaptureConfig,

    /// Archiver used during the compressing phase
    #[serde(default)]
    pub compression: CompressionConfig,

    /// Polling cadence and ceilings for provider waits
    #[serde(default)]
    pub polling: PollingConfig,

    /// Post-provision configuration of replatformed instances
    #[serde(default)]
    pub replatform: ReplatformConfig,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StorageConfig {
    pub bucket: String,
    pub region: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CleanupConfig {
    /// Remove the per-process working directory after completion
    pub delete_working_directory: bool,
    /// Remove the process folder from the bucket after completion
    pub delete_bucket_after_completion: bool,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            delete_working_directory: true,
            delete_bucket_after_completion: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CaptureConfig {
    pub working_directory: PathBuf,
    /// Script invoked with the source host to abort an in-flight capture
    pub cancel_script_path: PathBuf,
    pub script_timeout_seconds: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            working_directory: PathBuf::from("work"),
            cancel_script_path: PathBuf::from("scripts/cancel_capture.sh"),
            script_timeout_seconds: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CompressionConfig {
    /// Archiver executable; invoked as `<program> -Sczf <archive> -C <dir> disk.raw`
    pub program: String,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            program: "tar".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PollingConfig {
    pub operation_interval_ms: u64,
    pub instance_interval_ms: u64,
    pub upload_interval_ms: u64,
    /// Ceiling on any single wait; exceeded waits fail with a timeout error
    pub max_wait_seconds: u64,
    /// 1.0 keeps a fixed interval
    pub backoff_multiplier: f64,
    pub max_interval_ms: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            operation_interval_ms: crate::constants::intervals::OPERATION_POLL.as_millis() as u64,
            instance_interval_ms: crate::constants::intervals::INSTANCE_POLL.as_millis() as u64,
            upload_interval_ms: crate::constants::intervals::UPLOAD_POLL.as_millis() as u64,
            max_wait_seconds: 3 * 3600,
            backoff_multiplier: 1.0,
            max_interval_ms: 30_000,
        }
    }
}

impl PollingConfig {
    fn policy(&self, interval_ms: u64) -> PollPolicy {
        PollPolicy {
            interval: Duration::from_millis(interval_ms),
            max_wait: Duration::from_secs(self.max_wait_seconds),
            backoff_multiplier: self.backoff_multiplier,
            max_interval: Duration::from_millis(self.max_interval_ms),
        }
    }

    pub fn operation_policy(&self) -> PollPolicy {
        self.policy(self.operation_interval_ms)
    }

    pub fn instance_policy(&self) -> PollPolicy {
        self.policy(self.instance_interval_ms)
    }

    pub fn upload_interval(&self) -> Duration {
        Duration::from_millis(self.upload_interval_ms)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReplatformConfig {
    pub connectivity_attempts: u32,
    pub connectivity_interval_ms: u64,
}

impl Default for ReplatformConfig {
    fn default() -> Self {
        Self {
            connectivity_attempts: 20,
            connectivity_interval_ms: 15_000,
        }
    }
}

impl MigratorConfig {
    /// Configuration with millisecond cadences for tests
    pub fn for_testing(working_directory: impl Into<PathBuf>) -> Self {
        Self {
            storage: StorageConfig {
                bucket: "migration-test-bucket".to_string(),
                region: "test-region1".to_string(),
            },
            cleanup: CleanupConfig {
                delete_working_directory: false,
                delete_bucket_after_completion: false,
            },
            capture: CaptureConfig {
                working_directory: working_directory.into(),
                cancel_script_path: PathBuf::from("/bin/true"),
                script_timeout_seconds: 5,
            },
            compression: CompressionConfig::default(),
            polling: PollingConfig {
                operation_interval_ms: 5,
                instance_interval_ms: 5,
                upload_interval_ms: 5,
                max_wait_seconds: 5,
                backoff_multiplier: 1.0,
                max_interval_ms: 50,
            },
            replatform: ReplatformConfig {
                connectivity_attempts: 3,
                connectivity_interval_ms: 5,
            },
        }
    }

    /// Validate values that serde cannot check
    pub fn validate(&self) -> ConfigResult<()> {
        if self.storage.bucket.trim().is_empty() {
            return Err(ConfigurationError::missing_required_field(
                "bucket",
                "storage",
            ));
        }
        if self.storage.region.trim().is_empty() {
            return Err(ConfigurationError::missing_required_field(
                "region",
                "storage",
            ));
        }
        if self.compression.program.trim().is_empty() {
            return Err(ConfigurationError::missing_required_field(
                "program",
                "compression",
            ));
        }
        for (field, value) in [
            ("operation_interval_ms", self.polling.operation_interval_ms),
            ("instance_interval_ms", self.polling.instance_interval_ms),
            ("upload_interval_ms", self.polling.upload_interval_ms),
            ("max_wait_seconds", self.polling.max_wait_seconds),
            ("max_interval_ms", self.polling.max_interval_ms),
        ] {
            if value == 0 {
                return Err(ConfigurationError::invalid_value(
                    field,
                    "0",
                    "polling values must be greater than zero",
                ));
            }
        }
        let multiplier = self.polling.backoff_multiplier;
        if !multiplier.is_finite() || multiplier < 1.0 {
            return Err(ConfigurationError::invalid_value(
                "backoff_multiplier",
                multiplier.to_string(),
                "must be a finite number of at least 1.0",
            ));
        }
        if self.replatform.connectivity_attempts == 0 {
            return Err(ConfigurationError::invalid_value(
                "connectivity_attempts",
                "0",
                "at least one connectivity attempt is required",
            ));
        }
        Ok(())
    }
}
