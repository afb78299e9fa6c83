//! # Source Capture
//!
//! The byte-for-byte copy of source volumes is produced by external tooling.
//! This module is the seam the orchestrator uses to trigger/verify it, to
//! abort it, and to archive the resulting raw files.

pub mod compression;

pub use compression::{drain_stderr, staging_directory, Compressor, TarCompressor};

use crate::config::CaptureConfig;
use crate::error::{MigrationError, Result};
use crate::models::MigrationProcess;
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Produces and aborts raw captures of a source host's volumes
#[async_trait]
pub trait SourceCapture: Send + Sync {
    /// Make sure every volume has a raw capture file on local disk
    async fn create_raw_files(&self, process: &MigrationProcess) -> Result<()>;

    /// Abort an in-flight capture on the source host
    async fn abort_capture(&self, process: &MigrationProcess) -> Result<()>;
}

/// Capture source backed by an external capture job and a kill script
///
/// `create_raw_files` verifies the files the capture job wrote;
/// `abort_capture` runs the configured script with the source host's
/// connection details as arguments.
#[derive(Debug, Clone)]
pub struct ScriptedCaptureSource {
    cancel_script: PathBuf,
    script_timeout: Duration,
}

impl ScriptedCaptureSource {
    pub fn new(config: &CaptureConfig) -> Self {
        Self {
            cancel_script: config.cancel_script_path.clone(),
            script_timeout: Duration::from_secs(config.script_timeout_seconds),
        }
    }
}

#[async_trait]
impl SourceCapture for ScriptedCaptureSource {
    async fn create_raw_files(&self, process: &MigrationProcess) -> Result<()> {
        for volume in &process.volumes {
            let metadata = tokio::fs::metadata(&volume.raw_file_path)
                .await
                .map_err(|e| {
                    MigrationError::local_io(
                        format!("verify raw capture {}", volume.raw_file_path.display()),
                        e,
                    )
                })?;
            if !metadata.is_file() {
                return Err(MigrationError::precondition(format!(
                    "raw capture for volume {} is not a regular file: {}",
                    volume.id,
                    volume.raw_file_path.display()
                )));
            }
            debug!(
                process_id = %process.process_id,
                volume_id = %volume.id,
                bytes = metadata.len(),
                "Raw capture present"
            );
        }
        Ok(())
    }

    async fn abort_capture(&self, process: &MigrationProcess) -> Result<()> {
        info!(
            process_id = %process.process_id,
            host = %process.source.host,
            script = %self.cancel_script.display(),
            "🛑 Running capture cancel script"
        );

        let child = Command::new(&self.cancel_script)
            .arg(&process.source.host)
            .arg(process.source.port.to_string())
            .arg(&process.source.username)
            .arg(&process.credential.key_file_path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| MigrationError::local_io("spawn capture cancel script", e))?;

        let output = tokio::time::timeout(self.script_timeout, child.wait_with_output())
            .await
            .map_err(|_| MigrationError::timeout("capture cancel script", self.script_timeout))?
            .map_err(|e| MigrationError::local_io("run capture cancel script", e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(
                process_id = %process.process_id,
                exit_code = output.status.code(),
                stderr = %stderr,
                "Capture cancel script reported failure"
            );
            return Err(MigrationError::remote_command(
                "abort_capture",
                output.status.code().unwrap_or(-1),
                stderr,
            ));
        }
        Ok(())
    }
}
