//! # Compensation
//!
//! Best-effort rollback of whatever the last committed phase left behind.
//! The action is picked from that phase alone:
//!
//! | Last committed phase                     | Rollback                                      |
//! |------------------------------------------|-----------------------------------------------|
//! | `CREATE_RAW_FILES`                       | run the capture cancel script                 |
//! | `COMPRESSING`                            | kill archivers, drop partial archives, restore raw files |
//! | `UPLOAD_TO_STORAGE`                      | abort live upload workers                     |
//! | `CREATING_DISK_IMAGE`, `CREATING_DISK`   | cancel unfinished operations                  |
//! | `CREATED_DISK`                           | delete created disks                          |
//! | instance phases                          | delete the instance, then every created disk  |
//!
//! Compensation never fails the run a second time: every step logs its own
//! failure and moves on. Running it twice is a no-op because handles are
//! marked compensated and provider ids are taken out of the record once the
//! resource is gone.

use super::upload_coordinator::UploadCoordinator;
use crate::capture::SourceCapture;
use crate::constants::components;
use crate::logging::{log_error, log_volume_operation};
use crate::models::{HandleSet, MigrationProcess, Operation, ResourceScope};
use crate::provider::ProviderClient;
use crate::state_machine::InternalStatus;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Rolls back the resources of a failed or cancelled run
pub struct CompensationHandler {
    provider: Arc<dyn ProviderClient>,
    capture: Arc<dyn SourceCapture>,
}

impl std::fmt::Debug for CompensationHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompensationHandler")
            .field("provider", &self.provider.provider_name())
            .finish()
    }
}

impl CompensationHandler {
    pub fn new(provider: Arc<dyn ProviderClient>, capture: Arc<dyn SourceCapture>) -> Self {
        Self { provider, capture }
    }

    /// Undo the work of `last_phase`
    #[instrument(skip_all, fields(process_id = %process.process_id, last_phase = %last_phase))]
    pub async fn compensate(
        &self,
        process: &mut MigrationProcess,
        handles: &mut HandleSet,
        uploads: &UploadCoordinator,
        last_phase: InternalStatus,
    ) {
        info!("↩️ Compensating");

        match last_phase {
            InternalStatus::CreateRawFiles => self.abort_capture(process).await,
            InternalStatus::Compressing => self.rollback_compression(process, handles).await,
            InternalStatus::UploadToStorage => uploads.interrupt_all(),
            InternalStatus::CreatingDiskImage | InternalStatus::CreatingDisk => {
                self.cancel_operations(process, handles).await
            }
            InternalStatus::CreatedDisk => self.delete_disks(process, handles).await,
            phase if phase.is_post_instance_creation() => {
                self.delete_instance(process).await;
                self.delete_disks(process, handles).await;
            }
            phase => debug!(phase = %phase, "Nothing to compensate"),
        }
    }

    async fn abort_capture(&self, process: &MigrationProcess) {
        if let Err(err) = self.capture.abort_capture(process).await {
            log_error(
                components::COMPENSATION,
                "abort_capture",
                &err.to_string(),
                Some(&process.process_id),
            );
        }
    }

    /// Kill archivers still running, remove their partial output and move
    /// the raw file back to where the capture put it
    async fn rollback_compression(&self, process: &MigrationProcess, handles: &mut HandleSet) {
        for handle in handles.iter_mut() {
            let volume_id = handle.volume_id().to_string();

            if let Some(mut child) = handle.take_compression() {
                if let Err(err) = child.kill().await {
                    warn!(volume_id = %volume_id, error = %err, "Archiver already gone");
                }
            }

            // A working raw path means the archive for this volume never completed
            let Some(working) = handle.working_raw_path().map(|p| p.to_path_buf()) else {
                continue;
            };

            if let Some(archive) = handle.archive_path() {
                match tokio::fs::remove_file(archive).await {
                    Ok(()) => debug!(volume_id = %volume_id, "Partial archive removed"),
                    Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                    Err(err) => log_error(
                        components::COMPENSATION,
                        "remove_partial_archive",
                        &err.to_string(),
                        Some(&volume_id),
                    ),
                }
            }

            match tokio::fs::rename(&working, handle.original_raw_path()).await {
                Ok(()) => {
                    if let Some(staging) = working.parent() {
                        if let Err(err) = tokio::fs::remove_dir(staging).await {
                            debug!(volume_id = %volume_id, error = %err, "Staging directory left in place");
                        }
                    }
                    handle.set_working_raw_path(None);
                    handle.mark_compensated();
                    log_volume_operation(
                        "restore_raw_file",
                        &process.process_id,
                        &volume_id,
                        "restored",
                        None,
                    );
                }
                Err(err) => log_error(
                    components::COMPENSATION,
                    "restore_raw_file",
                    &err.to_string(),
                    Some(&volume_id),
                ),
            }
        }
    }

    /// Cancel every operation that has not finished; finished disks are deleted
    async fn cancel_operations(&self, process: &mut MigrationProcess, handles: &mut HandleSet) {
        for handle in handles.iter_mut() {
            if handle.is_compensated() {
                continue;
            }
            let Some(operation) = handle.operation() else {
                continue;
            };

            if operation.is_failed() {
                // The provider never created the resource; its recorded id is only the requested name
                let volume_id = handle.volume_id().to_string();
                forget_failed_target(process, &volume_id, operation);
                handle.mark_compensated();
                continue;
            }

            if operation.is_done() {
                // A finished disk image has nothing left to cancel
                if operation.scope == ResourceScope::Zonal {
                    let volume_id = handle.volume_id().to_string();
                    self.delete_volume_disk(process, &volume_id).await;
                }
                handle.mark_compensated();
                continue;
            }

            match self
                .provider
                .cancel_operation(&operation.id, operation.scope, &operation.location)
                .await
            {
                Ok(()) => {
                    log_volume_operation(
                        "cancel_operation",
                        &process.process_id,
                        handle.volume_id(),
                        "cancelled",
                        Some(&operation.id),
                    );
                    handle.mark_compensated();
                }
                Err(err) => log_error(
                    components::COMPENSATION,
                    "cancel_operation",
                    &err.to_string(),
                    Some(&operation.id),
                ),
            }
        }
    }

    async fn delete_disks(&self, process: &mut MigrationProcess, handles: &mut HandleSet) {
        for handle in handles.iter_mut() {
            let Some(operation) = handle.operation() else {
                continue;
            };
            let volume_id = handle.volume_id().to_string();
            if operation.is_failed() {
                forget_failed_target(process, &volume_id, operation);
            } else {
                self.delete_volume_disk(process, &volume_id).await;
            }
            handle.mark_compensated();
        }
    }

    async fn delete_volume_disk(&self, process: &mut MigrationProcess, volume_id: &str) {
        let zone = process.placement.availability_zone.clone();
        let process_id = process.process_id.clone();
        let Some(volume) = process.volume_mut(volume_id) else {
            return;
        };
        let Some(disk_id) = volume.provider_volume_id.clone() else {
            return;
        };

        match self.provider.delete_disk(&zone, &disk_id).await {
            Ok(()) => {
                volume.provider_volume_id = None;
                log_volume_operation("delete_disk", &process_id, volume_id, "deleted", Some(&disk_id));
            }
            Err(err) => log_error(
                components::COMPENSATION,
                "delete_disk",
                &err.to_string(),
                Some(&disk_id),
            ),
        }
    }

    async fn delete_instance(&self, process: &mut MigrationProcess) {
        let Some(instance_id) = process.outputs.instance_id.clone() else {
            debug!("No instance was created");
            return;
        };

        match self
            .provider
            .delete_instance(&process.placement.availability_zone, &instance_id)
            .await
        {
            Ok(()) => {
                process.outputs.instance_id = None;
                info!(instance_id = %instance_id, "🗑️ Instance deleted");
            }
            Err(err) => log_error(
                components::COMPENSATION,
                "delete_instance",
                &err.to_string(),
                Some(&instance_id),
            ),
        }
    }
}

/// Drop the id recorded for a resource whose creating operation failed
fn forget_failed_target(process: &mut MigrationProcess, volume_id: &str, operation: &Operation) {
    let Some(volume) = process.volume_mut(volume_id) else {
        return;
    };
    let forgotten = match operation.scope {
        ResourceScope::Zonal => volume.provider_volume_id.take(),
        ResourceScope::Global => volume.disk_image_id.take(),
    };
    debug!(
        volume_id = %volume_id,
        operation_id = %operation.id,
        resource = ?forgotten,
        "Creation failed, nothing to delete"
    );
}
