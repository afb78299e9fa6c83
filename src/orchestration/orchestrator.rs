//! # Migration Orchestrator
//!
//! Drives one [`MigrationProcess`] through its phase plan. Every phase
//! boundary is a cancellation checkpoint followed by a committed transition
//! and a published [`StatusChange`]. Any error (cancellation included) is
//! caught exactly once in [`MigrationOrchestrator::run`], compensated for the
//! last committed phase, recorded as a terminal status and then returned.

use super::compensation::CompensationHandler;
use super::replatform::ReplatformConfigurator;
use super::upload_coordinator::{UploadCoordinator, UploadJob};
use super::waiters::{wait_for_operation, wait_for_operations, wait_until_running};
use crate::cancellation::CancellationRegistry;
use crate::capture::{
    drain_stderr, staging_directory, Compressor, ScriptedCaptureSource, SourceCapture,
    TarCompressor,
};
use crate::config::MigratorConfig;
use crate::constants::{components, ARCHIVE_EXTENSION, ARCHIVE_MEMBER_NAME};
use crate::error::{MigrationError, Result};
use crate::events::{BroadcastStatusPublisher, StatusChange, StatusListener};
use crate::logging::{log_error, log_migration_operation, log_provider_operation, log_volume_operation};
use crate::models::{
    assign_device_names, HandleSet, MigrationKind, MigrationProcess, Volume, VolumeResourceHandle,
};
use crate::provider::{
    object_key, AttachedDisk, DiskImageRequest, DiskRequest, DiskSource, InstanceMetadata,
    ObjectStore, ProviderClient,
};
use crate::remote::RemoteConnector;
use crate::state_machine::{
    InternalStatus, MigrationEvent, PhaseStateMachine, REHOST_PHASES, REPLATFORM_PHASES,
};
use chrono::Utc;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Metadata key carrying the process id on launched instances
const PROCESS_ID_METADATA_KEY: &str = "migration-process-id";
/// Metadata key carrying the migration kind on launched instances
const KIND_METADATA_KEY: &str = "migration-kind";

/// State owned by a single run and dropped with it
struct RunContext {
    machine: PhaseStateMachine,
    handles: HandleSet,
    token: CancellationToken,
    uploads: UploadCoordinator,
}

/// Runs migrations against a provider, an object store and a capture source
pub struct MigrationOrchestrator {
    provider: Arc<dyn ProviderClient>,
    object_store: Arc<dyn ObjectStore>,
    capture: Arc<dyn SourceCapture>,
    compressor: Arc<dyn Compressor>,
    connector: Option<Arc<dyn RemoteConnector>>,
    listener: Arc<dyn StatusListener>,
    cancellations: CancellationRegistry,
    config: Arc<MigratorConfig>,
}

impl std::fmt::Debug for MigrationOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MigrationOrchestrator")
            .field("provider", &self.provider.provider_name())
            .field("has_connector", &self.connector.is_some())
            .field("active_runs", &self.cancellations.len())
            .finish()
    }
}

impl MigrationOrchestrator {
    /// Create an orchestrator with the scripted capture source, `tar`
    /// compression and a broadcast status publisher
    pub fn new(
        provider: Arc<dyn ProviderClient>,
        object_store: Arc<dyn ObjectStore>,
        config: MigratorConfig,
    ) -> Self {
        let capture = Arc::new(ScriptedCaptureSource::new(&config.capture));
        let compressor = Arc::new(TarCompressor::new(config.compression.program.clone()));
        Self {
            provider,
            object_store,
            capture,
            compressor,
            connector: None,
            listener: Arc::new(BroadcastStatusPublisher::default()),
            cancellations: CancellationRegistry::new(),
            config: Arc::new(config),
        }
    }

    pub fn with_capture(mut self, capture: Arc<dyn SourceCapture>) -> Self {
        self.capture = capture;
        self
    }

    pub fn with_compressor(mut self, compressor: Arc<dyn Compressor>) -> Self {
        self.compressor = compressor;
        self
    }

    /// Remote session factory; required for replatform runs
    pub fn with_connector(mut self, connector: Arc<dyn RemoteConnector>) -> Self {
        self.connector = Some(connector);
        self
    }

    pub fn with_listener(mut self, listener: Arc<dyn StatusListener>) -> Self {
        self.listener = listener;
        self
    }

    /// Share a registry with the control plane that issues cancellations
    pub fn with_cancellations(mut self, cancellations: CancellationRegistry) -> Self {
        self.cancellations = cancellations;
        self
    }

    pub fn config(&self) -> &MigratorConfig {
        &self.config
    }

    pub fn cancellations(&self) -> &CancellationRegistry {
        &self.cancellations
    }

    /// Request cancellation of a process; observed at its next phase boundary
    ///
    /// A request for a process that is never run stays registered until
    /// removed through [`cancellations`](Self::cancellations).
    pub fn cancel(&self, process_id: &str) -> bool {
        self.cancellations.cancel(process_id)
    }

    /// Run a migration to completion
    ///
    /// On error the record is left in `Failed` (or `Cancelled`) with whatever
    /// outputs were produced before the failure, and compensation has run.
    #[instrument(skip_all, fields(process_id = %process.process_id, kind = %process.kind))]
    pub async fn run(&self, process: &mut MigrationProcess) -> Result<()> {
        let plan = match process.kind {
            MigrationKind::Rehost => REHOST_PHASES,
            MigrationKind::Replatform => REPLATFORM_PHASES,
        };
        let mut ctx = RunContext {
            machine: PhaseStateMachine::new(plan),
            handles: HandleSet::new(),
            token: self.cancellations.token_for(&process.process_id),
            uploads: UploadCoordinator::new(
                Arc::clone(&self.object_store),
                self.config.polling.upload_interval(),
            ),
        };

        let started = Instant::now();
        log_migration_operation(
            "run",
            &process.process_id,
            &process.kind.to_string(),
            process.internal_status.as_str(),
            "started",
            None,
        );

        let outcome = match self.prepare(process, &mut ctx) {
            Ok(()) => match process.kind {
                MigrationKind::Rehost => self.run_rehost(process, &mut ctx).await,
                MigrationKind::Replatform => self.run_replatform(process, &mut ctx).await,
            },
            Err(err) => Err(err),
        };

        let result = match outcome {
            Ok(()) => {
                self.clean_up_after_completion(process).await;
                log_migration_operation(
                    "run",
                    &process.process_id,
                    &process.kind.to_string(),
                    process.internal_status.as_str(),
                    "completed",
                    Some(&format!("{}ms", started.elapsed().as_millis())),
                );
                Ok(())
            }
            Err(err) => self.fail(process, &mut ctx, err).await,
        };

        ctx.handles.clear();
        self.cancellations.remove(&process.process_id);
        result
    }

    fn prepare(&self, process: &mut MigrationProcess, ctx: &mut RunContext) -> Result<()> {
        self.config.validate()?;
        process.validate()?;
        assign_device_names(&mut process.volumes)?;
        for volume in &process.volumes {
            ctx.handles.insert(VolumeResourceHandle::new(
                volume.id.clone(),
                volume.raw_file_path.clone(),
            ))?;
        }
        Ok(())
    }

    async fn run_rehost(&self, process: &mut MigrationProcess, ctx: &mut RunContext) -> Result<()> {
        self.enter(process, ctx, InternalStatus::CreateRawFiles).await?;
        self.capture.create_raw_files(process).await?;
        self.enter(process, ctx, InternalStatus::CreatedRawFiles).await?;

        self.enter(process, ctx, InternalStatus::Compressing).await?;
        self.compress_volumes(process, ctx).await?;

        self.enter(process, ctx, InternalStatus::UploadToStorage).await?;
        self.upload_volumes(process, ctx).await?;

        self.enter(process, ctx, InternalStatus::CreatingDiskImage).await?;
        self.create_disk_images(process, ctx).await?;
        self.enter(process, ctx, InternalStatus::CreatedDiskImage).await?;

        self.enter(process, ctx, InternalStatus::CreatingDisk).await?;
        self.create_disks(process, ctx).await?;
        self.enter(process, ctx, InternalStatus::CreatedDisk).await?;

        self.enter(process, ctx, InternalStatus::CreatingInstance).await?;
        self.launch_instance(process, ctx).await?;
        self.enter(process, ctx, InternalStatus::InitiateInstance).await?;
        self.await_instance(process).await?;

        self.enter(process, ctx, InternalStatus::CreatingMachineImage).await?;
        self.create_machine_image(process).await?;

        self.enter(process, ctx, InternalStatus::Completed).await
    }

    async fn run_replatform(
        &self,
        process: &mut MigrationProcess,
        ctx: &mut RunContext,
    ) -> Result<()> {
        let connector = self.connector.clone().ok_or_else(|| {
            MigrationError::configuration("replatform runs need a remote connector")
        })?;
        self.require_base_image(process).await?;

        self.enter(process, ctx, InternalStatus::CreateRawFiles).await?;
        self.capture.create_raw_files(process).await?;
        self.enter(process, ctx, InternalStatus::CreatedRawFiles).await?;

        self.enter(process, ctx, InternalStatus::UploadToStorage).await?;
        self.upload_volumes(process, ctx).await?;

        self.enter(process, ctx, InternalStatus::CreatingDisk).await?;
        self.create_disks(process, ctx).await?;
        self.enter(process, ctx, InternalStatus::CreatedDisk).await?;

        self.enter(process, ctx, InternalStatus::CreatingInstance).await?;
        self.launch_instance(process, ctx).await?;
        self.await_instance(process).await?;
        ReplatformConfigurator::new(connector, self.config.replatform.clone())
            .configure(process)
            .await?;

        self.enter(process, ctx, InternalStatus::CreatingMachineImage).await?;
        self.create_machine_image(process).await?;

        self.enter(process, ctx, InternalStatus::Completed).await
    }

    /// Cancellation checkpoint, then commit and publish the phase
    async fn enter(
        &self,
        process: &mut MigrationProcess,
        ctx: &mut RunContext,
        phase: InternalStatus,
    ) -> Result<()> {
        if ctx.token.is_cancelled() {
            info!(phase = %phase, "🛑 Cancellation observed before phase");
            return Err(MigrationError::cancelled(&process.process_id, phase));
        }
        self.commit(process, &mut ctx.machine, MigrationEvent::Enter(phase), None)
            .await
    }

    async fn commit(
        &self,
        process: &mut MigrationProcess,
        machine: &mut PhaseStateMachine,
        event: MigrationEvent,
        error_kind: Option<&str>,
    ) -> Result<()> {
        let phase = machine.transition(event)?;
        process.internal_status = phase;
        process.status = machine.coarse_status();

        log_migration_operation(
            "phase_transition",
            &process.process_id,
            &process.kind.to_string(),
            phase.as_str(),
            &process.status.to_string(),
            error_kind,
        );

        self.listener
            .on_status_change(StatusChange {
                event_id: Uuid::new_v4(),
                process_id: process.process_id.clone(),
                status: process.status,
                internal_status: phase,
                error_kind: error_kind.map(str::to_string),
                published_at: Utc::now(),
            })
            .await;
        Ok(())
    }

    /// Compensate for the last committed phase, record the terminal status, re-raise
    async fn fail(
        &self,
        process: &mut MigrationProcess,
        ctx: &mut RunContext,
        err: MigrationError,
    ) -> Result<()> {
        let last_phase = ctx.machine.last_phase();
        log_error(
            components::ORCHESTRATOR,
            "run",
            &err.to_string(),
            Some(&format!("{} at {}", process.process_id, last_phase)),
        );

        CompensationHandler::new(Arc::clone(&self.provider), Arc::clone(&self.capture))
            .compensate(process, &mut ctx.handles, &ctx.uploads, last_phase)
            .await;

        let event = if err.is_cancellation() {
            MigrationEvent::Cancel
        } else {
            MigrationEvent::fail_with_error(err.to_string())
        };
        if let Err(transition_err) = self
            .commit(process, &mut ctx.machine, event, Some(err.kind()))
            .await
        {
            warn!(error = %transition_err, "Could not record terminal status");
        }
        Err(err)
    }

    fn process_directory(&self, process: &MigrationProcess) -> PathBuf {
        self.config
            .capture
            .working_directory
            .join(&process.process_id)
    }

    /// Archive each raw capture as `disk.raw` into the process working directory
    ///
    /// The raw file is staged under the archive member name in a directory
    /// beside it, so the move never crosses a filesystem boundary.
    #[instrument(skip_all)]
    async fn compress_volumes(
        &self,
        process: &MigrationProcess,
        ctx: &mut RunContext,
    ) -> Result<()> {
        let base = self.process_directory(process);
        tokio::fs::create_dir_all(&base)
            .await
            .map_err(|e| MigrationError::local_io("create working directory", e))?;

        for volume in &process.volumes {
            let handle = ctx.handles.get_mut(&volume.id).ok_or_else(|| missing_handle(&volume.id))?;
            let staging_dir = staging_directory(handle.original_raw_path(), &process.process_id, &volume.id);
            let member = staging_dir.join(ARCHIVE_MEMBER_NAME);
            let archive = base.join(format!("{}.{ARCHIVE_EXTENSION}", volume.id));

            tokio::fs::create_dir_all(&staging_dir)
                .await
                .map_err(|e| MigrationError::local_io("create staging directory", e))?;
            tokio::fs::rename(handle.original_raw_path(), &member)
                .await
                .map_err(|e| MigrationError::local_io(format!("stage raw file of {}", volume.id), e))?;
            handle.set_working_raw_path(Some(member.clone()));
            handle.set_archive_path(archive.clone());

            let mut child = self
                .compressor
                .spawn(&staging_dir, ARCHIVE_MEMBER_NAME, &archive)
                .map_err(|e| MigrationError::local_io(format!("start archiver for {}", volume.id), e))?;
            let stderr = drain_stderr(&mut child);
            handle.attach_compression(child);

            let status = match handle.compression_mut() {
                Some(child) => {
                    tokio::select! {
                        status = child.wait() => status
                            .map_err(|e| MigrationError::local_io(format!("archive {}", volume.id), e))?,
                        // The child stays on the handle for compensation to kill
                        _ = ctx.token.cancelled() => {
                            return Err(MigrationError::cancelled(
                                &process.process_id,
                                InternalStatus::Compressing,
                            ));
                        }
                    }
                }
                None => return Err(missing_handle(&volume.id)),
            };
            handle.take_compression();

            if !status.success() {
                let output = match stderr {
                    Some(output) => output.await.unwrap_or_default(),
                    None => String::new(),
                };
                let message = if output.is_empty() {
                    format!("archiver exited with {status}")
                } else {
                    format!("archiver exited with {status}: {output}")
                };
                log_error(components::COMPRESSION, "archive", &message, Some(&volume.id));
                return Err(MigrationError::local_io(
                    format!("archive {}", volume.id),
                    std::io::Error::other(message),
                ));
            }

            tokio::fs::rename(&member, handle.original_raw_path())
                .await
                .map_err(|e| MigrationError::local_io(format!("restore raw file of {}", volume.id), e))?;
            handle.set_working_raw_path(None);
            if let Err(err) = tokio::fs::remove_dir(&staging_dir).await {
                debug!(volume_id = %volume.id, error = %err, "Staging directory left in place");
            }

            log_volume_operation(
                "compress",
                &process.process_id,
                &volume.id,
                "compressed",
                Some(&archive.display().to_string()),
            );
        }
        Ok(())
    }

    #[instrument(skip_all)]
    async fn upload_volumes(&self, process: &MigrationProcess, ctx: &mut RunContext) -> Result<()> {
        let storage = &self.config.storage;
        self.object_store
            .create_bucket(&storage.bucket, &storage.region)
            .await?;

        let jobs = ctx
            .handles
            .iter()
            .map(|handle| UploadJob {
                volume_id: handle.volume_id().to_string(),
                source: handle.upload_source().to_path_buf(),
                bucket: storage.bucket.clone(),
                key: object_key(&process.process_id, &upload_file_name(handle)),
            })
            .collect();

        ctx.uploads
            .upload_all(&process.process_id, jobs, &ctx.token)
            .await
    }

    #[instrument(skip_all)]
    async fn create_disk_images(
        &self,
        process: &mut MigrationProcess,
        ctx: &mut RunContext,
    ) -> Result<()> {
        for handle in ctx.handles.iter_mut() {
            let request = DiskImageRequest {
                image_name: process.resource_name(&format!("{}-image", handle.volume_id())),
                bucket: self.config.storage.bucket.clone(),
                object_key: object_key(&process.process_id, &upload_file_name(handle)),
            };
            let operation = self.provider.create_disk_image(&request).await?;
            log_provider_operation(
                "create_disk_image",
                self.provider.provider_name(),
                Some(&request.image_name),
                "submitted",
                None,
            );

            if let Some(volume) = process.volume_mut(handle.volume_id()) {
                volume.task_id = Some(operation.id.clone());
                volume.disk_image_id = Some(
                    operation
                        .target_id
                        .clone()
                        .unwrap_or_else(|| request.image_name.clone()),
                );
            }
            handle.begin_operation(operation);
        }

        wait_for_operations(
            self.provider.as_ref(),
            &mut ctx.handles,
            &self.config.polling.operation_policy(),
            "disk image",
        )
        .await?;

        for handle in ctx.handles.iter() {
            let target = handle.operation().and_then(|op| op.target_id.clone());
            if let (Some(target), Some(volume)) = (target, process.volume_mut(handle.volume_id())) {
                volume.disk_image_id = Some(target);
            }
        }
        Ok(())
    }

    #[instrument(skip_all)]
    async fn create_disks(&self, process: &mut MigrationProcess, ctx: &mut RunContext) -> Result<()> {
        let requests = process
            .volumes
            .iter()
            .map(|volume| -> Result<(String, DiskRequest)> {
                Ok((volume.id.clone(), disk_request(process, volume)?))
            })
            .collect::<Result<Vec<_>>>()?;

        for (volume_id, request) in requests {
            let operation = self.provider.create_disk(&request).await?;
            log_provider_operation(
                "create_disk",
                self.provider.provider_name(),
                Some(&request.disk_name),
                "submitted",
                None,
            );

            if let Some(volume) = process.volume_mut(&volume_id) {
                volume.task_id = Some(operation.id.clone());
                volume.provider_volume_id = Some(
                    operation
                        .target_id
                        .clone()
                        .unwrap_or_else(|| request.disk_name.clone()),
                );
            }
            ctx.handles
                .get_mut(&volume_id)
                .ok_or_else(|| missing_handle(&volume_id))?
                .begin_operation(operation);
        }

        wait_for_operations(
            self.provider.as_ref(),
            &mut ctx.handles,
            &self.config.polling.operation_policy(),
            "disk",
        )
        .await?;

        for handle in ctx.handles.iter() {
            let target = handle.operation().and_then(|op| op.target_id.clone());
            if let (Some(target), Some(volume)) = (target, process.volume_mut(handle.volume_id())) {
                volume.provider_volume_id = Some(target);
            }
        }
        Ok(())
    }

    async fn require_base_image(&self, process: &MigrationProcess) -> Result<()> {
        let base_image = process
            .replatform
            .as_ref()
            .map(|plan| plan.base_image.as_str())
            .ok_or_else(|| MigrationError::precondition("replatform plan missing"))?;

        match self.provider.get_machine_image(base_image).await? {
            Some(image) => {
                debug!(image_id = %image.id, "Base image found");
                Ok(())
            }
            None => Err(MigrationError::precondition(format!(
                "base machine image {base_image} does not exist"
            ))),
        }
    }

    /// Fill resolved network names and security groups; returns network tags
    async fn resolve_network(&self, process: &mut MigrationProcess) -> Result<Vec<String>> {
        let placement = &process.placement;
        let network = self.provider.get_network(&placement.network_id).await?;
        let subnet = self
            .provider
            .get_subnet(&placement.region, &placement.subnet_id)
            .await?;
        let firewalls = self.provider.list_firewalls(&network.name).await?;

        let mut tags: Vec<String> = firewalls
            .iter()
            .flat_map(|rule| rule.target_tags.iter().cloned())
            .collect();
        tags.sort();
        tags.dedup();

        process.placement.network_name = Some(network.name);
        process.placement.subnet_name = Some(subnet.name);
        process.outputs.security_groups = firewalls.into_iter().map(|rule| rule.name).collect();
        Ok(tags)
    }

    #[instrument(skip_all)]
    async fn launch_instance(
        &self,
        process: &mut MigrationProcess,
        ctx: &mut RunContext,
    ) -> Result<()> {
        if !ctx.handles.all_operations_done() {
            return Err(MigrationError::precondition(
                "instance creation requires every volume operation to be done",
            ));
        }

        let network_tags = self.resolve_network(process).await?;
        let disks = process
            .volumes
            .iter()
            .map(attached_disk)
            .collect::<Result<Vec<_>>>()?;
        let metadata = InstanceMetadata {
            items: [
                (PROCESS_ID_METADATA_KEY.to_string(), process.process_id.clone()),
                (KIND_METADATA_KEY.to_string(), process.kind.to_string()),
            ]
            .into_iter()
            .collect(),
            network_tags,
        };

        let started = Instant::now();
        let launch = self.provider.run_instance(process, &disks, &metadata).await?;
        log_provider_operation(
            "run_instance",
            self.provider.provider_name(),
            Some(&launch.instance_id),
            "submitted",
            Some(started.elapsed().as_millis() as u64),
        );

        process.outputs.instance_id = Some(launch.instance_id);
        process.outputs.instance_name = Some(launch.name);
        Ok(())
    }

    #[instrument(skip_all)]
    async fn await_instance(&self, process: &mut MigrationProcess) -> Result<()> {
        let snapshot = wait_until_running(
            self.provider.as_ref(),
            process,
            &self.config.polling.instance_policy(),
        )
        .await?;
        process.apply_instance_snapshot(&snapshot);

        if process.placement.assign_public_ip {
            self.provider.add_public_access(process).await?;
            let refreshed = self.provider.get_instance(process).await?;
            process.apply_instance_snapshot(&refreshed);
        }

        info!(
            instance_id = process.outputs.instance_id.as_deref(),
            private_ip = process.outputs.private_ip.as_deref(),
            public_ip = process.outputs.public_ip.as_deref(),
            "🖥️ Instance running"
        );
        Ok(())
    }

    #[instrument(skip_all)]
    async fn create_machine_image(&self, process: &mut MigrationProcess) -> Result<()> {
        let image_name = process.resource_name("image");
        let operation = self.provider.create_machine_image(process).await?;
        let finished = wait_for_operation(
            self.provider.as_ref(),
            operation,
            &self.config.polling.operation_policy(),
            "machine image",
        )
        .await?;

        process.outputs.image_id = Some(finished.target_id.unwrap_or_else(|| image_name.clone()));
        process.outputs.image_name = Some(image_name);
        log_provider_operation(
            "create_machine_image",
            self.provider.provider_name(),
            process.outputs.image_id.as_deref(),
            "done",
            None,
        );
        Ok(())
    }

    /// Remove local and remote intermediates; failures here never fail the run
    async fn clean_up_after_completion(&self, process: &MigrationProcess) {
        let cleanup = &self.config.cleanup;

        if cleanup.delete_working_directory {
            let directory = self.process_directory(process);
            match tokio::fs::remove_dir_all(&directory).await {
                Ok(()) => debug!(directory = %directory.display(), "Working directory removed"),
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(err) => log_error(
                    components::ORCHESTRATOR,
                    "delete_working_directory",
                    &err.to_string(),
                    Some(&directory.display().to_string()),
                ),
            }
        }

        if cleanup.delete_bucket_after_completion {
            let prefix = format!("{}/", process.process_id);
            if let Err(err) = self
                .object_store
                .delete_folder(&self.config.storage.bucket, &prefix)
                .await
            {
                log_error(
                    components::ORCHESTRATOR,
                    "delete_folder",
                    &err.to_string(),
                    Some(&prefix),
                );
            }
        }
    }
}

fn missing_handle(volume_id: &str) -> MigrationError {
    MigrationError::precondition(format!("volume {volume_id} has no resource handle"))
}

/// Object name for a handle's upload: the archive name, or `<volume>.raw`
fn upload_file_name(handle: &VolumeResourceHandle) -> String {
    handle
        .archive_path()
        .and_then(|path| path.file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| format!("{}.raw", handle.volume_id()))
}

fn disk_request(process: &MigrationProcess, volume: &Volume) -> Result<DiskRequest> {
    let source = match process.kind {
        MigrationKind::Rehost => DiskSource::DiskImage(volume.disk_image_id.clone().ok_or_else(
            || MigrationError::precondition(format!("volume {} has no disk image", volume.id)),
        )?),
        MigrationKind::Replatform if volume.is_root => {
            let plan = process
                .replatform
                .as_ref()
                .ok_or_else(|| MigrationError::precondition("replatform plan missing"))?;
            DiskSource::BaseImage(plan.base_image.clone())
        }
        MigrationKind::Replatform => DiskSource::Blank,
    };

    Ok(DiskRequest {
        disk_name: process.resource_name(&format!("{}-disk", volume.id)),
        zone: process.placement.availability_zone.clone(),
        size_gb: volume.size_gb,
        source,
    })
}

fn attached_disk(volume: &Volume) -> Result<AttachedDisk> {
    let disk_id = volume.provider_volume_id.clone().ok_or_else(|| {
        MigrationError::precondition(format!("volume {} has no created disk", volume.id))
    })?;
    Ok(AttachedDisk {
        volume_id: volume.id.clone(),
        disk_id,
        boot: volume.is_root,
        device_name: volume.device_name.clone(),
    })
}
