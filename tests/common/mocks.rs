//! In-memory fakes for the provider, object store, capture source, remote
//! access and status listener. Every fake records what it was asked to do.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use migrator_core::capture::{Compressor, SourceCapture};
use migrator_core::error::{MigrationError, Result};
use migrator_core::events::{StatusChange, StatusListener};
use migrator_core::models::{MigrationProcess, Operation, OperationStatus, ResourceScope};
use migrator_core::provider::{
    AttachedDisk, DiskImageRequest, DiskRequest, FirewallRule, InstanceLaunch, InstanceMetadata,
    InstanceSnapshot, MachineImageInfo, NetworkInfo, ObjectStore, PowerState, ProviderClient,
    SubnetInfo,
};
use migrator_core::remote::{CommandOutput, RemoteConnector, RemoteShell};
use migrator_core::state_machine::InternalStatus;
use migrator_core::CancellationRegistry;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::{Child, Command};

/// Knobs for [`MockProvider`]
#[derive(Debug, Clone)]
pub struct ProviderScript {
    /// Polls answered with `RUNNING` before an operation reports `DONE`
    pub polls_until_done: u32,
    /// Operations whose id contains this text finish with an error
    pub failing_operation: Option<String>,
    /// Power states returned by successive `get_instance` calls; the last one repeats
    pub instance_states: Vec<PowerState>,
    pub base_image_exists: bool,
}

impl Default for ProviderScript {
    fn default() -> Self {
        Self {
            polls_until_done: 1,
            failing_operation: None,
            instance_states: vec![PowerState::Provisioning, PowerState::Running],
            base_image_exists: true,
        }
    }
}

#[derive(Debug, Default)]
struct ProviderState {
    calls: Vec<String>,
    next_id: u32,
    operations: HashMap<String, (ResourceScope, String, Option<String>)>,
    poll_counts: HashMap<String, u32>,
    instance_polls: usize,
    attached: Vec<AttachedDisk>,
    metadata: Option<InstanceMetadata>,
    public_access: bool,
    disk_images: Vec<DiskImageRequest>,
    disks: Vec<DiskRequest>,
    cancelled: Vec<(String, ResourceScope)>,
    deleted_disks: Vec<String>,
    deleted_instances: Vec<String>,
}

/// Scriptable in-memory cloud
#[derive(Debug, Default)]
pub struct MockProvider {
    script: ProviderScript,
    state: Mutex<ProviderState>,
}

impl MockProvider {
    pub fn new(script: ProviderScript) -> Self {
        Self {
            script,
            state: Mutex::new(ProviderState::default()),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().calls.clone()
    }

    /// Number of calls to the named method
    pub fn call_count(&self, method: &str) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|call| call.as_str() == method)
            .count()
    }

    pub fn attached_disks(&self) -> Vec<AttachedDisk> {
        self.state.lock().attached.clone()
    }

    pub fn instance_metadata(&self) -> Option<InstanceMetadata> {
        self.state.lock().metadata.clone()
    }

    pub fn disk_requests(&self) -> Vec<DiskRequest> {
        self.state.lock().disks.clone()
    }

    pub fn disk_image_requests(&self) -> Vec<DiskImageRequest> {
        self.state.lock().disk_images.clone()
    }

    pub fn cancelled_operations(&self) -> Vec<(String, ResourceScope)> {
        self.state.lock().cancelled.clone()
    }

    pub fn deleted_disks(&self) -> Vec<String> {
        self.state.lock().deleted_disks.clone()
    }

    pub fn deleted_instances(&self) -> Vec<String> {
        self.state.lock().deleted_instances.clone()
    }

    fn record(&self, call: &str) {
        self.state.lock().calls.push(call.to_string());
    }

    fn submit(&self, kind: &str, scope: ResourceScope, location: &str, target: &str) -> Operation {
        let mut state = self.state.lock();
        state.next_id += 1;
        let id = format!("op-{kind}-{}", state.next_id);
        state.operations.insert(
            id.clone(),
            (scope, location.to_string(), Some(target.to_string())),
        );
        Operation::pending(id, scope, location)
    }

    fn snapshot(&self, process: &MigrationProcess, power_state: PowerState) -> InstanceSnapshot {
        let state = self.state.lock();
        InstanceSnapshot {
            instance_id: process
                .outputs
                .instance_id
                .clone()
                .unwrap_or_else(|| "i-unknown".to_string()),
            name: process.resource_name("instance"),
            power_state: power_state.clone(),
            status_message: match power_state {
                PowerState::Terminated => Some("instance was preempted".to_string()),
                _ => None,
            },
            private_ip: Some("10.128.0.7".to_string()),
            public_ip: state.public_access.then(|| "34.64.10.20".to_string()),
            block_devices: state.attached.iter().map(|d| d.disk_id.clone()).collect(),
            launched_at: Some(Utc::now()),
        }
    }
}

#[async_trait]
impl ProviderClient for MockProvider {
    fn provider_name(&self) -> &'static str {
        "mock"
    }

    async fn get_network(&self, network_id: &str) -> Result<NetworkInfo> {
        self.record("get_network");
        Ok(NetworkInfo {
            id: network_id.to_string(),
            name: format!("net-{network_id}"),
        })
    }

    async fn get_subnet(&self, region: &str, subnet_id: &str) -> Result<SubnetInfo> {
        self.record("get_subnet");
        Ok(SubnetInfo {
            id: subnet_id.to_string(),
            name: format!("subnet-{subnet_id}"),
            region: region.to_string(),
            cidr: Some("10.128.0.0/20".to_string()),
        })
    }

    async fn create_disk_image(&self, request: &DiskImageRequest) -> Result<Operation> {
        self.record("create_disk_image");
        self.state.lock().disk_images.push(request.clone());
        Ok(self.submit(
            "image",
            ResourceScope::Global,
            "global",
            &format!("img-{}", request.image_name),
        ))
    }

    async fn create_disk(&self, request: &DiskRequest) -> Result<Operation> {
        self.record("create_disk");
        self.state.lock().disks.push(request.clone());
        Ok(self.submit("disk", ResourceScope::Zonal, &request.zone, &request.disk_name))
    }

    async fn get_operation_state(
        &self,
        operation_id: &str,
        scope: ResourceScope,
        location: &str,
    ) -> Result<Operation> {
        self.record("get_operation_state");
        let mut state = self.state.lock();
        let target = state
            .operations
            .get(operation_id)
            .and_then(|(_, _, target)| target.clone());
        let polls = state.poll_counts.entry(operation_id.to_string()).or_insert(0);
        *polls += 1;

        let mut operation = Operation::pending(operation_id, scope, location);
        operation.target_id = target;
        if *polls >= self.script.polls_until_done {
            operation.status = OperationStatus::Done;
            operation.progress = 100;
            if let Some(failing) = &self.script.failing_operation {
                if operation_id.contains(failing.as_str()) {
                    operation.error = Some("quota exceeded".to_string());
                }
            }
        } else {
            operation.status = OperationStatus::Running;
            operation.progress = 50;
        }
        Ok(operation)
    }

    async fn cancel_operation(
        &self,
        operation_id: &str,
        scope: ResourceScope,
        _location: &str,
    ) -> Result<()> {
        self.record("cancel_operation");
        self.state
            .lock()
            .cancelled
            .push((operation_id.to_string(), scope));
        Ok(())
    }

    async fn run_instance(
        &self,
        process: &MigrationProcess,
        disks: &[AttachedDisk],
        metadata: &InstanceMetadata,
    ) -> Result<InstanceLaunch> {
        self.record("run_instance");
        let mut state = self.state.lock();
        state.attached = disks.to_vec();
        state.metadata = Some(metadata.clone());
        Ok(InstanceLaunch {
            instance_id: format!("i-{}", process.process_id.to_lowercase()),
            name: process.resource_name("instance"),
        })
    }

    async fn add_public_access(&self, _process: &MigrationProcess) -> Result<()> {
        self.record("add_public_access");
        self.state.lock().public_access = true;
        Ok(())
    }

    async fn get_instance(&self, process: &MigrationProcess) -> Result<InstanceSnapshot> {
        self.record("get_instance");
        let power_state = {
            let mut state = self.state.lock();
            let index = state
                .instance_polls
                .min(self.script.instance_states.len().saturating_sub(1));
            state.instance_polls += 1;
            self.script
                .instance_states
                .get(index)
                .cloned()
                .unwrap_or(PowerState::Running)
        };
        Ok(self.snapshot(process, power_state))
    }

    async fn create_machine_image(&self, process: &MigrationProcess) -> Result<Operation> {
        self.record("create_machine_image");
        Ok(self.submit(
            "machine-image",
            ResourceScope::Global,
            "global",
            &format!("mi-{}", process.process_id.to_lowercase()),
        ))
    }

    async fn get_machine_image(&self, name: &str) -> Result<Option<MachineImageInfo>> {
        self.record("get_machine_image");
        Ok(self.script.base_image_exists.then(|| MachineImageInfo {
            id: format!("mi-{name}"),
            name: name.to_string(),
        }))
    }

    async fn delete_disk(&self, _zone: &str, disk_id: &str) -> Result<()> {
        self.record("delete_disk");
        self.state.lock().deleted_disks.push(disk_id.to_string());
        Ok(())
    }

    async fn delete_instance(&self, _zone: &str, instance_id: &str) -> Result<()> {
        self.record("delete_instance");
        self.state
            .lock()
            .deleted_instances
            .push(instance_id.to_string());
        Ok(())
    }

    async fn list_firewalls(&self, network: &str) -> Result<Vec<FirewallRule>> {
        self.record("list_firewalls");
        Ok(vec![FirewallRule {
            name: "allow-ssh".to_string(),
            network: network.to_string(),
            target_tags: vec!["ssh".to_string()],
        }])
    }
}

/// Object store that checks the uploaded file exists locally
#[derive(Debug, Default)]
pub struct MockObjectStore {
    /// Uploads whose key contains this text fail
    pub failing_key: Option<String>,
    /// Time each successful upload takes
    pub upload_delay: Duration,
    uploads: Mutex<Vec<(String, String)>>,
    buckets: Mutex<Vec<String>>,
    deleted_folders: Mutex<Vec<String>>,
}

impl MockObjectStore {
    pub fn failing_on(key_fragment: &str, upload_delay: Duration) -> Self {
        Self {
            failing_key: Some(key_fragment.to_string()),
            upload_delay,
            ..Self::default()
        }
    }

    pub fn uploaded_keys(&self) -> Vec<String> {
        self.uploads.lock().iter().map(|(_, key)| key.clone()).collect()
    }

    pub fn buckets(&self) -> Vec<String> {
        self.buckets.lock().clone()
    }

    pub fn deleted_folders(&self) -> Vec<String> {
        self.deleted_folders.lock().clone()
    }
}

#[async_trait]
impl ObjectStore for MockObjectStore {
    async fn create_bucket(&self, bucket: &str, _region: &str) -> Result<()> {
        self.buckets.lock().push(bucket.to_string());
        Ok(())
    }

    async fn upload_object(&self, bucket: &str, key: &str, source: &Path) -> Result<()> {
        if let Some(failing) = &self.failing_key {
            if key.contains(failing.as_str()) {
                return Err(MigrationError::provider("upload_object", format!("{key}: access denied")));
            }
        }
        tokio::fs::metadata(source)
            .await
            .map_err(|e| MigrationError::local_io("read upload source", e))?;
        tokio::time::sleep(self.upload_delay).await;
        self.uploads
            .lock()
            .push((bucket.to_string(), key.to_string()));
        Ok(())
    }

    async fn delete_folder(&self, _bucket: &str, prefix: &str) -> Result<()> {
        self.deleted_folders.lock().push(prefix.to_string());
        Ok(())
    }
}

/// Capture source whose raw files were written by the test
#[derive(Debug, Default)]
pub struct MockCapture {
    created: Mutex<u32>,
    aborted: Mutex<u32>,
}

impl MockCapture {
    pub fn created(&self) -> u32 {
        *self.created.lock()
    }

    pub fn aborted(&self) -> u32 {
        *self.aborted.lock()
    }
}

#[async_trait]
impl SourceCapture for MockCapture {
    async fn create_raw_files(&self, process: &MigrationProcess) -> Result<()> {
        for volume in &process.volumes {
            tokio::fs::metadata(&volume.raw_file_path)
                .await
                .map_err(|e| MigrationError::local_io("verify raw capture", e))?;
        }
        *self.created.lock() += 1;
        Ok(())
    }

    async fn abort_capture(&self, _process: &MigrationProcess) -> Result<()> {
        *self.aborted.lock() += 1;
        Ok(())
    }
}

/// Archiver that never finishes on its own
#[derive(Debug, Default)]
pub struct StalledCompressor;

impl Compressor for StalledCompressor {
    fn spawn(&self, working_dir: &Path, _member: &str, _archive: &Path) -> std::io::Result<Child> {
        Command::new("sleep")
            .arg("30")
            .current_dir(working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .kill_on_drop(true)
            .spawn()
    }
}

/// Listener that keeps every change and can request cancellation on a phase
#[derive(Debug, Default)]
pub struct RecordingListener {
    changes: Mutex<Vec<StatusChange>>,
    cancel_on: Option<(InternalStatus, CancellationRegistry)>,
}

impl RecordingListener {
    /// Request cancellation as soon as `phase` is committed
    pub fn cancelling_on(phase: InternalStatus, registry: CancellationRegistry) -> Self {
        Self {
            changes: Mutex::new(Vec::new()),
            cancel_on: Some((phase, registry)),
        }
    }

    pub fn changes(&self) -> Vec<StatusChange> {
        self.changes.lock().clone()
    }

    pub fn phases(&self) -> Vec<InternalStatus> {
        self.changes
            .lock()
            .iter()
            .map(|change| change.internal_status)
            .collect()
    }
}

#[async_trait]
impl StatusListener for RecordingListener {
    async fn on_status_change(&self, change: StatusChange) {
        if let Some((phase, registry)) = &self.cancel_on {
            if change.internal_status == *phase {
                registry.cancel(&change.process_id);
            }
        }
        self.changes.lock().push(change);
    }
}

/// Remote host that records commands and uploads
#[derive(Debug, Default)]
pub struct MockRemoteHost {
    /// Connection checks that fail before one succeeds; `u32::MAX` never succeeds
    pub failed_checks: u32,
    pub is_sudoer: bool,
    /// Commands containing this text exit non-zero
    pub failing_command: Option<String>,
    checks: Mutex<u32>,
    commands: Mutex<Vec<String>>,
    uploads: Mutex<Vec<(PathBuf, String)>>,
    connections: Mutex<Vec<String>>,
}

impl MockRemoteHost {
    pub fn new(is_sudoer: bool) -> Self {
        Self {
            is_sudoer,
            ..Self::default()
        }
    }

    pub fn with_failed_checks(mut self, failed_checks: u32) -> Self {
        self.failed_checks = failed_checks;
        self
    }

    pub fn failing_on(mut self, command_fragment: &str) -> Self {
        self.failing_command = Some(command_fragment.to_string());
        self
    }

    /// Connection checks attempted so far
    pub fn checks(&self) -> u32 {
        *self.checks.lock()
    }

    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().clone()
    }

    pub fn uploads(&self) -> Vec<(PathBuf, String)> {
        self.uploads.lock().clone()
    }

    pub fn connections(&self) -> Vec<String> {
        self.connections.lock().clone()
    }
}

/// Connector handing out sessions on a shared [`MockRemoteHost`]
#[derive(Debug, Clone)]
pub struct MockConnector {
    pub host: Arc<MockRemoteHost>,
}

#[async_trait]
impl RemoteConnector for MockConnector {
    async fn connect(
        &self,
        host: &str,
        _port: u16,
        _username: &str,
        _key_file: &Path,
    ) -> Result<Box<dyn RemoteShell>> {
        self.host.connections.lock().push(host.to_string());
        Ok(Box::new(MockShell {
            host: Arc::clone(&self.host),
        }))
    }
}

struct MockShell {
    host: Arc<MockRemoteHost>,
}

#[async_trait]
impl RemoteShell for MockShell {
    async fn check_connection(&self) -> Result<()> {
        let mut checks = self.host.checks.lock();
        *checks += 1;
        if *checks <= self.host.failed_checks {
            return Err(MigrationError::provider("check_connection", "connection refused"));
        }
        Ok(())
    }

    async fn run_commands(&self, commands: &[String]) -> Result<CommandOutput> {
        let mut recorded = self.host.commands.lock();
        for command in commands {
            recorded.push(command.clone());
            if let Some(failing) = &self.host.failing_command {
                if command.contains(failing.as_str()) {
                    return Ok(CommandOutput {
                        exit_code: 1,
                        stdout: String::new(),
                        stderr: format!("{failing}: permission denied"),
                    });
                }
            }
        }
        Ok(CommandOutput::default())
    }

    async fn is_sudoer(&self) -> Result<bool> {
        Ok(self.host.is_sudoer)
    }

    async fn upload_file(&self, local: &Path, remote: &str) -> Result<()> {
        self.host
            .uploads
            .lock()
            .push((local.to_path_buf(), remote.to_string()));
        Ok(())
    }
}
