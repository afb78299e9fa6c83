//! Per-volume, per-run bookkeeping tying local artifacts to provider operations.

use super::operation::{Operation, ResourceScope};
use crate::error::{MigrationError, Result};
use std::path::{Path, PathBuf};
use tokio::process::Child;

/// Ephemeral state for one volume during one run; never persisted or shared
#[derive(Debug)]
pub struct VolumeResourceHandle {
    volume_id: String,
    scope: ResourceScope,
    /// Where the raw capture normally lives
    original_raw_path: PathBuf,
    /// Where the raw capture was moved to for archiving, while it is there
    working_raw_path: Option<PathBuf>,
    archive_path: Option<PathBuf>,
    operation: Option<Operation>,
    compression: Option<Child>,
    compensated: bool,
}

impl VolumeResourceHandle {
    pub fn new(volume_id: impl Into<String>, original_raw_path: impl Into<PathBuf>) -> Self {
        Self {
            volume_id: volume_id.into(),
            scope: ResourceScope::Zonal,
            original_raw_path: original_raw_path.into(),
            working_raw_path: None,
            archive_path: None,
            operation: None,
            compression: None,
            compensated: false,
        }
    }

    pub fn volume_id(&self) -> &str {
        &self.volume_id
    }

    pub fn scope(&self) -> ResourceScope {
        self.scope
    }

    pub fn original_raw_path(&self) -> &Path {
        &self.original_raw_path
    }

    pub fn working_raw_path(&self) -> Option<&Path> {
        self.working_raw_path.as_deref()
    }

    pub fn set_working_raw_path(&mut self, path: Option<PathBuf>) {
        self.working_raw_path = path;
    }

    /// File that will be uploaded: the archive when one was built, otherwise the raw capture
    pub fn upload_source(&self) -> &Path {
        self.archive_path
            .as_deref()
            .unwrap_or(self.original_raw_path.as_path())
    }

    pub fn archive_path(&self) -> Option<&Path> {
        self.archive_path.as_deref()
    }

    pub fn set_archive_path(&mut self, path: PathBuf) {
        self.archive_path = Some(path);
    }

    pub fn operation(&self) -> Option<&Operation> {
        self.operation.as_ref()
    }

    pub fn operation_mut(&mut self) -> Option<&mut Operation> {
        self.operation.as_mut()
    }

    /// Attach a newly submitted provider operation; the handle takes its scope
    pub fn begin_operation(&mut self, operation: Operation) {
        self.scope = operation.scope;
        self.operation = Some(operation);
        self.compensated = false;
    }

    /// Whether an operation exists and has reached `Done`
    pub fn is_operation_done(&self) -> bool {
        self.operation.as_ref().is_some_and(Operation::is_done)
    }

    pub fn attach_compression(&mut self, child: Child) {
        self.compression = Some(child);
    }

    pub fn compression_mut(&mut self) -> Option<&mut Child> {
        self.compression.as_mut()
    }

    pub fn take_compression(&mut self) -> Option<Child> {
        self.compression.take()
    }

    pub fn is_compensated(&self) -> bool {
        self.compensated
    }

    pub fn mark_compensated(&mut self) {
        self.compensated = true;
    }
}

/// The run's volume → handle map, owned exclusively by the orchestrator
#[derive(Debug, Default)]
pub struct HandleSet {
    handles: Vec<VolumeResourceHandle>,
}

impl HandleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handle; a second handle for the same volume is rejected
    pub fn insert(&mut self, handle: VolumeResourceHandle) -> Result<()> {
        if self.get(handle.volume_id()).is_some() {
            return Err(MigrationError::precondition(format!(
                "volume {} already has a resource handle for this run",
                handle.volume_id()
            )));
        }
        self.handles.push(handle);
        Ok(())
    }

    pub fn get(&self, volume_id: &str) -> Option<&VolumeResourceHandle> {
        self.handles.iter().find(|h| h.volume_id == volume_id)
    }

    pub fn get_mut(&mut self, volume_id: &str) -> Option<&mut VolumeResourceHandle> {
        self.handles.iter_mut().find(|h| h.volume_id == volume_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &VolumeResourceHandle> {
        self.handles.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut VolumeResourceHandle> {
        self.handles.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// True only when every handle holds an operation in state `Done`
    pub fn all_operations_done(&self) -> bool {
        !self.handles.is_empty() && self.handles.iter().all(VolumeResourceHandle::is_operation_done)
    }

    /// Drop every handle at the end of a run
    pub fn clear(&mut self) {
        self.handles.clear();
    }
}
