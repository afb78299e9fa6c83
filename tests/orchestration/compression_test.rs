use crate::common::{rehost_process, Harness, MockObjectStore, MockProvider, ProviderScript};
use migrator_core::capture::{staging_directory, Compressor, TarCompressor};
use migrator_core::state_machine::{InternalStatus, MigrationStatus};
use migrator_core::MigrationError;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::{Child, Command};

/// Real `tar`, remembering the directory each archive was built from
#[derive(Debug, Default)]
struct RecordingCompressor {
    directories: Mutex<Vec<PathBuf>>,
}

impl Compressor for RecordingCompressor {
    fn spawn(&self, working_dir: &Path, member: &str, archive: &Path) -> std::io::Result<Child> {
        self.directories.lock().push(working_dir.to_path_buf());
        TarCompressor::default().spawn(working_dir, member, archive)
    }
}

/// Writes a diagnostic to stderr and exits non-zero
struct FailingCompressor;

impl Compressor for FailingCompressor {
    fn spawn(&self, working_dir: &Path, _member: &str, _archive: &Path) -> std::io::Result<Child> {
        Command::new("sh")
            .arg("-c")
            .arg("echo 'no space left on device' >&2; exit 2")
            .current_dir(working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
    }
}

#[tokio::test]
async fn test_raw_files_are_staged_beside_the_capture() {
    let harness = Harness::new(MockProvider::new(ProviderScript::default()), MockObjectStore::default());
    // Captures live outside the tree that holds the working directory
    let captures = tempfile::tempdir().unwrap();
    let mut process = rehost_process(captures.path(), "CP-1", 2);
    let originals: Vec<_> = process.volumes.iter().map(|v| v.raw_file_path.clone()).collect();
    let compressor = Arc::new(RecordingCompressor::default());

    harness
        .orchestrator_with_compressor(compressor.clone())
        .run(&mut process)
        .await
        .unwrap();

    assert_eq!(process.status, MigrationStatus::Completed);
    let directories = compressor.directories.lock().clone();
    assert_eq!(directories.len(), 2);
    for ((directory, original), volume) in directories.iter().zip(&originals).zip(["vol-0", "vol-1"]) {
        assert_eq!(directory.parent(), original.parent());
        assert_eq!(directory, &staging_directory(original, "CP-1", volume));
        assert!(!directory.exists(), "{} was left behind", directory.display());
        assert!(original.is_file());
    }

    // Archives still land in the process working directory
    let work = harness.config.capture.working_directory.join("CP-1");
    assert!(work.join("vol-0.tar.gz").is_file());
    assert!(work.join("vol-1.tar.gz").is_file());
    let mut keys = harness.store.uploaded_keys();
    keys.sort();
    assert_eq!(keys, vec!["CP-1/vol-0.tar.gz".to_string(), "CP-1/vol-1.tar.gz".to_string()]);
}

#[tokio::test]
async fn test_archiver_failure_carries_its_stderr() {
    let harness = Harness::new(MockProvider::new(ProviderScript::default()), MockObjectStore::default());
    let mut process = rehost_process(harness.workdir.path(), "CP-2", 2);
    let original = process.volumes[0].raw_file_path.clone();

    let err = harness
        .orchestrator_with_compressor(Arc::new(FailingCompressor))
        .run(&mut process)
        .await
        .unwrap_err();

    match &err {
        MigrationError::LocalIo { operation, source } => {
            assert_eq!(operation, "archive vol-0");
            assert!(source.to_string().contains("no space left on device"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(process.status, MigrationStatus::Failed);
    let phases = harness.listener.phases();
    assert_eq!(
        phases[phases.len() - 2..],
        [InternalStatus::Compressing, InternalStatus::Failed]
    );

    // Compensation put the staged raw file back
    assert!(original.is_file());
    assert!(!staging_directory(&original, "CP-2", "vol-0").exists());
    assert!(harness.store.uploaded_keys().is_empty());
}
