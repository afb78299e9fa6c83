use crate::common::{
    rehost_process, Harness, MockObjectStore, MockProvider, ProviderScript, RecordingListener,
    StalledCompressor,
};
use migrator_core::capture::staging_directory;
use migrator_core::state_machine::{InternalStatus, MigrationStatus};
use migrator_core::MigrationError;
use std::sync::Arc;
use std::time::{Duration, Instant};

fn cancelling_harness(phase: InternalStatus) -> Harness {
    let harness = Harness::new(MockProvider::new(ProviderScript::default()), MockObjectStore::default());
    let listener = RecordingListener::cancelling_on(phase, harness.registry.clone());
    harness.with_listener(listener)
}

#[tokio::test]
async fn test_cancel_during_capture_runs_cancel_script() {
    let harness = cancelling_harness(InternalStatus::CreateRawFiles);
    let mut process = rehost_process(harness.workdir.path(), "CX-1", 2);

    let err = harness.orchestrator().run(&mut process).await.unwrap_err();

    assert!(err.is_cancellation());
    assert!(matches!(
        err,
        MigrationError::Cancelled { phase: InternalStatus::CreatedRawFiles, .. }
    ));
    assert_eq!(harness.capture.created(), 1);
    assert_eq!(harness.capture.aborted(), 1);
    assert_eq!(
        harness.listener.phases(),
        vec![InternalStatus::CreateRawFiles, InternalStatus::Cancelled]
    );
    assert_eq!(process.status, MigrationStatus::Cancelled);
    assert_eq!(process.internal_status, InternalStatus::Cancelled);
    assert!(harness.provider.calls().is_empty());
}

#[tokio::test]
async fn test_cancel_during_compression_restores_raw_files() {
    let harness = cancelling_harness(InternalStatus::Compressing);
    let mut process = rehost_process(harness.workdir.path(), "CX-2", 2);
    let originals: Vec<_> = process.volumes.iter().map(|v| v.raw_file_path.clone()).collect();

    let started = Instant::now();
    let err = harness
        .orchestrator_with_compressor(Arc::new(StalledCompressor))
        .run(&mut process)
        .await
        .unwrap_err();

    // The stalled archiver was killed rather than waited out
    assert!(started.elapsed() < Duration::from_secs(10));
    assert!(err.is_cancellation());
    assert_eq!(process.status, MigrationStatus::Cancelled);
    assert_eq!(
        harness.listener.changes().last().and_then(|c| c.error_kind.clone()).as_deref(),
        Some(err.kind())
    );

    for original in &originals {
        assert!(original.is_file(), "{} was not restored", original.display());
    }
    for (original, volume) in originals.iter().zip(["vol-0", "vol-1"]) {
        let staging = staging_directory(original, "CX-2", volume);
        assert!(!staging.exists(), "{} was left behind", staging.display());
    }
    assert!(!harness
        .config
        .capture
        .working_directory
        .join("CX-2")
        .join("vol-0.tar.gz")
        .exists());

    assert!(harness.provider.calls().is_empty());
    assert!(harness.store.uploaded_keys().is_empty());
    assert_eq!(harness.capture.aborted(), 0);
}

#[tokio::test]
async fn test_cancel_after_disks_deletes_them_without_launching() {
    let harness = cancelling_harness(InternalStatus::CreatedDisk);
    let mut process = rehost_process(harness.workdir.path(), "CX-3", 2);

    let err = harness.orchestrator().run(&mut process).await.unwrap_err();

    assert!(matches!(
        err,
        MigrationError::Cancelled { phase: InternalStatus::CreatingInstance, .. }
    ));
    assert_eq!(harness.provider.call_count("run_instance"), 0);

    let mut deleted = harness.provider.deleted_disks();
    deleted.sort();
    assert_eq!(
        deleted,
        vec!["mig-cx-3-vol-0-disk".to_string(), "mig-cx-3-vol-1-disk".to_string()]
    );
    assert!(process.volumes.iter().all(|v| v.provider_volume_id.is_none()));
    assert_eq!(process.status, MigrationStatus::Cancelled);
    assert_eq!(
        harness.listener.phases().last(),
        Some(&InternalStatus::Cancelled)
    );
}

#[tokio::test]
async fn test_cancel_requested_before_run_is_observed_first() {
    let harness = Harness::new(MockProvider::new(ProviderScript::default()), MockObjectStore::default());
    let mut process = rehost_process(harness.workdir.path(), "CX-4", 1);
    let orchestrator = harness.orchestrator();
    assert!(orchestrator.cancel("CX-4"));

    let err = orchestrator.run(&mut process).await.unwrap_err();

    assert!(matches!(
        err,
        MigrationError::Cancelled { phase: InternalStatus::CreateRawFiles, .. }
    ));
    assert_eq!(harness.listener.phases(), vec![InternalStatus::Cancelled]);
    assert_eq!(harness.capture.created(), 0);
    // The finished run leaves nothing behind in the registry
    assert!(harness.registry.is_empty());
}
