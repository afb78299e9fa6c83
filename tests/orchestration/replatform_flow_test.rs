use crate::common::{
    replatform_process, Harness, MockConnector, MockObjectStore, MockProvider, MockRemoteHost,
    ProviderScript,
};
use migrator_core::provider::DiskSource;
use migrator_core::state_machine::{InternalStatus, MigrationStatus, REPLATFORM_PHASES};
use migrator_core::{MigrationError, MigrationOrchestrator};
use std::sync::Arc;

fn with_host(harness: &Harness, host: &Arc<MockRemoteHost>) -> MigrationOrchestrator {
    harness.orchestrator().with_connector(Arc::new(MockConnector {
        host: Arc::clone(host),
    }))
}

#[tokio::test]
async fn test_replatform_happy_path_configures_instance() {
    let harness = Harness::new(MockProvider::new(ProviderScript::default()), MockObjectStore::default());
    let host = Arc::new(MockRemoteHost::new(true));
    let mut process = replatform_process(harness.workdir.path(), "RP-1");

    with_host(&harness, &host).run(&mut process).await.unwrap();

    assert_eq!(process.status, MigrationStatus::Completed);
    assert_eq!(harness.listener.phases(), REPLATFORM_PHASES.to_vec());

    // Raw volumes are uploaded as-is; no disk images are built
    let mut keys = harness.store.uploaded_keys();
    keys.sort();
    assert_eq!(keys, vec!["RP-1/vol-0.raw".to_string(), "RP-1/vol-1.raw".to_string()]);
    assert_eq!(harness.provider.call_count("create_disk_image"), 0);

    let disks = harness.provider.disk_requests();
    assert_eq!(disks[0].source, DiskSource::BaseImage("ubuntu-2204-lts".to_string()));
    assert_eq!(disks[1].source, DiskSource::Blank);

    // Configuration goes over the public address once it exists
    assert_eq!(host.connections(), vec!["34.64.10.20".to_string()]);

    let commands = host.commands();
    assert!(commands.iter().all(|c| c.starts_with("sudo -n sh -c ")));
    let position = |needle: &str| {
        commands
            .iter()
            .position(|c| c.contains(needle))
            .unwrap_or_else(|| panic!("no command containing {needle}"))
    };
    let mount = position("/dev/sdb");
    let group = position("groupadd");
    let user = position("useradd");
    let dir = position("/etc/app");
    let chown = position("chown");
    let packages = position("apt-get install");
    assert!(mount < group && group < user && user < dir && dir < chown && chown < packages);

    assert_eq!(
        host.uploads(),
        vec![(
            harness.workdir.path().join("app.conf"),
            "/etc/app/app.conf".to_string()
        )]
    );
    assert!(process.outputs.image_id.is_some());
}

#[tokio::test]
async fn test_replatform_without_sudo_runs_commands_directly() {
    let harness = Harness::new(MockProvider::new(ProviderScript::default()), MockObjectStore::default());
    let host = Arc::new(MockRemoteHost::new(false));
    let mut process = replatform_process(harness.workdir.path(), "RP-2");

    with_host(&harness, &host).run(&mut process).await.unwrap();

    assert!(host.commands().iter().all(|c| !c.starts_with("sudo")));
}

#[tokio::test]
async fn test_missing_base_image_fails_before_any_phase() {
    let harness = Harness::new(
        MockProvider::new(ProviderScript {
            base_image_exists: false,
            ..ProviderScript::default()
        }),
        MockObjectStore::default(),
    );
    let host = Arc::new(MockRemoteHost::new(true));
    let mut process = replatform_process(harness.workdir.path(), "RP-3");

    let err = with_host(&harness, &host).run(&mut process).await.unwrap_err();

    match &err {
        MigrationError::Precondition { message } => assert!(message.contains("ubuntu-2204-lts")),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(harness.provider.call_count("create_disk"), 0);
    assert_eq!(harness.capture.created(), 0);
    assert_eq!(harness.listener.phases(), vec![InternalStatus::Failed]);
    assert!(host.connections().is_empty());
}

#[tokio::test]
async fn test_unreachable_instance_is_torn_down() {
    let harness = Harness::new(MockProvider::new(ProviderScript::default()), MockObjectStore::default());
    let host = Arc::new(MockRemoteHost::new(true).with_failed_checks(u32::MAX));
    let mut process = replatform_process(harness.workdir.path(), "RP-4");

    let err = with_host(&harness, &host).run(&mut process).await.unwrap_err();

    match &err {
        MigrationError::Connectivity { host: address, attempts, .. } => {
            assert_eq!(address, "34.64.10.20");
            assert_eq!(*attempts, harness.config.replatform.connectivity_attempts);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(host.checks(), harness.config.replatform.connectivity_attempts);
    assert!(host.commands().is_empty());

    assert_eq!(harness.provider.deleted_instances(), vec!["i-rp-4".to_string()]);
    assert_eq!(harness.provider.deleted_disks().len(), 2);
    assert_eq!(process.status, MigrationStatus::Failed);
}

#[tokio::test]
async fn test_instance_reachable_after_retries() {
    let harness = Harness::new(MockProvider::new(ProviderScript::default()), MockObjectStore::default());
    let host = Arc::new(MockRemoteHost::new(true).with_failed_checks(2));
    let mut process = replatform_process(harness.workdir.path(), "RP-5");

    with_host(&harness, &host).run(&mut process).await.unwrap();

    assert_eq!(host.checks(), 3);
    assert_eq!(host.connections().len(), 3);
    assert_eq!(process.status, MigrationStatus::Completed);
}

#[tokio::test]
async fn test_failing_remote_step_reports_its_name() {
    let harness = Harness::new(MockProvider::new(ProviderScript::default()), MockObjectStore::default());
    let host = Arc::new(MockRemoteHost::new(true).failing_on("useradd"));
    let mut process = replatform_process(harness.workdir.path(), "RP-6");

    let err = with_host(&harness, &host).run(&mut process).await.unwrap_err();

    match &err {
        MigrationError::RemoteCommand { step, exit_code, stderr } => {
            assert_eq!(step, "add_user");
            assert_eq!(*exit_code, 1);
            assert!(stderr.contains("permission denied"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(host.uploads().is_empty());
    assert_eq!(harness.provider.deleted_instances().len(), 1);
}

#[tokio::test]
async fn test_replatform_requires_connector() {
    let harness = Harness::new(MockProvider::new(ProviderScript::default()), MockObjectStore::default());
    let mut process = replatform_process(harness.workdir.path(), "RP-7");

    let err = harness.orchestrator().run(&mut process).await.unwrap_err();

    assert!(matches!(err, MigrationError::Configuration { .. }));
    assert!(harness.provider.calls().is_empty());
    assert_eq!(harness.listener.phases(), vec![InternalStatus::Failed]);
}
