use crate::common::{rehost_process, MockProvider, ProviderScript};
use migrator_core::models::{HandleSet, Operation, ResourceScope, VolumeResourceHandle};
use migrator_core::orchestration::{wait_for_operation, wait_for_operations, wait_until_running};
use migrator_core::provider::{PowerState, ProviderClient};
use migrator_core::resilience::PollPolicy;
use migrator_core::MigrationError;
use std::time::Duration;

fn fast_policy() -> PollPolicy {
    PollPolicy::fixed(Duration::from_millis(2), Duration::from_secs(5))
}

fn handles_with_operations(count: usize) -> HandleSet {
    let mut handles = HandleSet::new();
    for index in 0..count {
        let mut handle = VolumeResourceHandle::new(format!("vol-{index}"), format!("/raw/vol-{index}.img"));
        handle.begin_operation(Operation::pending(
            format!("op-disk-{index}"),
            ResourceScope::Zonal,
            "zone-a",
        ));
        handles.insert(handle).unwrap();
    }
    handles
}

#[tokio::test]
async fn test_waiting_again_after_success_makes_no_calls() {
    let provider = MockProvider::new(ProviderScript {
        polls_until_done: 3,
        ..ProviderScript::default()
    });
    let mut handles = handles_with_operations(2);

    wait_for_operations(&provider, &mut handles, &fast_policy(), "disk")
        .await
        .unwrap();
    assert!(handles.all_operations_done());
    let polls = provider.call_count("get_operation_state");
    assert_eq!(polls, 6);

    wait_for_operations(&provider, &mut handles, &fast_policy(), "disk")
        .await
        .unwrap();
    assert_eq!(provider.call_count("get_operation_state"), polls);
}

#[tokio::test]
async fn test_wait_times_out_at_the_ceiling() {
    let provider = MockProvider::new(ProviderScript {
        polls_until_done: u32::MAX,
        ..ProviderScript::default()
    });
    let mut handles = handles_with_operations(1);
    let policy = PollPolicy::fixed(Duration::from_millis(10), Duration::from_millis(50));

    let err = wait_for_operations(&provider, &mut handles, &policy, "disk")
        .await
        .unwrap_err();

    match err {
        MigrationError::Timeout { operation, waited } => {
            assert_eq!(operation, "disk");
            assert!(waited > Duration::from_millis(40));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!handles.all_operations_done());
}

#[tokio::test]
async fn test_handle_without_operation_is_a_precondition_failure() {
    let provider = MockProvider::new(ProviderScript::default());
    let mut handles = HandleSet::new();
    handles
        .insert(VolumeResourceHandle::new("vol-0", "/raw/vol-0.img"))
        .unwrap();

    let err = wait_for_operations(&provider, &mut handles, &fast_policy(), "disk")
        .await
        .unwrap_err();

    assert!(matches!(err, MigrationError::Precondition { .. }));
    assert!(provider.calls().is_empty());
}

#[tokio::test]
async fn test_single_operation_failure_carries_provider_message() {
    let provider = MockProvider::new(ProviderScript {
        failing_operation: Some("op-image".to_string()),
        polls_until_done: 2,
        ..ProviderScript::default()
    });
    let operation = Operation::pending("op-image-9", ResourceScope::Global, "global");

    let err = wait_for_operation(&provider, operation, &fast_policy(), "disk image")
        .await
        .unwrap_err();

    assert!(err.to_string().contains("quota exceeded"));
    assert_eq!(provider.call_count("get_operation_state"), 2);
}

#[tokio::test]
async fn test_instance_wait_returns_running_snapshot() {
    let provider = MockProvider::new(ProviderScript {
        instance_states: vec![PowerState::Provisioning, PowerState::Staging, PowerState::Running],
        ..ProviderScript::default()
    });
    let dir = tempfile::tempdir().unwrap();
    let mut process = rehost_process(dir.path(), "W-1", 1);
    process.outputs.instance_id = Some("i-w-1".to_string());

    let snapshot = wait_until_running(&provider, &process, &fast_policy())
        .await
        .unwrap();

    assert_eq!(snapshot.power_state, PowerState::Running);
    assert_eq!(snapshot.instance_id, "i-w-1");
    assert_eq!(provider.call_count("get_instance"), 3);
    assert_eq!(provider.provider_name(), "mock");
}

#[tokio::test]
async fn test_stopped_instance_is_not_waited_on() {
    let provider = MockProvider::new(ProviderScript {
        instance_states: vec![PowerState::Stopped],
        ..ProviderScript::default()
    });
    let dir = tempfile::tempdir().unwrap();
    let process = rehost_process(dir.path(), "W-2", 1);

    let err = wait_until_running(&provider, &process, &fast_policy())
        .await
        .unwrap_err();

    assert!(matches!(err, MigrationError::ProviderOperation { .. }));
    assert_eq!(provider.call_count("get_instance"), 1);
}
