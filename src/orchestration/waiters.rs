//! Bounded waits on provider-side progress: per-volume operations, a single
//! operation, and instance boot.

use crate::error::{MigrationError, Result};
use crate::models::{HandleSet, MigrationProcess, Operation};
use crate::provider::{InstanceSnapshot, PowerState, ProviderClient};
use crate::resilience::{poll_until, PollClock, PollOutcome, PollPolicy};
use tracing::{debug, warn};

/// Poll every handle's operation until all are `Done`
///
/// Handles whose operation is already `Done` are skipped, so calling this
/// again after success makes no provider calls. A `Done` operation carrying
/// an error fails the wait.
pub async fn wait_for_operations(
    provider: &dyn ProviderClient,
    handles: &mut HandleSet,
    policy: &PollPolicy,
    label: &str,
) -> Result<()> {
    let mut clock = PollClock::new(policy);

    loop {
        let mut pending = 0usize;

        for handle in handles.iter_mut() {
            let volume_id = handle.volume_id().to_string();
            let Some(operation) = handle.operation_mut() else {
                return Err(MigrationError::precondition(format!(
                    "volume {volume_id} has no operation to wait on"
                )));
            };
            if operation.is_done() {
                continue;
            }

            let update = provider
                .get_operation_state(&operation.id, operation.scope, &operation.location)
                .await?;
            operation.apply_update(&update);

            if let Some(message) = failure_of(operation) {
                return Err(MigrationError::provider(
                    format!("{label} {}", operation.id),
                    message,
                ));
            }
            if !operation.is_done() {
                pending += 1;
                debug!(
                    volume_id = %volume_id,
                    operation_id = %operation.id,
                    progress = operation.progress,
                    "Operation still running"
                );
            }
        }

        if pending == 0 {
            return Ok(());
        }
        clock.tick(label).await?;
    }
}

/// Poll a single operation until it is `Done`
pub async fn wait_for_operation(
    provider: &dyn ProviderClient,
    operation: Operation,
    policy: &PollPolicy,
    label: &str,
) -> Result<Operation> {
    let mut current = operation;
    if current.is_done() {
        return match failure_of(&current) {
            Some(message) => Err(MigrationError::provider(label, message)),
            None => Ok(current),
        };
    }

    let id = current.id.clone();
    let scope = current.scope;
    let location = current.location.clone();
    let (id, location) = (id.as_str(), location.as_str());
    let update = poll_until(policy, label, || async move {
        let update = provider.get_operation_state(id, scope, location).await?;
        if update.is_done() {
            Ok(PollOutcome::Ready(update))
        } else {
            Ok(PollOutcome::Pending)
        }
    })
    .await?;

    current.apply_update(&update);
    match failure_of(&current) {
        Some(message) => Err(MigrationError::provider(label, message)),
        None => Ok(current),
    }
}

/// Poll the instance until it reports `RUNNING`
///
/// Booting states keep polling; `TERMINATED` and any other recognised state
/// fail with the provider's own status message. States the provider adds
/// later are logged and polled through.
pub async fn wait_until_running(
    provider: &dyn ProviderClient,
    process: &MigrationProcess,
    policy: &PollPolicy,
) -> Result<InstanceSnapshot> {
    poll_until(policy, "instance boot", || async move {
        let snapshot = provider.get_instance(process).await?;
        match snapshot.power_state.clone() {
            PowerState::Running => Ok(PollOutcome::Ready(snapshot)),
            state if state.is_booting() => {
                debug!(instance_id = %snapshot.instance_id, state = %state, "Instance booting");
                Ok(PollOutcome::Pending)
            }
            PowerState::Unknown(state) => {
                warn!(instance_id = %snapshot.instance_id, state = %state, "Unrecognised instance state");
                Ok(PollOutcome::Pending)
            }
            state => Err(MigrationError::provider(
                format!("instance {} reached {state}", snapshot.instance_id),
                snapshot
                    .status_message
                    .clone()
                    .unwrap_or_else(|| format!("instance is {state}")),
            )),
        }
    })
    .await
}

fn failure_of(operation: &Operation) -> Option<String> {
    if operation.is_failed() {
        operation.error.clone()
    } else {
        None
    }
}
