use super::events::MigrationEvent;
use super::states::{InternalStatus, MigrationStatus};
use crate::error::{MigrationError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A committed phase transition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseTransition {
    pub from: InternalStatus,
    pub to: InternalStatus,
    pub event: String,
    pub at: DateTime<Utc>,
}

/// Phase state machine for a single migration run
///
/// Only two shapes of transition are accepted: entering the next phase of the
/// run's plan, or jumping from a non-terminal phase to `Cancelled`/`Failed`.
/// The last committed non-terminal phase is kept so compensation can still be
/// scoped after the terminal jump.
#[derive(Debug, Clone)]
pub struct PhaseStateMachine {
    plan: &'static [InternalStatus],
    current: InternalStatus,
    last_phase: InternalStatus,
    history: Vec<PhaseTransition>,
}

impl PhaseStateMachine {
    /// Create a state machine for the given phase plan
    pub fn new(plan: &'static [InternalStatus]) -> Self {
        Self {
            plan,
            current: InternalStatus::Pending,
            last_phase: InternalStatus::Pending,
            history: Vec::new(),
        }
    }

    /// Current internal status
    pub fn current(&self) -> InternalStatus {
        self.current
    }

    /// Last committed phase that was not a terminal jump
    pub fn last_phase(&self) -> InternalStatus {
        self.last_phase
    }

    /// Every committed transition, oldest first
    pub fn history(&self) -> &[PhaseTransition] {
        &self.history
    }

    /// The phase plan this machine enforces
    pub fn plan(&self) -> &'static [InternalStatus] {
        self.plan
    }

    /// Whether the plan contains the given phase
    pub fn plan_contains(&self, phase: InternalStatus) -> bool {
        self.plan.contains(&phase)
    }

    /// Next phase the plan allows, if any
    pub fn next_phase(&self) -> Option<InternalStatus> {
        if self.current.is_terminal() {
            return None;
        }
        match self.plan.iter().position(|p| *p == self.current) {
            Some(idx) => self.plan.get(idx + 1).copied(),
            None if self.current == InternalStatus::Pending => self.plan.first().copied(),
            None => None,
        }
    }

    /// Coarse status implied by the current internal status
    pub fn coarse_status(&self) -> MigrationStatus {
        match self.current {
            InternalStatus::Pending => MigrationStatus::Pending,
            InternalStatus::Completed => MigrationStatus::Completed,
            InternalStatus::Cancelled => MigrationStatus::Cancelled,
            InternalStatus::Failed => MigrationStatus::Failed,
            _ => MigrationStatus::InProgress,
        }
    }

    /// Attempt to apply an event, returning the new internal status
    pub fn transition(&mut self, event: MigrationEvent) -> Result<InternalStatus> {
        let from = self.current;
        let target = self.determine_target_state(from, &event)?;

        self.history.push(PhaseTransition {
            from,
            to: target,
            event: event.event_type().to_string(),
            at: Utc::now(),
        });
        self.current = target;
        if !matches!(target, InternalStatus::Cancelled | InternalStatus::Failed) {
            self.last_phase = target;
        }

        Ok(target)
    }

    /// Determine the target state based on current state and event
    fn determine_target_state(
        &self,
        current: InternalStatus,
        event: &MigrationEvent,
    ) -> Result<InternalStatus> {
        let target = match (current, event) {
            (from, MigrationEvent::Enter(to)) if from.is_terminal() => {
                return Err(MigrationError::InvalidTransition { from, to: *to })
            }
            (from, MigrationEvent::Enter(to)) => {
                if self.next_phase() != Some(*to) {
                    return Err(MigrationError::InvalidTransition { from, to: *to });
                }
                *to
            }
            (from, MigrationEvent::Cancel) if !from.is_terminal() => InternalStatus::Cancelled,
            (from, MigrationEvent::Fail(_)) if !from.is_terminal() => InternalStatus::Failed,
            (from, MigrationEvent::Cancel) => {
                return Err(MigrationError::InvalidTransition {
                    from,
                    to: InternalStatus::Cancelled,
                })
            }
            (from, MigrationEvent::Fail(_)) => {
                return Err(MigrationError::InvalidTransition {
                    from,
                    to: InternalStatus::Failed,
                })
            }
        };

        Ok(target)
    }
}
