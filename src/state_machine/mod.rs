// State machine module for the migration pipeline
//
// The coarse status is what callers and listeners see; the internal status is
// the fine-grained phase marker that selects the compensation scope.

pub mod events;
pub mod phase_machine;
pub mod states;

pub use events::MigrationEvent;
pub use phase_machine::{PhaseStateMachine, PhaseTransition};
pub use states::{InternalStatus, MigrationStatus, REHOST_PHASES, REPLATFORM_PHASES};
