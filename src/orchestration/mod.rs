//! # Orchestration Engine
//!
//! Runs a migration process end to end.
//!
//! ## Core Components
//!
//! - **MigrationOrchestrator**: phase-by-phase driver with cancellation checkpoints
//! - **UploadCoordinator**: parallel object-store uploads, first failure wins
//! - **CompensationHandler**: rollback keyed on the last committed phase
//! - **ReplatformConfigurator**: remote configuration of a freshly provisioned instance
//! - **waiters**: bounded waits on provider operations and instance boot
//!
//! ## Run Lifecycle
//!
//! ```text
//! validate → assign devices → [checkpoint → commit → publish → work]* → COMPLETED
//!                                        │
//!                                   any error
//!                                        ▼
//!                     compensate(last phase) → CANCELLED/FAILED → re-raise
//! ```

pub mod compensation;
pub mod orchestrator;
pub mod replatform;
pub mod upload_coordinator;
pub mod waiters;

pub use compensation::CompensationHandler;
pub use orchestrator::MigrationOrchestrator;
pub use replatform::ReplatformConfigurator;
pub use upload_coordinator::{UploadCoordinator, UploadJob};
pub use waiters::{wait_for_operation, wait_for_operations, wait_until_running};
