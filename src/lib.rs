#![allow(clippy::doc_markdown)] // Allow technical terms like PowerShell, WinRM in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Migrator Core Rust
//!
//! Orchestration core that moves a physical or virtual server into a cloud
//! provider.
//!
//! ## Overview
//!
//! A migration run takes a captured source host (one raw file per volume) and
//! drives it through a fixed sequence of phases until a running cloud
//! instance and a reusable machine image exist. Two strategies are supported:
//!
//! - **Rehost**: compress and upload the raw volumes, turn them into disk
//!   images, build disks and an instance from them.
//! - **Replatform**: provision a fresh instance from an existing base image,
//!   then configure it remotely (mounts, groups, users, files, packages).
//!
//! Every phase boundary is a cancellation checkpoint and a published status
//! change. A failure or cancellation triggers compensation scoped to the last
//! committed phase, so a run never leaves half-built cloud resources behind.
//!
//! ## Module Organization
//!
//! - [`models`] - Migration process record, volumes, operations and handles
//! - [`state_machine`] - Coarse and internal status with a guarded phase machine
//! - [`orchestration`] - Orchestrator, uploads, compensation, replatform configuration
//! - [`provider`] - Cloud provider and object store capability traits
//! - [`capture`] - Source capture and compression seams
//! - [`remote`] - Remote shell capabilities and per-OS command strategies
//! - [`resilience`] - Bounded polling
//! - [`cancellation`] - Process-scoped cancellation tokens
//! - [`events`] - Status change publication
//! - [`config`] - Layered YAML/environment configuration
//! - [`error`] - Structured error handling
//! - [`logging`] - Structured logging setup and helpers
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use migrator_core::config::ConfigManager;
//! use migrator_core::models::MigrationProcess;
//! use migrator_core::orchestration::MigrationOrchestrator;
//! use migrator_core::provider::{ObjectStore, ProviderClient};
//! use std::sync::Arc;
//!
//! # async fn example(
//! #     provider: Arc<dyn ProviderClient>,
//! #     store: Arc<dyn ObjectStore>,
//! #     mut process: MigrationProcess,
//! # ) -> Result<(), Box<dyn std::error::Error>> {
//! migrator_core::logging::init_structured_logging();
//! let manager = ConfigManager::load()?;
//!
//! let orchestrator = MigrationOrchestrator::new(provider, store, manager.config().clone());
//! orchestrator.run(&mut process).await?;
//! println!("image: {:?}", process.outputs.image_id);
//! # Ok(())
//! # }
//! ```
//!
//! ## Testing
//!
//! Provider, storage, capture and remote access are traits, so the whole
//! pipeline runs against in-memory fakes:
//!
//! ```bash
//! cargo test --lib    # Unit tests
//! cargo test          # Unit and integration tests
//! ```

pub mod cancellation;
pub mod capture;
pub mod config;
pub mod constants;
pub mod error;
pub mod events;
pub mod logging;
pub mod models;
pub mod orchestration;
pub mod provider;
pub mod remote;
pub mod resilience;
pub mod state_machine;

pub use cancellation::CancellationRegistry;
pub use config::{ConfigManager, MigratorConfig};
pub use error::{MigrationError, Result};
pub use events::{BroadcastStatusPublisher, StatusChange, StatusListener};
pub use models::{MigrationKind, MigrationProcess, Volume};
pub use orchestration::MigrationOrchestrator;
pub use state_machine::{InternalStatus, MigrationStatus};
