//! # Status Publisher
//!
//! ```rust
//! use migrator_core::events::{BroadcastStatusPublisher, StatusChange, StatusListener};
//! use migrator_core::state_machine::{InternalStatus, MigrationStatus};
//!
//! # tokio_test::block_on(async {
//! let publisher = BroadcastStatusPublisher::default();
//! let mut changes = publisher.subscribe();
//!
//! publisher
//!     .on_status_change(StatusChange {
//!         event_id: uuid::Uuid::new_v4(),
//!         process_id: "P-1".to_string(),
//!         status: MigrationStatus::InProgress,
//!         internal_status: InternalStatus::Compressing,
//!         error_kind: None,
//!         published_at: chrono::Utc::now(),
//!     })
//!     .await;
//!
//! let change = changes.recv().await.unwrap();
//! assert_eq!(change.internal_status, InternalStatus::Compressing);
//! # });
//! ```

use crate::state_machine::{InternalStatus, MigrationStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Published after every committed phase transition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusChange {
    /// Unique per published change, for deduplication by listeners
    pub event_id: Uuid,
    pub process_id: String,
    pub status: MigrationStatus,
    pub internal_status: InternalStatus,
    /// Error classification for `Failed`/`Cancelled` transitions
    pub error_kind: Option<String>,
    pub published_at: DateTime<Utc>,
}

/// External listener (UI channel, audit log, ...) notified of status changes
///
/// Delivery is fire-and-forget: the orchestrator does not wait on or react
/// to the listener's success.
#[async_trait]
pub trait StatusListener: Send + Sync {
    async fn on_status_change(&self, change: StatusChange);
}

/// Broadcast-channel listener; any number of subscribers may observe changes
#[derive(Debug, Clone)]
pub struct BroadcastStatusPublisher {
    sender: broadcast::Sender<StatusChange>,
}

impl BroadcastStatusPublisher {
    /// Create a new publisher with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to status changes
    pub fn subscribe(&self) -> broadcast::Receiver<StatusChange> {
        self.sender.subscribe()
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for BroadcastStatusPublisher {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl StatusListener for BroadcastStatusPublisher {
    async fn on_status_change(&self, change: StatusChange) {
        // No subscribers is fine: changes are published even if no one is listening
        let _ = self.sender.send(change);
    }
}
