//! # Cancellation Registry
//!
//! Process-scoped cooperative cancellation. The control plane flags a process
//! by id; the orchestrator holds the matching [`CancellationToken`] and checks
//! it at every phase boundary.

use dashmap::DashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Id-keyed registry of cancellation tokens, shared between the control plane and runs
#[derive(Debug, Clone, Default)]
pub struct CancellationRegistry {
    tokens: Arc<DashMap<String, CancellationToken>>,
}

impl CancellationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Token for a process, created on first use
    ///
    /// A cancellation requested before the run registers is kept and observed
    /// at the first checkpoint.
    pub fn token_for(&self, process_id: &str) -> CancellationToken {
        self.tokens
            .entry(process_id.to_string())
            .or_default()
            .clone()
    }

    /// Flag a process as cancelled; returns `false` if it was already flagged
    ///
    /// An id with no run yet gets an entry so the run observes the request
    /// when it starts. A run removes its entry when it finishes; for an id
    /// that will never run, the caller must [`remove`](Self::remove) it.
    pub fn cancel(&self, process_id: &str) -> bool {
        let token = self.token_for(process_id);
        if token.is_cancelled() {
            return false;
        }
        info!(process_id = %process_id, "🛑 Cancellation requested");
        token.cancel();
        true
    }

    pub fn is_cancelled(&self, process_id: &str) -> bool {
        self.tokens
            .get(process_id)
            .map(|token| token.is_cancelled())
            .unwrap_or(false)
    }

    /// Forget a process, finished or abandoned before it ran
    pub fn remove(&self, process_id: &str) {
        self.tokens.remove(process_id);
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}
