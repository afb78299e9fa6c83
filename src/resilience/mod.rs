//! # Resilience Module
//!
//! Bounded polling for long-running provider operations. Provider waits never
//! run open-ended: each one is capped by a [`PollPolicy`] and reports a
//! timeout distinct from provider failures.

pub mod poller;

pub use poller::{poll_until, PollClock, PollOutcome, PollPolicy};
