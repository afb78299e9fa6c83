//! # Status Events
//!
//! Status changes are the only thing this core broadcasts. Delivery to a UI or
//! notification channel is the listener's concern.

pub mod publisher;

pub use publisher::{BroadcastStatusPublisher, StatusChange, StatusListener};
