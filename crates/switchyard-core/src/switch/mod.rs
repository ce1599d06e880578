//! Switching the current provider of an app
//!
//! All mutations of one app are serialized and run to completion even if the
//! caller stops waiting for them.

mod coordinator;

pub use coordinator::{SwitchCoordinator, EVENT_CHANNEL_CAPACITY};
