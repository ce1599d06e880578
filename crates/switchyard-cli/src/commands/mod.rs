//! CLI command handlers
//!
//! Provider management, environment checks and settings each have their
//! own module.

pub mod config;
pub mod env;
pub mod provider;
