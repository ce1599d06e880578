//! Environment conflict detection
//!
//! Finds environment variables that would silently override the provider
//! switchyard writes into a tool's live config, and keeps the deduplicated
//! list shown to the user.

mod banner;
mod detect;
mod monitor;

pub use banner::{ConflictBanner, Dismissal};
pub use detect::{
    ConflictDetector, ConflictKey, EnvConflict, EnvSource, ProcessEnv, SourceType, StaticEnv,
    PROCESS_SOURCE,
};
pub use monitor::ConflictMonitor;
