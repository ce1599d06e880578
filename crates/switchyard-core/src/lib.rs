//! Switchyard Core - Provider registry and switch coordinator
//!
//! This crate stores provider profiles per CLI tool, keeps one of them
//! current per tool, writes the current one into the tool's live config,
//! and watches the environment for variables that would override it.

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic)]

pub mod app;
pub mod conflict;
pub mod error;
pub mod live;
pub mod provider;
pub mod proxy;
pub mod settings;
pub mod storage;
pub mod switch;

pub use app::{AppId, AppToggles};
pub use error::{ProviderError, ProviderResult};
pub use provider::{Provider, ProviderList, SortUpdate, SwitchEvent};
pub use proxy::{ProxyStatus, ProxyTakeoverObserver};
pub use switch::SwitchCoordinator;
