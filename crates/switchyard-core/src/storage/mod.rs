//! Storage layer (`SQLite`)

pub mod db;
pub mod migrations;
pub mod providers;

pub use db::{Database, DatabaseError};
pub use providers::ProfileStore;
