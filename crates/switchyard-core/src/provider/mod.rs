//! Provider types and sort-order planning

pub mod sort;
mod types;

pub use sort::{next_copy_key, plan_insert_after, SortUpdate};
pub use types::*;
