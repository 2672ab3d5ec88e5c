//! Utility functions shared across the watcher crates.

pub mod formatting;

pub use formatting::{display_planck, truncate_id};
