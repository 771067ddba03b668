//! Centralized error handling for the channel streaming core.

pub mod types;

pub use types::*;