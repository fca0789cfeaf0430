//! Shared types and helpers

pub mod helpers;
pub mod types;
