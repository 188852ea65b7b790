//! Shared helpers that do not belong to a single subsystem.

pub mod canonical;

pub use canonical::{content_hash, to_canonical_string};
