//! Shared fixtures for integration tests.

#![allow(dead_code)]

pub mod builders;
pub mod strategies;

pub use builders::*;
pub use strategies::*;

use std::sync::Arc;

use dmq_core::broker::InMemoryBroker;
use dmq_core::store::InMemoryStore;

/// In-memory broker and store wired together the way a process would
pub struct TestHarness {
    pub broker: Arc<InMemoryBroker>,
    pub store: Arc<InMemoryStore>,
}

impl TestHarness {
    pub fn new() -> Self {
        Self {
            broker: Arc::new(InMemoryBroker::new()),
            store: Arc::new(InMemoryStore::new()),
        }
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Unique name for tests that share a backend
pub fn unique_name(prefix: &str) -> String {
    format!("{prefix}_{}", uuid::Uuid::new_v4().simple())
}
