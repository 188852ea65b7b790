//! # Relational Store
//!
//! Durable storage for tracked jobs, their lifecycle events and vault
//! records. [`PgStore`] is the production implementation; [`InMemoryStore`]
//! backs tests and local runs.

pub mod errors;
pub mod in_memory;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod traits;

pub use errors::{StoreError, StoreResult};
pub use in_memory::InMemoryStore;
#[cfg(feature = "postgres")]
pub use postgres::{PgStore, SCHEMA_STATEMENTS};
pub use traits::{TrackedJobStore, VaultStore};
