//! # Vault
//!
//! Managed, per-entity key material for envelope encryption. Keys are stored
//! encrypted with a master key and are destroyed by blanking them, which makes
//! every message encrypted under them unreadable.

pub mod errors;
pub mod service;

pub use errors::{VaultError, VaultResult};
pub use service::{ManagedKey, VaultService};
