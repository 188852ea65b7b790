//! # Vault Record Model
//!
//! Managed key material for one entity, encrypted at rest. Maps to
//! `dmq_vault_records`:
//!
//! ```sql
//! CREATE TABLE dmq_vault_records (
//!   id UUID PRIMARY KEY,
//!   tenant_id TEXT NOT NULL,
//!   entity_id TEXT NOT NULL,
//!   entity_type TEXT,
//!   key_material TEXT NOT NULL,
//!   state TEXT NOT NULL DEFAULT 'active',
//!   created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
//!   updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
//! );
//! CREATE INDEX idx_dmq_vault_records_entity ON dmq_vault_records (tenant_id, entity_id);
//! ```
//!
//! Destroying a record blanks `key_material` and flips `state`; rows are never
//! hard-deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

pub const VAULT_STATE_ACTIVE: &str = "active";
pub const VAULT_STATE_DESTROYED: &str = "destroyed";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct VaultRecord {
    /// Doubles as the vault key id stamped on encrypted envelopes
    pub id: Uuid,
    pub tenant_id: String,
    pub entity_id: String,
    pub entity_type: Option<String>,
    #[serde(skip_serializing, default)]
    pub key_material: String,
    pub state: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl VaultRecord {
    pub fn is_destroyed(&self) -> bool {
        self.state == VAULT_STATE_DESTROYED || self.key_material.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewVaultRecord {
    pub tenant_id: String,
    pub entity_id: String,
    pub entity_type: Option<String>,
    /// Key material already encrypted with the vault master key
    pub key_material: String,
}
