use thiserror::Error;

use crate::messaging::MessagingError;
use crate::store::StoreError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum VaultError {
    #[error("Vault key {vault_id} not found for tenant {tenant_id}")]
    KeyNotFound { tenant_id: String, vault_id: String },

    #[error("Vault key {vault_id} has been destroyed")]
    KeyDestroyed { vault_id: String },

    #[error("Invalid vault key id '{vault_id}'")]
    InvalidKeyId { vault_id: String },

    #[error("Invalid master key: {reason}")]
    InvalidMasterKey { reason: String },

    #[error("Corrupt key material for {vault_id}: {reason}")]
    CorruptKeyMaterial { vault_id: String, reason: String },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Messaging(#[from] MessagingError),
}

impl VaultError {
    pub fn key_not_found(tenant_id: impl Into<String>, vault_id: impl Into<String>) -> Self {
        Self::KeyNotFound {
            tenant_id: tenant_id.into(),
            vault_id: vault_id.into(),
        }
    }

    pub fn key_destroyed(vault_id: impl Into<String>) -> Self {
        Self::KeyDestroyed {
            vault_id: vault_id.into(),
        }
    }

    pub fn invalid_key_id(vault_id: impl Into<String>) -> Self {
        Self::InvalidKeyId {
            vault_id: vault_id.into(),
        }
    }

    pub fn invalid_master_key(reason: impl Into<String>) -> Self {
        Self::InvalidMasterKey {
            reason: reason.into(),
        }
    }

    pub fn corrupt_key_material(vault_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::CorruptKeyMaterial {
            vault_id: vault_id.into(),
            reason: reason.into(),
        }
    }
}

pub type VaultResult<T> = Result<T, VaultError>;
