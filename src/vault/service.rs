use base64::{engine::general_purpose, Engine as _};
use std::fmt;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use super::errors::{VaultError, VaultResult};
use crate::logging::log_vault_operation;
use crate::messaging::{AesGcmCipher, Cipher, Message};
use crate::models::{NewVaultRecord, VaultRecord};
use crate::store::VaultStore;

/// Plaintext key material plus the id it is stored under
#[derive(Clone, PartialEq, Eq)]
pub struct ManagedKey {
    pub vault_id: Uuid,
    pub key: Vec<u8>,
}

impl fmt::Debug for ManagedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagedKey")
            .field("vault_id", &self.vault_id)
            .field("key", &"<redacted>")
            .finish()
    }
}

pub struct VaultService {
    store: Arc<dyn VaultStore>,
    cipher: Arc<dyn Cipher>,
    master_key: Vec<u8>,
}

impl fmt::Debug for VaultService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VaultService").finish_non_exhaustive()
    }
}

impl VaultService {
    pub fn new(
        store: Arc<dyn VaultStore>,
        cipher: Arc<dyn Cipher>,
        master_key: Vec<u8>,
    ) -> VaultResult<Self> {
        if master_key.is_empty() {
            return Err(VaultError::invalid_master_key("master key is empty"));
        }
        Ok(Self {
            store,
            cipher,
            master_key,
        })
    }

    /// AES-256-GCM vault with a base64-encoded master key
    pub fn with_aes_gcm(store: Arc<dyn VaultStore>, master_key_b64: &str) -> VaultResult<Self> {
        let master_key = general_purpose::STANDARD
            .decode(master_key_b64)
            .map_err(|e| VaultError::invalid_master_key(e.to_string()))?;
        if master_key.len() != 32 {
            return Err(VaultError::invalid_master_key("master key must be 32 bytes"));
        }
        Self::new(store, Arc::new(AesGcmCipher::new()), master_key)
    }

    pub fn cipher(&self) -> &dyn Cipher {
        self.cipher.as_ref()
    }

    /// Generate and store a new 256-bit key for an entity
    pub async fn create_key(
        &self,
        tenant_id: &str,
        entity_id: &str,
        entity_type: Option<&str>,
    ) -> VaultResult<ManagedKey> {
        let key = AesGcmCipher::generate_key();
        let key_material = self
            .cipher
            .encrypt(&general_purpose::STANDARD.encode(&key), &self.master_key)?;

        let record = self
            .store
            .create_vault_record(NewVaultRecord {
                tenant_id: tenant_id.to_string(),
                entity_id: entity_id.to_string(),
                entity_type: entity_type.map(str::to_string),
                key_material,
            })
            .await?;

        let vault_id = record.id.to_string();
        log_vault_operation("create_key", tenant_id, Some(&vault_id), Some(entity_id), "created");

        Ok(ManagedKey {
            vault_id: record.id,
            key,
        })
    }

    /// Plaintext key for `vault_id`; missing or destroyed keys are errors
    pub async fn resolve_key(&self, tenant_id: &str, vault_id: &str) -> VaultResult<Vec<u8>> {
        let id = Uuid::parse_str(vault_id).map_err(|_| VaultError::invalid_key_id(vault_id))?;
        let record = self
            .store
            .find_vault_record(tenant_id, id)
            .await?
            .ok_or_else(|| VaultError::key_not_found(tenant_id, vault_id))?;

        self.unseal(&record)
    }

    /// Newest active key for an entity, creating one when none exists
    pub async fn key_for_entity(
        &self,
        tenant_id: &str,
        entity_id: &str,
        entity_type: Option<&str>,
    ) -> VaultResult<ManagedKey> {
        let records = self
            .store
            .find_vault_records_by_entity(tenant_id, entity_id, entity_type)
            .await?;

        match records.into_iter().rev().find(|record| !record.is_destroyed()) {
            Some(record) => Ok(ManagedKey {
                vault_id: record.id,
                key: self.unseal(&record)?,
            }),
            None => self.create_key(tenant_id, entity_id, entity_type).await,
        }
    }

    /// Soft-delete every key of an entity
    pub async fn destroy_entity_keys(
        &self,
        tenant_id: &str,
        entity_id: &str,
        entity_type: Option<&str>,
    ) -> VaultResult<u64> {
        let destroyed = self
            .store
            .destroy_vault_records_by_entity(tenant_id, entity_id, entity_type)
            .await?;

        log_vault_operation(
            "destroy_entity_keys",
            tenant_id,
            None,
            Some(entity_id),
            &format!("destroyed {destroyed}"),
        );
        Ok(destroyed)
    }

    /// Encrypt a message under the entity's managed key
    pub async fn encrypt_message(
        &self,
        message: &mut Message,
        entity_id: &str,
        entity_type: Option<&str>,
    ) -> VaultResult<Uuid> {
        let managed = self
            .key_for_entity(message.tenant_id(), entity_id, entity_type)
            .await?;
        let vault_id = managed.vault_id.to_string();
        message.encrypt(self.cipher.as_ref(), &vault_id, &managed.key)?;
        Ok(managed.vault_id)
    }

    /// Decrypt a message with the key named by its `vaultkeyid`; plaintext messages are left alone
    pub async fn decrypt_message(&self, message: &mut Message) -> VaultResult<()> {
        let Some(vault_id) = message.envelope().vault_key_id.clone() else {
            return Ok(());
        };
        let key = self.resolve_key(message.tenant_id(), &vault_id).await?;
        message.decrypt(self.cipher.as_ref(), &key)?;
        Ok(())
    }

    fn unseal(&self, record: &VaultRecord) -> VaultResult<Vec<u8>> {
        let vault_id = record.id.to_string();
        if record.is_destroyed() {
            warn!(vault_id = %vault_id, tenant_id = %record.tenant_id, "Attempt to use destroyed vault key");
            return Err(VaultError::key_destroyed(vault_id));
        }

        let encoded = self
            .cipher
            .decrypt(&record.key_material, &self.master_key)
            .map_err(|e| VaultError::corrupt_key_material(&vault_id, e.to_string()))?;
        general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| VaultError::corrupt_key_material(&vault_id, e.to_string()))
    }
}
