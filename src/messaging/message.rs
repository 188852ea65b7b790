//! # Message Builder
//!
//! A [`Message`] pairs an [`Envelope`] with the [`MessageDefinition`] it was
//! built from. The definition supplies the schema used by
//! [`Message::validate`] and the encryption policy used by
//! [`Message::encrypt`] / [`Message::decrypt`].
//!
//! Encryption rewrites `data`, so a message that is going to be encrypted
//! should be encrypted before it is sealed.

use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::debug;

use super::definition::{EncryptionPolicy, FieldType, MessageDefinition};
use super::encryption::Cipher;
use super::envelope::{Envelope, EnvelopeMetadata, TENANT_FIELD};
use super::errors::{MessagingError, MessagingResult};
use crate::validation::{validate_payload_limits, ValidationIssue, ValidationReport};

const CIPHERTEXT_FIELD: &str = "ciphertext";

/// Opt-in steps performed by [`Message::build_with`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildOptions {
    /// Fail fast on the first validation issue
    pub validate: bool,
    pub seal: bool,
}

impl BuildOptions {
    pub fn sealed() -> Self {
        Self {
            validate: false,
            seal: true,
        }
    }

    pub fn validated_and_sealed() -> Self {
        Self {
            validate: true,
            seal: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Message {
    definition: Arc<MessageDefinition>,
    envelope: Envelope,
}

impl Message {
    /// Build an unsealed, unvalidated message for `tenant_id`
    pub fn build(
        definition: Arc<MessageDefinition>,
        tenant_id: impl Into<String>,
        source: impl Into<String>,
        data: Value,
        metadata: Option<EnvelopeMetadata>,
    ) -> MessagingResult<Self> {
        let envelope = Envelope::new(
            definition.message_type.clone(),
            tenant_id,
            source,
            data,
            metadata,
        )?;
        Ok(Self {
            definition,
            envelope,
        })
    }

    pub fn build_with(
        definition: Arc<MessageDefinition>,
        tenant_id: impl Into<String>,
        source: impl Into<String>,
        data: Value,
        metadata: Option<EnvelopeMetadata>,
        options: BuildOptions,
    ) -> MessagingResult<Self> {
        let mut message = Self::build(definition, tenant_id, source, data, metadata)?;
        if options.validate {
            message.validate_strict()?;
        }
        if options.seal {
            message.seal()?;
        }
        Ok(message)
    }

    /// Rehydrate an inbound envelope against its definition
    pub fn from_envelope(
        definition: Arc<MessageDefinition>,
        envelope: Envelope,
    ) -> MessagingResult<Self> {
        if envelope.message_type != definition.message_type {
            return Err(MessagingError::type_mismatch(
                &definition.message_type,
                &envelope.message_type,
            ));
        }
        Ok(Self {
            definition,
            envelope,
        })
    }

    pub fn definition(&self) -> &MessageDefinition {
        &self.definition
    }

    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    pub fn into_envelope(self) -> Envelope {
        self.envelope
    }

    pub fn id(&self) -> &str {
        &self.envelope.id
    }

    pub fn message_type(&self) -> &str {
        &self.envelope.message_type
    }

    pub fn tenant_id(&self) -> &str {
        &self.envelope.tenant_id
    }

    pub fn data(&self) -> &Value {
        &self.envelope.data
    }

    pub fn seal(&mut self) -> MessagingResult<&mut Self> {
        self.envelope.seal()?;
        Ok(self)
    }

    pub fn verify(&self) -> bool {
        self.envelope.verify()
    }

    pub fn correlate_with(&mut self, origin: &Envelope) -> &mut Self {
        self.envelope.correlate_with(origin);
        self
    }

    pub fn is_encrypted(&self) -> bool {
        self.envelope.is_encrypted()
    }

    /// Validate payload limits, schema and tenant isolation
    ///
    /// Every issue found is reported; the report is valid iff none were found.
    pub fn validate(&self) -> ValidationReport {
        let mut issues = Vec::new();

        if self.is_encrypted() {
            issues.push(ValidationIssue::new(
                "/data",
                "payload is encrypted and cannot be validated",
            ));
        } else {
            match validate_payload_limits(&self.envelope.data) {
                Ok(()) => issues.extend(self.definition.validate_data(&self.envelope.data)),
                Err(issue) => issues.push(issue),
            }
        }

        issues.extend(self.envelope.tenant_isolation_issues());
        ValidationReport::from_issues(issues)
    }

    /// Fail with the first violation's path and message
    pub fn validate_strict(&self) -> MessagingResult<()> {
        let report = self.validate();
        match report.errors.into_iter().next() {
            None => Ok(()),
            Some(issue) => Err(MessagingError::validation_failed(issue.path, issue.message)),
        }
    }

    /// Encrypt according to the definition's policy; no-op when already encrypted
    pub fn encrypt(
        &mut self,
        cipher: &dyn Cipher,
        vault_key_id: &str,
        secret_key: &[u8],
    ) -> MessagingResult<&mut Self> {
        if self.is_encrypted() {
            return Ok(self);
        }

        let policy = self.require_policy()?;
        self.require_key(secret_key)?;
        if vault_key_id.is_empty() {
            return Err(MessagingError::missing_key_material(
                &self.envelope.message_type,
                "vault key id is empty",
            ));
        }

        let data = match policy {
            EncryptionPolicy::Payload => {
                let plaintext = serde_json::to_string(&self.envelope.data)?;
                let mut sealed = Map::new();
                sealed.insert(
                    TENANT_FIELD.to_string(),
                    Value::String(self.envelope.tenant_id.clone()),
                );
                sealed.insert(
                    CIPHERTEXT_FIELD.to_string(),
                    Value::String(cipher.encrypt(&plaintext, secret_key)?),
                );
                Value::Object(sealed)
            }
            EncryptionPolicy::Fields(fields) => {
                let mut data = self.payload_object()?.clone();
                for name in fields.keys() {
                    let Some(value) = data.get_mut(name) else {
                        continue;
                    };
                    if value.is_null() {
                        continue;
                    }
                    let plaintext = match &*value {
                        Value::String(s) => s.clone(),
                        other => serde_json::to_string(other)?,
                    };
                    *value = Value::String(cipher.encrypt(&plaintext, secret_key)?);
                }
                Value::Object(data)
            }
        };

        self.envelope.data = data;
        self.envelope.vault_key_id = Some(vault_key_id.to_string());
        debug!(
            message_id = %self.envelope.id,
            message_type = %self.envelope.message_type,
            vault_key_id = %vault_key_id,
            "Encrypted message payload"
        );
        Ok(self)
    }

    /// Reverse [`Message::encrypt`]; no-op when already plaintext
    pub fn decrypt(&mut self, cipher: &dyn Cipher, secret_key: &[u8]) -> MessagingResult<&mut Self> {
        if !self.is_encrypted() {
            return Ok(self);
        }

        let policy = self.require_policy()?;
        self.require_key(secret_key)?;

        let data = match policy {
            EncryptionPolicy::Payload => {
                let ciphertext = self
                    .envelope
                    .data
                    .get(CIPHERTEXT_FIELD)
                    .and_then(Value::as_str)
                    .ok_or_else(|| MessagingError::decryption("encrypted payload has no ciphertext"))?;
                let plaintext = cipher.decrypt(ciphertext, secret_key)?;
                serde_json::from_str(&plaintext)
                    .map_err(|e| MessagingError::decryption(format!("payload is not JSON: {e}")))?
            }
            EncryptionPolicy::Fields(fields) => {
                let mut data = self.payload_object()?.clone();
                for (name, field) in &fields {
                    let Some(value) = data.get_mut(name) else {
                        continue;
                    };
                    let Value::String(ciphertext) = &*value else {
                        continue;
                    };
                    let plaintext = cipher.decrypt(ciphertext, secret_key)?;
                    *value = match field.field_type {
                        FieldType::String => Value::String(plaintext),
                        _ => serde_json::from_str(&plaintext).map_err(|e| {
                            MessagingError::decryption(format!("field {name} is not JSON: {e}"))
                        })?,
                    };
                }
                Value::Object(data)
            }
        };

        self.envelope.data = data;
        self.envelope.vault_key_id = None;
        Ok(self)
    }

    fn require_policy(&self) -> MessagingResult<EncryptionPolicy> {
        self.definition
            .encryption()
            .cloned()
            .ok_or_else(|| MessagingError::missing_encryption_policy(&self.envelope.message_type))
    }

    fn require_key(&self, secret_key: &[u8]) -> MessagingResult<()> {
        if secret_key.is_empty() {
            return Err(MessagingError::missing_key_material(
                &self.envelope.message_type,
                "secret key is empty",
            ));
        }
        Ok(())
    }

    fn payload_object(&self) -> MessagingResult<&Map<String, Value>> {
        self.envelope.data.as_object().ok_or_else(|| {
            MessagingError::invalid_payload(&self.envelope.message_type, "payload is not an object")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::definition::FieldType;
    use crate::messaging::encryption::AesGcmCipher;
    use serde_json::json;

    fn user_created(policy: Option<EncryptionPolicy>) -> Arc<MessageDefinition> {
        let definition = MessageDefinition::event("com.acme.user.created", "1.0.0")
            .with_schema(json!({
                "type": "object",
                "required": ["email"],
                "properties": {"email": {"type": "string"}}
            }))
            .unwrap();
        Arc::new(match policy {
            Some(policy) => definition.with_encryption(policy),
            None => definition,
        })
    }

    fn build(definition: Arc<MessageDefinition>, data: Value) -> Message {
        Message::build(definition, "tenant-1", "signup", data, None).unwrap()
    }

    #[test]
    fn test_build_does_not_seal_unless_asked() {
        let message = build(user_created(None), json!({"email": "a@b.c"}));
        assert!(!message.envelope().is_sealed());

        let sealed = Message::build_with(
            user_created(None),
            "tenant-1",
            "signup",
            json!({"email": "a@b.c"}),
            None,
            BuildOptions::sealed(),
        )
        .unwrap();
        assert!(sealed.verify());
    }

    #[test]
    fn test_validate_collects_schema_and_tenant_issues() {
        let mut message = build(user_created(None), json!({"name": "no email"}));
        message.envelope.context.tenant_id = "tenant-2".to_string();

        let report = message.validate();
        assert!(!report.is_valid);
        assert_eq!(report.errors.len(), 2);
        assert_eq!(report.errors[1].path, "/context/tenantId");
    }

    #[test]
    fn test_validate_strict_returns_first_violation() {
        let message = build(user_created(None), json!({"name": "no email"}));
        let err = message.validate_strict().unwrap_err();
        assert!(matches!(err, MessagingError::ValidationFailed { .. }));

        let strict = Message::build_with(
            user_created(None),
            "tenant-1",
            "signup",
            json!({}),
            None,
            BuildOptions::validated_and_sealed(),
        );
        assert!(strict.is_err());
    }

    #[test]
    fn test_payload_encryption_round_trip() {
        let cipher = AesGcmCipher::new();
        let key = AesGcmCipher::generate_key();
        let mut message = build(
            user_created(Some(EncryptionPolicy::Payload)),
            json!({"email": "a@b.c", "age": 30}),
        );
        let original = message.data().clone();

        message.encrypt(&cipher, "vault-1", &key).unwrap();
        assert!(message.is_encrypted());
        assert_eq!(message.data()["tenantId"], "tenant-1");
        assert!(message.data()["ciphertext"].is_string());
        assert!(message.data().get("email").is_none());

        let ciphertext = message.data().clone();
        message.encrypt(&cipher, "vault-1", &key).unwrap();
        assert_eq!(message.data(), &ciphertext);

        message.decrypt(&cipher, &key).unwrap();
        assert!(!message.is_encrypted());
        assert_eq!(message.data(), &original);
    }

    #[test]
    fn test_field_encryption_preserves_types() {
        let cipher = AesGcmCipher::new();
        let key = AesGcmCipher::generate_key();
        let policy = EncryptionPolicy::fields([
            ("email", FieldType::String),
            ("address", FieldType::Object),
            ("age", FieldType::Number),
        ]);
        let mut message = build(
            user_created(Some(policy)),
            json!({"email": "a@b.c", "address": {"city": "Oslo"}, "age": 30, "plan": "pro"}),
        );

        message.encrypt(&cipher, "vault-1", &key).unwrap();
        assert_eq!(message.data()["plan"], "pro");
        assert_ne!(message.data()["email"], "a@b.c");
        assert!(message.data()["address"].is_string());
        assert_eq!(message.envelope().vault_key_id.as_deref(), Some("vault-1"));

        message.decrypt(&cipher, &key).unwrap();
        assert_eq!(message.data()["email"], "a@b.c");
        assert_eq!(message.data()["address"], json!({"city": "Oslo"}));
        assert_eq!(message.data()["age"], 30);
    }

    #[test]
    fn test_field_encryption_skips_absent_and_null_fields() {
        let cipher = AesGcmCipher::new();
        let key = AesGcmCipher::generate_key();
        let policy = EncryptionPolicy::fields([
            ("email", FieldType::String),
            ("phone", FieldType::String),
            ("score", FieldType::Number),
        ]);
        let mut message = build(
            user_created(Some(policy)),
            json!({"email": "a@b.c", "score": null}),
        );

        message.encrypt(&cipher, "vault-1", &key).unwrap();
        assert!(message.data().get("phone").is_none());
        assert!(message.data()["score"].is_null());

        message.decrypt(&cipher, &key).unwrap();
        assert_eq!(message.data()["email"], "a@b.c");
        assert!(message.data()["score"].is_null());
    }

    #[test]
    fn test_missing_policy_or_key_is_a_hard_failure() {
        let cipher = AesGcmCipher::new();
        let mut plain = build(user_created(None), json!({"email": "a@b.c"}));
        assert!(matches!(
            plain.encrypt(&cipher, "vault-1", &AesGcmCipher::generate_key()),
            Err(MessagingError::MissingEncryptionPolicy { .. })
        ));

        let mut protected = build(
            user_created(Some(EncryptionPolicy::Payload)),
            json!({"email": "a@b.c"}),
        );
        assert!(matches!(
            protected.encrypt(&cipher, "vault-1", &[]),
            Err(MessagingError::MissingKeyMaterial { .. })
        ));
        assert!(!protected.is_encrypted());
    }

    #[test]
    fn test_encrypted_payload_is_not_schema_validated() {
        let cipher = AesGcmCipher::new();
        let key = AesGcmCipher::generate_key();
        let mut message = build(
            user_created(Some(EncryptionPolicy::Payload)),
            json!({"email": "a@b.c"}),
        );
        message.encrypt(&cipher, "vault-1", &key).unwrap();

        let report = message.validate();
        assert!(!report.is_valid);
        assert_eq!(report.first_error().unwrap().path, "/data");
    }

    #[test]
    fn test_from_envelope_checks_type() {
        let message = build(user_created(None), json!({"email": "a@b.c"}));
        let envelope = message.into_envelope();

        let other = Arc::new(MessageDefinition::command("com.acme.user.delete", "1"));
        assert!(matches!(
            Message::from_envelope(other, envelope.clone()),
            Err(MessagingError::TypeMismatch { .. })
        ));
        assert!(Message::from_envelope(user_created(None), envelope).is_ok());
    }
}
