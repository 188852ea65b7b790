//! # Message Definitions
//!
//! Static, per-type description of a message: its category, content type,
//! version, optional JSON Schema and optional encryption policy. Definitions
//! are built once at process start and shared behind `Arc`.

use jsonschema::{Draft, JSONSchema};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use super::errors::{MessagingError, MessagingResult};
use crate::constants::DEFAULT_CONTENT_TYPE;
use crate::validation::ValidationIssue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageCategory {
    Command,
    Event,
    Query,
    Task,
}

impl fmt::Display for MessageCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Command => "command",
            Self::Event => "event",
            Self::Query => "query",
            Self::Task => "task",
        };
        f.write_str(name)
    }
}

/// Declared JSON type of an individually encrypted field
///
/// Non-string fields are serialized to JSON text before encryption and parsed
/// back after decryption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
    Boolean,
    Object,
    Array,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldEncryption {
    #[serde(rename = "type")]
    pub field_type: FieldType,
}

impl FieldEncryption {
    pub fn new(field_type: FieldType) -> Self {
        Self { field_type }
    }
}

/// Which part of a payload is encrypted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncryptionPolicy {
    /// The whole payload is serialized and encrypted as one blob
    Payload,
    /// Only the named fields are encrypted, each on its own
    Fields(BTreeMap<String, FieldEncryption>),
}

impl EncryptionPolicy {
    pub fn fields<I, K>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, FieldType)>,
        K: Into<String>,
    {
        Self::Fields(
            fields
                .into_iter()
                .map(|(name, field_type)| (name.into(), FieldEncryption::new(field_type)))
                .collect(),
        )
    }
}

pub struct MessageDefinition {
    pub category: MessageCategory,
    pub content_type: String,
    pub message_type: String,
    pub version: String,
    schema: Option<Arc<JSONSchema>>,
    encryption: Option<EncryptionPolicy>,
}

impl fmt::Debug for MessageDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageDefinition")
            .field("category", &self.category)
            .field("content_type", &self.content_type)
            .field("message_type", &self.message_type)
            .field("version", &self.version)
            .field("has_schema", &self.schema.is_some())
            .field("encryption", &self.encryption)
            .finish()
    }
}

impl MessageDefinition {
    pub fn new(
        category: MessageCategory,
        message_type: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            category,
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
            message_type: message_type.into(),
            version: version.into(),
            schema: None,
            encryption: None,
        }
    }

    pub fn command(message_type: impl Into<String>, version: impl Into<String>) -> Self {
        Self::new(MessageCategory::Command, message_type, version)
    }

    pub fn event(message_type: impl Into<String>, version: impl Into<String>) -> Self {
        Self::new(MessageCategory::Event, message_type, version)
    }

    pub fn query(message_type: impl Into<String>, version: impl Into<String>) -> Self {
        Self::new(MessageCategory::Query, message_type, version)
    }

    pub fn task(message_type: impl Into<String>, version: impl Into<String>) -> Self {
        Self::new(MessageCategory::Task, message_type, version)
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    /// Attach a draft-07 JSON Schema for the payload
    pub fn with_schema(mut self, schema: Value) -> MessagingResult<Self> {
        let compiled = JSONSchema::options()
            .with_draft(Draft::Draft7)
            .compile(&schema)
            .map_err(|e| MessagingError::invalid_schema(&self.message_type, e.to_string()))?;
        self.schema = Some(Arc::new(compiled));
        Ok(self)
    }

    pub fn with_encryption(mut self, policy: EncryptionPolicy) -> Self {
        self.encryption = Some(policy);
        self
    }

    pub fn encryption(&self) -> Option<&EncryptionPolicy> {
        self.encryption.as_ref()
    }

    pub fn has_schema(&self) -> bool {
        self.schema.is_some()
    }

    /// Check a payload against the schema; every violation is reported
    pub fn validate_data(&self, data: &Value) -> Vec<ValidationIssue> {
        let Some(schema) = &self.schema else {
            return Vec::new();
        };

        match schema.validate(data) {
            Ok(()) => Vec::new(),
            Err(errors) => errors
                .map(|e| ValidationIssue::new(e.instance_path.to_string(), e.to_string()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn user_created() -> MessageDefinition {
        MessageDefinition::event("com.acme.user.created", "1.0.0")
            .with_schema(json!({
                "type": "object",
                "required": ["email"],
                "properties": {
                    "email": {"type": "string"},
                    "age": {"type": "integer", "minimum": 0}
                }
            }))
            .unwrap()
    }

    #[test]
    fn test_schema_violations_carry_instance_path() {
        let definition = user_created();

        assert!(definition.validate_data(&json!({"email": "a@b.c"})).is_empty());

        let issues = definition.validate_data(&json!({"email": "a@b.c", "age": -1}));
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].path, "/age");
    }

    #[test]
    fn test_invalid_schema_is_rejected() {
        let result = MessageDefinition::command("com.acme.broken", "1")
            .with_schema(json!({"type": "not-a-type"}));
        assert!(matches!(result, Err(MessagingError::InvalidSchema { .. })));
    }

    #[test]
    fn test_definition_without_schema_accepts_anything() {
        let definition = MessageDefinition::task("com.acme.report.build", "1");
        assert_eq!(definition.content_type, "application/json");
        assert!(definition.validate_data(&json!([1, "two"])).is_empty());
    }

    #[test]
    fn test_field_policy_builder() {
        let policy = EncryptionPolicy::fields([("ssn", FieldType::String), ("dob", FieldType::Object)]);
        match policy {
            EncryptionPolicy::Fields(fields) => {
                assert_eq!(fields.len(), 2);
                assert_eq!(fields["dob"].field_type, FieldType::Object);
            }
            EncryptionPolicy::Payload => panic!("expected field policy"),
        }
    }
}
