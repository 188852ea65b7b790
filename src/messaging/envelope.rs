//! # Message Envelope
//!
//! The versioned wire wrapper every message travels in. Top-level attribute
//! names are lowercase on the wire (`tenantid`, `specversion`,
//! `idempotencykey`, `vaultkeyid`); the tenant id is duplicated into
//! `data.tenantId` and `context.tenantId` so consumers can assert isolation at
//! whichever layer they inspect.
//!
//! ```json
//! {
//!   "id": "0190f1b6-...", "type": "com.acme.order.created", "time": "...",
//!   "source": "checkout", "specversion": "1.0", "tenantid": "t-1",
//!   "data": {"orderId": "o-9", "tenantId": "t-1"},
//!   "context": {"tenantId": "t-1"},
//!   "metadata": {"correlationId": "...", "traceId": "..."},
//!   "idempotencykey": "9f2c..."
//! }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::errors::{MessagingError, MessagingResult};
use crate::constants::ENVELOPE_SPEC_VERSION;
use crate::utils::canonical::hash_canonical;
use crate::validation::ValidationIssue;

/// Key under which the tenant id is stamped inside `data` and `context`
pub const TENANT_FIELD: &str = "tenantId";

const IDEMPOTENCY_KEY_FIELD: &str = "idempotencykey";

/// Correlation metadata carried alongside the payload
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvelopeMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvelopeContext {
    #[serde(rename = "tenantId")]
    pub tenant_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub id: String,
    #[serde(rename = "type")]
    pub message_type: String,
    pub time: DateTime<Utc>,
    pub source: String,
    pub specversion: String,
    #[serde(rename = "tenantid")]
    pub tenant_id: String,
    pub data: Value,
    pub context: EnvelopeContext,
    #[serde(default)]
    pub metadata: EnvelopeMetadata,
    #[serde(
        rename = "idempotencykey",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub idempotency_key: Option<String>,
    #[serde(rename = "vaultkeyid", default, skip_serializing_if = "Option::is_none")]
    pub vault_key_id: Option<String>,
}

impl Envelope {
    /// Create an unsealed envelope, stamping the tenant into all three locations
    ///
    /// `data` must be a JSON object (or null, treated as empty).
    pub fn new(
        message_type: impl Into<String>,
        tenant_id: impl Into<String>,
        source: impl Into<String>,
        data: Value,
        metadata: Option<EnvelopeMetadata>,
    ) -> MessagingResult<Self> {
        let message_type = message_type.into();
        let tenant_id = tenant_id.into();

        let mut payload = match data {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                return Err(MessagingError::invalid_payload(
                    message_type,
                    format!("payload must be a JSON object, got {}", json_kind(&other)),
                ))
            }
        };
        payload.insert(TENANT_FIELD.to_string(), Value::String(tenant_id.clone()));

        Ok(Self {
            id: Uuid::now_v7().to_string(),
            message_type,
            time: Utc::now(),
            source: source.into(),
            specversion: ENVELOPE_SPEC_VERSION.to_string(),
            tenant_id: tenant_id.clone(),
            data: Value::Object(payload),
            context: EnvelopeContext { tenant_id },
            metadata: metadata.unwrap_or_default(),
            idempotency_key: None,
            vault_key_id: None,
        })
    }

    /// Hash of the envelope with any existing idempotency key stripped
    pub fn compute_idempotency_key(&self) -> MessagingResult<String> {
        let mut value = serde_json::to_value(self)?;
        if let Value::Object(map) = &mut value {
            map.remove(IDEMPOTENCY_KEY_FIELD);
        }
        Ok(hash_canonical(&value))
    }

    /// Compute and store the idempotency key; a sealed envelope is left untouched
    pub fn seal(&mut self) -> MessagingResult<&str> {
        if self.idempotency_key.is_none() {
            self.idempotency_key = Some(self.compute_idempotency_key()?);
        }
        Ok(self.idempotency_key.as_deref().unwrap_or_default())
    }

    pub fn is_sealed(&self) -> bool {
        self.idempotency_key.is_some()
    }

    /// True iff the envelope is sealed and unchanged since sealing
    pub fn verify(&self) -> bool {
        match &self.idempotency_key {
            Some(sealed) => self
                .compute_idempotency_key()
                .map(|current| &current == sealed)
                .unwrap_or(false),
            None => false,
        }
    }

    /// Link this envelope to the message that caused it
    ///
    /// `correlationId` always names the immediate parent; `traceId` is inherited
    /// from the parent when present, otherwise the parent becomes the trace root.
    pub fn correlate_with(&mut self, origin: &Envelope) -> &mut Self {
        self.metadata.correlation_id = Some(origin.id.clone());
        self.metadata.trace_id = Some(
            origin
                .metadata
                .trace_id
                .clone()
                .unwrap_or_else(|| origin.id.clone()),
        );
        self
    }

    pub fn is_encrypted(&self) -> bool {
        self.vault_key_id.is_some()
    }

    /// Tenant recorded inside `data`, if any
    pub fn data_tenant_id(&self) -> Option<&str> {
        self.data.get(TENANT_FIELD).and_then(Value::as_str)
    }

    /// Report every location whose tenant id disagrees with the top-level one
    pub fn tenant_isolation_issues(&self) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();

        match self.data_tenant_id() {
            Some(tenant) if tenant == self.tenant_id => {}
            Some(tenant) => issues.push(ValidationIssue::new(
                "/data/tenantId",
                format!("tenant {tenant} does not match envelope tenant {}", self.tenant_id),
            )),
            None => issues.push(ValidationIssue::new("/data/tenantId", "tenant id is missing")),
        }

        if self.context.tenant_id != self.tenant_id {
            issues.push(ValidationIssue::new(
                "/context/tenantId",
                format!(
                    "tenant {} does not match envelope tenant {}",
                    self.context.tenant_id, self.tenant_id
                ),
            ));
        }

        issues
    }

    pub fn to_json(&self) -> MessagingResult<Value> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn from_json(json: Value) -> MessagingResult<Self> {
        serde_json::from_value(json).map_err(|e| MessagingError::message_deserialization(e.to_string()))
    }
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn order_created() -> Envelope {
        Envelope::new(
            "com.acme.order.created",
            "tenant-1",
            "checkout",
            json!({"orderId": "o-1", "total": 42}),
            None,
        )
        .unwrap()
    }

    #[test]
    fn test_new_stamps_tenant_everywhere() {
        let envelope = order_created();

        assert_eq!(envelope.tenant_id, "tenant-1");
        assert_eq!(envelope.data_tenant_id(), Some("tenant-1"));
        assert_eq!(envelope.context.tenant_id, "tenant-1");
        assert_eq!(envelope.specversion, "1.0");
        assert!(!envelope.is_sealed());
        assert!(envelope.tenant_isolation_issues().is_empty());
    }

    #[test]
    fn test_non_object_payload_is_rejected() {
        let result = Envelope::new("com.acme.x", "t", "s", json!([1, 2]), None);
        assert!(matches!(result, Err(MessagingError::InvalidPayload { .. })));
    }

    #[test]
    fn test_wire_shape_uses_lowercase_attributes() {
        let mut envelope = order_created();
        envelope.seal().unwrap();

        let wire = envelope.to_json().unwrap();
        assert_eq!(wire["type"], "com.acme.order.created");
        assert_eq!(wire["tenantid"], "tenant-1");
        assert_eq!(wire["context"]["tenantId"], "tenant-1");
        assert!(wire["idempotencykey"].is_string());
        assert!(wire.get("vaultkeyid").is_none());
        assert!(wire["metadata"].get("correlationId").is_none());
    }

    #[test]
    fn test_seal_is_idempotent() {
        let mut envelope = order_created();
        let first = envelope.seal().unwrap().to_string();

        envelope.source = "changed-after-seal".to_string();
        let second = envelope.seal().unwrap().to_string();

        assert_eq!(first, second);
    }

    #[test]
    fn test_verify_detects_post_seal_mutation() {
        let mut envelope = order_created();
        assert!(!envelope.verify());

        envelope.seal().unwrap();
        assert!(envelope.verify());

        let mut tampered = envelope.clone();
        tampered.data["total"] = json!(43);
        assert!(!tampered.verify());

        let mut relinked = envelope.clone();
        relinked.metadata.correlation_id = Some("someone-else".to_string());
        assert!(!relinked.verify());
    }

    #[test]
    fn test_sealed_envelope_survives_wire_round_trip() {
        let mut envelope = order_created();
        envelope.seal().unwrap();

        let text = serde_json::to_string(&envelope).unwrap();
        let parsed: Envelope = serde_json::from_str(&text).unwrap();
        assert!(parsed.verify());
    }

    #[test]
    fn test_correlation_chain_keeps_trace_root() {
        let a = order_created();
        let mut b = order_created();
        b.correlate_with(&a);
        let mut c = order_created();
        c.correlate_with(&b);

        assert_eq!(b.metadata.correlation_id.as_deref(), Some(a.id.as_str()));
        assert_eq!(b.metadata.trace_id.as_deref(), Some(a.id.as_str()));
        assert_eq!(c.metadata.correlation_id.as_deref(), Some(b.id.as_str()));
        assert_eq!(c.metadata.trace_id.as_deref(), Some(a.id.as_str()));
    }

    #[test]
    fn test_tenant_mismatch_is_reported() {
        let mut envelope = order_created();
        envelope.data["tenantId"] = json!("tenant-2");
        envelope.context.tenant_id = "tenant-3".to_string();

        let issues = envelope.tenant_isolation_issues();
        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].path, "/data/tenantId");
        assert_eq!(issues[1].path, "/context/tenantId");
    }
}
