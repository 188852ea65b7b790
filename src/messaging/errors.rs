//! # Messaging Error Types
//!
//! Errors raised while building, validating, sealing and encrypting message
//! envelopes.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MessagingError {
    #[error("Message serialization error: {message}")]
    MessageSerialization { message: String },

    #[error("Message deserialization error: {message}")]
    MessageDeserialization { message: String },

    #[error("Invalid payload for {message_type}: {reason}")]
    InvalidPayload {
        message_type: String,
        reason: String,
    },

    #[error("Validation failed at {path}: {message}")]
    ValidationFailed { path: String, message: String },

    #[error("Invalid JSON Schema for {message_type}: {reason}")]
    InvalidSchema {
        message_type: String,
        reason: String,
    },

    #[error("No encryption policy declared for {message_type}")]
    MissingEncryptionPolicy { message_type: String },

    #[error("Missing key material for {message_type}: {reason}")]
    MissingKeyMaterial {
        message_type: String,
        reason: String,
    },

    #[error("Encryption failed: {reason}")]
    Encryption { reason: String },

    #[error("Decryption failed: {reason}")]
    Decryption { reason: String },

    #[error("Message type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    #[error("Unknown message type: {message_type}")]
    UnknownMessageType { message_type: String },
}

impl MessagingError {
    pub fn message_serialization(message: impl Into<String>) -> Self {
        Self::MessageSerialization {
            message: message.into(),
        }
    }

    pub fn message_deserialization(message: impl Into<String>) -> Self {
        Self::MessageDeserialization {
            message: message.into(),
        }
    }

    pub fn invalid_payload(message_type: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPayload {
            message_type: message_type.into(),
            reason: reason.into(),
        }
    }

    pub fn validation_failed(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ValidationFailed {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn invalid_schema(message_type: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidSchema {
            message_type: message_type.into(),
            reason: reason.into(),
        }
    }

    pub fn missing_encryption_policy(message_type: impl Into<String>) -> Self {
        Self::MissingEncryptionPolicy {
            message_type: message_type.into(),
        }
    }

    pub fn missing_key_material(message_type: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MissingKeyMaterial {
            message_type: message_type.into(),
            reason: reason.into(),
        }
    }

    pub fn encryption(reason: impl Into<String>) -> Self {
        Self::Encryption {
            reason: reason.into(),
        }
    }

    pub fn decryption(reason: impl Into<String>) -> Self {
        Self::Decryption {
            reason: reason.into(),
        }
    }

    pub fn type_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::TypeMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub fn unknown_message_type(message_type: impl Into<String>) -> Self {
        Self::UnknownMessageType {
            message_type: message_type.into(),
        }
    }
}

/// Conversion from serde_json::Error to MessagingError
impl From<serde_json::Error> for MessagingError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_syntax() || err.is_eof() {
            MessagingError::message_deserialization(err.to_string())
        } else {
            MessagingError::message_serialization(err.to_string())
        }
    }
}

/// Result type alias for messaging operations
pub type MessagingResult<T> = Result<T, MessagingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversions() {
        let json_err = serde_json::from_str::<serde_json::Value>("{invalid json").unwrap_err();
        let messaging_err: MessagingError = json_err.into();
        assert!(matches!(
            messaging_err,
            MessagingError::MessageDeserialization { .. }
        ));
    }

    #[test]
    fn test_error_display() {
        let err = MessagingError::missing_key_material("com.acme.user.created", "empty secret key");
        let display = format!("{err}");
        assert!(display.contains("Missing key material"));
        assert!(display.contains("com.acme.user.created"));

        let err = MessagingError::validation_failed("/email", "is required");
        assert_eq!(err.to_string(), "Validation failed at /email: is required");
    }
}
