//! # Messaging Module
//!
//! Versioned, tenant-scoped message envelopes: building, sealing,
//! verification, correlation, schema validation and selective encryption.

pub mod definition;
pub mod encryption;
pub mod envelope;
pub mod errors;
pub mod message;
pub mod registry;

pub use definition::{
    EncryptionPolicy, FieldEncryption, FieldType, MessageCategory, MessageDefinition,
};
pub use encryption::{AesGcmCipher, Cipher};
pub use envelope::{Envelope, EnvelopeContext, EnvelopeMetadata, TENANT_FIELD};
pub use errors::{MessagingError, MessagingResult};
pub use message::{BuildOptions, Message};
pub use registry::MessageRegistry;
