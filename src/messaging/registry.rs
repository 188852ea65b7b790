//! Registry of known message definitions, keyed by type string.

use std::collections::HashMap;
use std::sync::Arc;

use super::definition::MessageDefinition;
use super::envelope::Envelope;
use super::errors::{MessagingError, MessagingResult};
use super::message::Message;

#[derive(Debug, Default, Clone)]
pub struct MessageRegistry {
    definitions: HashMap<String, Arc<MessageDefinition>>,
}

impl MessageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a definition, replacing any earlier one for the same type
    pub fn register(&mut self, definition: MessageDefinition) -> Arc<MessageDefinition> {
        let definition = Arc::new(definition);
        self.definitions
            .insert(definition.message_type.clone(), Arc::clone(&definition));
        definition
    }

    pub fn get(&self, message_type: &str) -> Option<Arc<MessageDefinition>> {
        self.definitions.get(message_type).cloned()
    }

    pub fn require(&self, message_type: &str) -> MessagingResult<Arc<MessageDefinition>> {
        self.get(message_type)
            .ok_or_else(|| MessagingError::unknown_message_type(message_type))
    }

    pub fn contains(&self, message_type: &str) -> bool {
        self.definitions.contains_key(message_type)
    }

    /// Rehydrate an inbound envelope using its registered definition
    pub fn rehydrate(&self, envelope: Envelope) -> MessagingResult<Message> {
        let definition = self.require(&envelope.message_type)?;
        Message::from_envelope(definition, envelope)
    }

    pub fn message_types(&self) -> impl Iterator<Item = &str> {
        self.definitions.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}
