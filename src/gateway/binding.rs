//! Bindings between message types and queues.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::messaging::Envelope;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BindingDirection {
    In,
    Out,
}

/// Predicate deciding whether a topic binding routes a message
pub type TopicPredicate = Arc<dyn Fn(&Envelope) -> bool + Send + Sync>;

/// Outbound target of a binding
#[derive(Clone)]
pub enum OutboundRoute {
    /// Exactly one queue
    Direct(String),
    /// Every listed queue, unconditionally
    Fanout(Vec<String>),
    /// Every listed queue, only when the predicate holds
    Topic {
        predicate: TopicPredicate,
        queues: Vec<String>,
    },
}

impl fmt::Debug for OutboundRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Direct(queue) => f.debug_tuple("Direct").field(queue).finish(),
            Self::Fanout(queues) => f.debug_tuple("Fanout").field(queues).finish(),
            Self::Topic { queues, .. } => f
                .debug_struct("Topic")
                .field("predicate", &"<fn>")
                .field("queues", queues)
                .finish(),
        }
    }
}

impl OutboundRoute {
    /// Queues this route sends `envelope` to
    pub fn targets(&self, envelope: &Envelope) -> Vec<&str> {
        match self {
            Self::Direct(queue) => vec![queue.as_str()],
            Self::Fanout(queues) => queues.iter().map(String::as_str).collect(),
            Self::Topic { predicate, queues } => {
                if predicate(envelope) {
                    queues.iter().map(String::as_str).collect()
                } else {
                    Vec::new()
                }
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct Binding {
    pub direction: BindingDirection,
    pub message_type: String,
    /// Present iff the binding is outbound
    pub route: Option<OutboundRoute>,
}

impl Binding {
    /// Allow-list entry for a gateway
    pub fn inbound(message_type: impl Into<String>) -> Self {
        Self {
            direction: BindingDirection::In,
            message_type: message_type.into(),
            route: None,
        }
    }

    pub fn direct(message_type: impl Into<String>, queue: impl Into<String>) -> Self {
        Self::outbound(message_type, OutboundRoute::Direct(queue.into()))
    }

    pub fn fanout<I, Q>(message_type: impl Into<String>, queues: I) -> Self
    where
        I: IntoIterator<Item = Q>,
        Q: Into<String>,
    {
        Self::outbound(
            message_type,
            OutboundRoute::Fanout(queues.into_iter().map(Into::into).collect()),
        )
    }

    pub fn topic<I, Q, F>(message_type: impl Into<String>, predicate: F, queues: I) -> Self
    where
        I: IntoIterator<Item = Q>,
        Q: Into<String>,
        F: Fn(&Envelope) -> bool + Send + Sync + 'static,
    {
        Self::outbound(
            message_type,
            OutboundRoute::Topic {
                predicate: Arc::new(predicate),
                queues: queues.into_iter().map(Into::into).collect(),
            },
        )
    }

    fn outbound(message_type: impl Into<String>, route: OutboundRoute) -> Self {
        Self {
            direction: BindingDirection::Out,
            message_type: message_type.into(),
            route: Some(route),
        }
    }

    pub fn is_inbound(&self) -> bool {
        self.direction == BindingDirection::In
    }

    pub fn matches(&self, envelope: &Envelope) -> bool {
        self.message_type == envelope.message_type
    }
}
