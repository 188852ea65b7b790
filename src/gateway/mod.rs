//! # Gateways and Routing
//!
//! Inbound allow-lists and outbound routing of envelopes onto broker queues.
//! Capabilities are split into [`Allower`] and [`Publisher`]; the broker side
//! is reached through [`Enqueuer`](crate::broker::Enqueuer).

pub mod binding;
pub mod errors;
pub mod queue_gateway;
pub mod router;
pub mod traits;

pub use binding::{Binding, BindingDirection, OutboundRoute, TopicPredicate};
pub use errors::{GatewayError, GatewayResult};
pub use queue_gateway::QueueGateway;
pub use router::{OutboundRouter, RoutedJob};
pub use traits::{Allower, Publisher};
