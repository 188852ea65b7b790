#![allow(clippy::doc_markdown)] // Allow technical terms like PostgreSQL, SQLx in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # DMQ Core
//!
//! Client core for services exchanging versioned, tenant-scoped messages over
//! an external durable job broker.
//!
//! ## Overview
//!
//! The crate covers four subsystems:
//!
//! - **Envelopes**: build, seal, verify, validate, correlate and selectively
//!   encrypt messages ([`messaging`], [`vault`])
//! - **Gateways**: inbound allow-lists and direct/fanout/topic outbound
//!   routing ([`gateway`])
//! - **Recurring tasks**: validated, content-deduplicated schedules
//!   ([`scheduler`])
//! - **Job tracking**: an eventually consistent projection of broker job
//!   lifecycles into a relational store, tolerant of duplicate and
//!   out-of-order delivery ([`tracking`], [`store`])
//!
//! The broker itself is external and consumed through the traits in
//! [`broker`]; [`broker::InMemoryBroker`] and [`store::InMemoryStore`] stand in
//! for the real backends in tests and local development.
//!
//! ## Module Organization
//!
//! - [`config`] - Layered configuration and the namespace suffix
//! - [`error`] - Crate-wide error aggregation
//! - [`logging`] - Structured logging setup and helpers
//! - [`models`] - Rows owned by job tracking and the vault
//! - [`validation`] - Payload safety limits and validation reports
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use dmq_core::broker::InMemoryBroker;
//! use dmq_core::gateway::{Binding, Publisher, QueueGateway};
//! use dmq_core::messaging::{Message, MessageDefinition};
//! use serde_json::json;
//!
//! # tokio_test::block_on(async {
//! let broker = Arc::new(InMemoryBroker::new());
//! let definition = Arc::new(MessageDefinition::event("com.acme.order.created", "1"));
//!
//! let mut message =
//!     Message::build(definition, "tenant-1", "checkout", json!({"orderId": "o-1"}), None).unwrap();
//! message.seal().unwrap();
//!
//! let gateway = QueueGateway::new("orders", "orders", broker)
//!     .with_binding(Binding::inbound("com.acme.order.created"))
//!     .unwrap();
//! let job = gateway.publish_or_send(message.envelope()).await.unwrap();
//! assert_eq!(job.name, "com.acme.order.created");
//! # });
//! ```

pub mod broker;
pub mod config;
pub mod constants;
pub mod error;
pub mod gateway;
pub mod logging;
pub mod messaging;
pub mod models;
pub mod scheduler;
pub mod store;
pub mod tracking;
pub mod utils;
pub mod validation;
pub mod vault;

pub use broker::{Broker, BrokerError, EnqueueOptions, Enqueuer, InMemoryBroker, JobHandle, RetryPolicy};
pub use config::{ConfigManager, ConfigurationError, DmqConfig};
pub use error::{DmqError, Result};
pub use gateway::{Allower, Binding, GatewayError, OutboundRouter, Publisher, QueueGateway};
pub use logging::init_structured_logging;
pub use messaging::{Envelope, Message, MessageDefinition, MessageRegistry, MessagingError};
pub use scheduler::{ScheduleOptions, SchedulerError, TaskScheduler};
pub use store::{InMemoryStore, StoreError, TrackedJobStore, VaultStore};
pub use tracking::{
    JobEventEmitter, JobEventKind, JobLifecycleEvent, JobState, ReconcileError, ReconcileOutcome,
    TrackedJobReconciler,
};
pub use validation::{ValidationIssue, ValidationReport};
pub use vault::{VaultError, VaultService};

#[cfg(feature = "postgres")]
pub use store::PgStore;
