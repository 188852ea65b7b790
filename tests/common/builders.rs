//! Builders for envelopes, messages and broker jobs used across tests.

use std::sync::Arc;

use chrono::Utc;
use dmq_core::broker::JobHandle;
use dmq_core::messaging::{
    EncryptionPolicy, FieldType, Message, MessageDefinition,
};
use serde_json::{json, Value};

pub const TENANT: &str = "tenant-1";
pub const ORDER_CREATED: &str = "com.acme.order.created";
pub const PATIENT_ADMITTED: &str = "com.acme.patient.admitted";
pub const REPORT_TASK: &str = "com.acme.report.generate";

pub fn order_definition() -> Arc<MessageDefinition> {
    Arc::new(
        MessageDefinition::event(ORDER_CREATED, "1")
            .with_schema(json!({
                "type": "object",
                "required": ["orderId", "total"],
                "properties": {
                    "orderId": {"type": "string"},
                    "total": {"type": "number", "minimum": 0}
                }
            }))
            .expect("order schema compiles"),
    )
}

pub fn patient_definition() -> Arc<MessageDefinition> {
    Arc::new(
        MessageDefinition::event(PATIENT_ADMITTED, "1").with_encryption(EncryptionPolicy::fields([
            ("name", FieldType::String),
            ("vitals", FieldType::Object),
        ])),
    )
}

pub fn order_message(total: i64) -> Message {
    Message::build(
        order_definition(),
        TENANT,
        "checkout",
        json!({"orderId": "o-1", "total": total}),
        None,
    )
    .expect("order message builds")
}

pub fn task_definition() -> Arc<MessageDefinition> {
    Arc::new(MessageDefinition::task(REPORT_TASK, "1"))
}

pub fn report_task(report: &str) -> Message {
    Message::build(task_definition(), TENANT, "reports", json!({"report": report}), None)
        .expect("task message builds")
}

/// Broker job as an executor would see it
pub struct JobBuilder {
    job: JobHandle,
}

impl JobBuilder {
    pub fn new(id: &str) -> Self {
        Self {
            job: JobHandle {
                id: id.to_string(),
                name: ORDER_CREATED.to_string(),
                queue: "orders".to_string(),
                data: json!({"tenantid": TENANT, "data": {"orderId": "o-1"}}),
                attempts_made: 0,
                progress: None,
                timestamp: Utc::now().timestamp_millis(),
                processed_on: None,
                finished_on: None,
                failed_reason: None,
                delay_ms: 0,
                priority: 0,
            },
        }
    }

    pub fn queue(mut self, queue: &str) -> Self {
        self.job.queue = queue.to_string();
        self
    }

    pub fn tenant(mut self, tenant: &str) -> Self {
        self.job.data = json!({"tenantid": tenant, "data": {"orderId": "o-1"}});
        self
    }

    pub fn progress(mut self, progress: Value) -> Self {
        self.job.progress = Some(progress);
        self
    }

    pub fn build(self) -> JobHandle {
        self.job
    }
}
