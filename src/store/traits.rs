//! Relational store contracts consumed by the reconciler and the vault.

use async_trait::async_trait;
use uuid::Uuid;

use super::errors::StoreResult;
use crate::models::{
    AppendedEvent, NewTrackedJob, NewVaultRecord, TrackedJob, TrackedJobEvent, UpdateTrackedJob,
    VaultRecord,
};

#[async_trait]
pub trait TrackedJobStore: Send + Sync {
    /// Create a tracked job; an existing row for the natural key is returned as-is
    async fn create_tracked_job(&self, params: NewTrackedJob) -> StoreResult<TrackedJob>;

    /// Append one event and denormalize it onto the job
    ///
    /// Appending an already recorded `job_event_id` changes nothing. Fails with
    /// `NotFound` when the tracked job does not exist.
    async fn update_tracked_job(&self, params: UpdateTrackedJob) -> StoreResult<AppendedEvent>;

    async fn find_tracked_job(&self, tenant_id: &str, job_id: &str)
        -> StoreResult<Option<TrackedJob>>;

    /// Secondary lookup for when the tenant is not known
    async fn find_tracked_job_by_job_id(&self, job_id: &str) -> StoreResult<Option<TrackedJob>>;

    /// Events of one tracked job in append order
    async fn list_tracked_job_events(&self, tracked_job_id: Uuid)
        -> StoreResult<Vec<TrackedJobEvent>>;
}

#[async_trait]
pub trait VaultStore: Send + Sync {
    async fn create_vault_record(&self, params: NewVaultRecord) -> StoreResult<VaultRecord>;

    async fn find_vault_record(&self, tenant_id: &str, vault_id: Uuid)
        -> StoreResult<Option<VaultRecord>>;

    /// Records for an entity, destroyed ones included
    async fn find_vault_records_by_entity(
        &self,
        tenant_id: &str,
        entity_id: &str,
        entity_type: Option<&str>,
    ) -> StoreResult<Vec<VaultRecord>>;

    /// Soft delete; returns how many active records were destroyed
    async fn destroy_vault_records_by_entity(
        &self,
        tenant_id: &str,
        entity_id: &str,
        entity_type: Option<&str>,
    ) -> StoreResult<u64>;
}
