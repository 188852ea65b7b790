//! In-memory implementation of both store contracts for tests and local use.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

use super::errors::{StoreError, StoreResult};
use super::traits::{TrackedJobStore, VaultStore};
use crate::models::{
    AppendedEvent, NewTrackedJob, NewVaultRecord, TrackedJob, TrackedJobEvent, UpdateTrackedJob,
    VaultRecord, VAULT_STATE_ACTIVE, VAULT_STATE_DESTROYED,
};
use crate::tracking::JobState;

type NaturalKey = (String, String);

#[derive(Debug, Default)]
pub struct InMemoryStore {
    jobs: DashMap<NaturalKey, TrackedJob>,
    events: DashMap<Uuid, Vec<TrackedJobEvent>>,
    event_ids: DashMap<String, Uuid>,
    vault: DashMap<Uuid, VaultRecord>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tracked_job_count(&self) -> usize {
        self.jobs.len()
    }

    pub fn clear(&self) {
        self.jobs.clear();
        self.events.clear();
        self.event_ids.clear();
        self.vault.clear();
    }

    fn entity_matches(record: &VaultRecord, tenant_id: &str, entity_id: &str, entity_type: Option<&str>) -> bool {
        record.tenant_id == tenant_id
            && record.entity_id == entity_id
            && entity_type.map_or(true, |kind| record.entity_type.as_deref() == Some(kind))
    }
}

#[async_trait]
impl TrackedJobStore for InMemoryStore {
    async fn create_tracked_job(&self, params: NewTrackedJob) -> StoreResult<TrackedJob> {
        let key = (params.tenant_id.clone(), params.job_id.clone());
        let job = self
            .jobs
            .entry(key)
            .or_insert_with(|| {
                let now = Utc::now();
                TrackedJob {
                    id: Uuid::now_v7(),
                    tenant_id: params.tenant_id,
                    job_id: params.job_id,
                    queue_id: params.queue_id,
                    name: params.name,
                    state: JobState::Waiting.to_string(),
                    data: params.data,
                    log: String::new(),
                    metadata: params.metadata,
                    created_at: now,
                    updated_at: now,
                }
            })
            .clone();
        Ok(job)
    }

    async fn update_tracked_job(&self, params: UpdateTrackedJob) -> StoreResult<AppendedEvent> {
        let key = (params.tenant_id.clone(), params.job_id.clone());
        let mut job = self
            .jobs
            .get_mut(&key)
            .ok_or_else(|| StoreError::not_found("tracked job", format!("{}/{}", key.0, key.1)))?;

        match self.event_ids.entry(params.job_event_id.clone()) {
            Entry::Occupied(_) => {
                return Ok(AppendedEvent {
                    job: job.clone(),
                    appended: false,
                })
            }
            Entry::Vacant(slot) => {
                slot.insert(job.id);
            }
        }

        let now = Utc::now();
        let mut events = self.events.entry(job.id).or_default();
        let sort_key = i32::try_from(events.len() + 1).unwrap_or(i32::MAX);
        events.push(TrackedJobEvent {
            id: Uuid::now_v7(),
            tracked_job_id: job.id,
            job_event_id: params.job_event_id,
            event: params.event.to_string(),
            state: params.state.to_string(),
            state_prev: Some(job.state.clone()),
            metadata: params.metadata.clone(),
            sort_key,
            created_at: now,
        });

        job.state = params.state.to_string();
        job.metadata = params.metadata;
        if let Some(log) = params.log {
            job.log = log;
        }
        job.updated_at = now;

        Ok(AppendedEvent {
            job: job.clone(),
            appended: true,
        })
    }

    async fn find_tracked_job(
        &self,
        tenant_id: &str,
        job_id: &str,
    ) -> StoreResult<Option<TrackedJob>> {
        let key = (tenant_id.to_string(), job_id.to_string());
        Ok(self.jobs.get(&key).map(|job| job.clone()))
    }

    async fn find_tracked_job_by_job_id(&self, job_id: &str) -> StoreResult<Option<TrackedJob>> {
        Ok(self
            .jobs
            .iter()
            .filter(|entry| entry.job_id == job_id)
            .map(|entry| entry.value().clone())
            .min_by_key(|job| job.created_at))
    }

    async fn list_tracked_job_events(
        &self,
        tracked_job_id: Uuid,
    ) -> StoreResult<Vec<TrackedJobEvent>> {
        Ok(self
            .events
            .get(&tracked_job_id)
            .map(|events| events.clone())
            .unwrap_or_default())
    }
}

#[async_trait]
impl VaultStore for InMemoryStore {
    async fn create_vault_record(&self, params: NewVaultRecord) -> StoreResult<VaultRecord> {
        let now = Utc::now();
        let record = VaultRecord {
            id: Uuid::new_v4(),
            tenant_id: params.tenant_id,
            entity_id: params.entity_id,
            entity_type: params.entity_type,
            key_material: params.key_material,
            state: VAULT_STATE_ACTIVE.to_string(),
            created_at: now,
            updated_at: now,
        };
        self.vault.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_vault_record(
        &self,
        tenant_id: &str,
        vault_id: Uuid,
    ) -> StoreResult<Option<VaultRecord>> {
        Ok(self
            .vault
            .get(&vault_id)
            .filter(|record| record.tenant_id == tenant_id)
            .map(|record| record.clone()))
    }

    async fn find_vault_records_by_entity(
        &self,
        tenant_id: &str,
        entity_id: &str,
        entity_type: Option<&str>,
    ) -> StoreResult<Vec<VaultRecord>> {
        let mut records: Vec<VaultRecord> = self
            .vault
            .iter()
            .filter(|entry| Self::entity_matches(entry.value(), tenant_id, entity_id, entity_type))
            .map(|entry| entry.value().clone())
            .collect();
        records.sort_by_key(|record| record.created_at);
        Ok(records)
    }

    async fn destroy_vault_records_by_entity(
        &self,
        tenant_id: &str,
        entity_id: &str,
        entity_type: Option<&str>,
    ) -> StoreResult<u64> {
        let now = Utc::now();
        let mut destroyed = 0;
        for mut entry in self.vault.iter_mut() {
            let record = entry.value_mut();
            if Self::entity_matches(record, tenant_id, entity_id, entity_type) && !record.is_destroyed() {
                record.key_material.clear();
                record.state = VAULT_STATE_DESTROYED.to_string();
                record.updated_at = now;
                destroyed += 1;
            }
        }
        Ok(destroyed)
    }
}
