//! # PostgreSQL Store
//!
//! sqlx-backed implementation of [`TrackedJobStore`] and [`VaultStore`].
//!
//! Idempotency relies on unique constraints rather than locks held across
//! calls: tracked job creation is `ON CONFLICT DO NOTHING` on
//! `(tenant_id, job_id)` and event appends are keyed by the unique
//! `job_event_id`. Table definitions are in [`SCHEMA_STATEMENTS`] and on the
//! model types.

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{debug, info};
use uuid::Uuid;

use super::errors::{StoreError, StoreResult};
use super::traits::{TrackedJobStore, VaultStore};
use crate::config::DatabaseConfig;
use crate::models::{
    AppendedEvent, NewTrackedJob, NewVaultRecord, TrackedJob, TrackedJobEvent, UpdateTrackedJob,
    VaultRecord, VAULT_STATE_ACTIVE, VAULT_STATE_DESTROYED,
};
use crate::tracking::JobState;

/// DDL for the tables this store reads and writes, safe to run repeatedly
pub const SCHEMA_STATEMENTS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS dmq_tracked_jobs (
        id UUID PRIMARY KEY,
        tenant_id TEXT NOT NULL,
        job_id TEXT NOT NULL,
        queue_id TEXT NOT NULL,
        name TEXT NOT NULL,
        state TEXT NOT NULL,
        data JSONB NOT NULL DEFAULT '{}',
        log TEXT NOT NULL DEFAULT '',
        metadata JSONB NOT NULL DEFAULT '{}',
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        UNIQUE (tenant_id, job_id)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_dmq_tracked_jobs_job_id ON dmq_tracked_jobs (job_id)",
    r#"
    CREATE TABLE IF NOT EXISTS dmq_tracked_job_events (
        id UUID PRIMARY KEY,
        tracked_job_id UUID NOT NULL REFERENCES dmq_tracked_jobs (id),
        job_event_id TEXT NOT NULL UNIQUE,
        event TEXT NOT NULL,
        state TEXT NOT NULL,
        state_prev TEXT,
        metadata JSONB NOT NULL DEFAULT '{}',
        sort_key INTEGER NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_dmq_tracked_job_events_job ON dmq_tracked_job_events (tracked_job_id, sort_key)",
    r#"
    CREATE TABLE IF NOT EXISTS dmq_vault_records (
        id UUID PRIMARY KEY,
        tenant_id TEXT NOT NULL,
        entity_id TEXT NOT NULL,
        entity_type TEXT,
        key_material TEXT NOT NULL,
        state TEXT NOT NULL DEFAULT 'active',
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_dmq_vault_records_entity ON dmq_vault_records (tenant_id, entity_id)",
];

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool from configuration
    pub async fn connect(config: &DatabaseConfig) -> StoreResult<Self> {
        let url = config
            .url
            .as_deref()
            .ok_or_else(|| StoreError::database("database.url is not configured"))?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout())
            .connect(url)
            .await?;

        info!(
            max_connections = config.max_connections,
            "Database pool initialized"
        );
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create the store's tables and indexes if they do not exist
    pub async fn ensure_schema(&self) -> StoreResult<()> {
        for statement in SCHEMA_STATEMENTS {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        debug!("DMQ store schema ensured");
        Ok(())
    }
}

#[async_trait]
impl TrackedJobStore for PgStore {
    async fn create_tracked_job(&self, params: NewTrackedJob) -> StoreResult<TrackedJob> {
        let inserted = sqlx::query_as::<_, TrackedJob>(
            r#"
            INSERT INTO dmq_tracked_jobs
                (id, tenant_id, job_id, queue_id, name, state, data, log, metadata, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, '', $8, now(), now())
            ON CONFLICT (tenant_id, job_id) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(&params.tenant_id)
        .bind(&params.job_id)
        .bind(&params.queue_id)
        .bind(&params.name)
        .bind(JobState::Waiting.as_str())
        .bind(&params.data)
        .bind(&params.metadata)
        .fetch_optional(&self.pool)
        .await?;

        match inserted {
            Some(job) => Ok(job),
            None => self
                .find_tracked_job(&params.tenant_id, &params.job_id)
                .await?
                .ok_or_else(|| {
                    StoreError::not_found(
                        "tracked job",
                        format!("{}/{}", params.tenant_id, params.job_id),
                    )
                }),
        }
    }

    async fn update_tracked_job(&self, params: UpdateTrackedJob) -> StoreResult<AppendedEvent> {
        let mut tx = self.pool.begin().await?;

        let job = sqlx::query_as::<_, TrackedJob>(
            "SELECT * FROM dmq_tracked_jobs WHERE tenant_id = $1 AND job_id = $2 FOR UPDATE",
        )
        .bind(&params.tenant_id)
        .bind(&params.job_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| {
            StoreError::not_found(
                "tracked job",
                format!("{}/{}", params.tenant_id, params.job_id),
            )
        })?;

        let next_sort_key: i32 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(sort_key), 0) + 1 FROM dmq_tracked_job_events WHERE tracked_job_id = $1",
        )
        .bind(job.id)
        .fetch_one(&mut *tx)
        .await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO dmq_tracked_job_events
                (id, tracked_job_id, job_event_id, event, state, state_prev, metadata, sort_key, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, now())
            ON CONFLICT (job_event_id) DO NOTHING
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(job.id)
        .bind(&params.job_event_id)
        .bind(params.event.as_str())
        .bind(params.state.as_str())
        .bind(&job.state)
        .bind(&params.metadata)
        .bind(next_sort_key)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if inserted == 0 {
            tx.rollback().await?;
            debug!(
                job_id = %params.job_id,
                job_event_id = %params.job_event_id,
                "Job event already recorded"
            );
            return Ok(AppendedEvent {
                job,
                appended: false,
            });
        }

        let updated = sqlx::query_as::<_, TrackedJob>(
            r#"
            UPDATE dmq_tracked_jobs
            SET state = $1, metadata = $2, log = COALESCE($3, log), updated_at = now()
            WHERE id = $4
            RETURNING *
            "#,
        )
        .bind(params.state.as_str())
        .bind(&params.metadata)
        .bind(&params.log)
        .bind(job.id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(AppendedEvent {
            job: updated,
            appended: true,
        })
    }

    async fn find_tracked_job(
        &self,
        tenant_id: &str,
        job_id: &str,
    ) -> StoreResult<Option<TrackedJob>> {
        let job = sqlx::query_as::<_, TrackedJob>(
            "SELECT * FROM dmq_tracked_jobs WHERE tenant_id = $1 AND job_id = $2",
        )
        .bind(tenant_id)
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(job)
    }

    async fn find_tracked_job_by_job_id(&self, job_id: &str) -> StoreResult<Option<TrackedJob>> {
        let job = sqlx::query_as::<_, TrackedJob>(
            "SELECT * FROM dmq_tracked_jobs WHERE job_id = $1 ORDER BY created_at LIMIT 1",
        )
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(job)
    }

    async fn list_tracked_job_events(
        &self,
        tracked_job_id: Uuid,
    ) -> StoreResult<Vec<TrackedJobEvent>> {
        let events = sqlx::query_as::<_, TrackedJobEvent>(
            "SELECT * FROM dmq_tracked_job_events WHERE tracked_job_id = $1 ORDER BY sort_key",
        )
        .bind(tracked_job_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(events)
    }
}

#[async_trait]
impl VaultStore for PgStore {
    async fn create_vault_record(&self, params: NewVaultRecord) -> StoreResult<VaultRecord> {
        let record = sqlx::query_as::<_, VaultRecord>(
            r#"
            INSERT INTO dmq_vault_records
                (id, tenant_id, entity_id, entity_type, key_material, state, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, now(), now())
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&params.tenant_id)
        .bind(&params.entity_id)
        .bind(&params.entity_type)
        .bind(&params.key_material)
        .bind(VAULT_STATE_ACTIVE)
        .fetch_one(&self.pool)
        .await?;
        Ok(record)
    }

    async fn find_vault_record(
        &self,
        tenant_id: &str,
        vault_id: Uuid,
    ) -> StoreResult<Option<VaultRecord>> {
        let record = sqlx::query_as::<_, VaultRecord>(
            "SELECT * FROM dmq_vault_records WHERE id = $1 AND tenant_id = $2",
        )
        .bind(vault_id)
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }

    async fn find_vault_records_by_entity(
        &self,
        tenant_id: &str,
        entity_id: &str,
        entity_type: Option<&str>,
    ) -> StoreResult<Vec<VaultRecord>> {
        let records = sqlx::query_as::<_, VaultRecord>(
            r#"
            SELECT * FROM dmq_vault_records
            WHERE tenant_id = $1 AND entity_id = $2 AND ($3::TEXT IS NULL OR entity_type = $3)
            ORDER BY created_at
            "#,
        )
        .bind(tenant_id)
        .bind(entity_id)
        .bind(entity_type)
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }

    async fn destroy_vault_records_by_entity(
        &self,
        tenant_id: &str,
        entity_id: &str,
        entity_type: Option<&str>,
    ) -> StoreResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE dmq_vault_records
            SET key_material = '', state = $4, updated_at = now()
            WHERE tenant_id = $1 AND entity_id = $2 AND ($3::TEXT IS NULL OR entity_type = $3)
              AND state <> $4
            "#,
        )
        .bind(tenant_id)
        .bind(entity_id)
        .bind(entity_type)
        .bind(VAULT_STATE_DESTROYED)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
