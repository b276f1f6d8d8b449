// [libs/infra/db/src/repositories/usage.rs]
/*!
 * =================================================================
 * APARATO: USAGE QUEUE & AGGREGATION REPOSITORY (V4.3 - GATEWAY MASTER)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: COLA DURABLE DE LOTES Y AGREGACIÓN DIARIA IDEMPOTENTE
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. OUTBOX DOCTRINE: Los lotes de eventos se cristalizan como trabajos
 *    durables; el worker los reclama atómicamente vía RETURNING.
 * 2. GROUP-SCOPED TRANSACTIONS: La inserción deduplicada de eventos y
 *    el upsert del agregado diario de cada grupo (principal, fecha)
 *    comparten una única transacción; el agregado solo absorbe filas
 *    realmente insertadas.
 * 3. DEAD-LETTER GOVERNANCE: Trabajos con >= 3 fallas y >= 1 h de edad
 *    se sellan como muertos y se purgan a los 7 días.
 *
 * # Mathematical Proof (Monotone Re-Apply):
 * Sea B un lote reintentado. Cada evento de B ya insertado es un no-op
 * y no aporta delta; por tanto aplicar B n veces produce exactamente
 * los agregados de aplicarlo una vez.
 * =================================================================
 */

use crate::errors::DbError;
use crate::repositories::events::insert_event_in_transaction;
use crate::repositories::parse_stored_timestamp;
use crate::TursoClient;
use chrono::{DateTime, Duration, Utc};
use libsql::params;
use omniway_domain_models::events::{RequestEvent, UsageDaily};
use omniway_domain_models::owner::OwnerRef;
use std::collections::BTreeMap;
use tracing::{debug, info, instrument};
use uuid::Uuid;

/// Días de retención de trabajos muertos antes de la purga.
const DEAD_JOB_RETENTION_DAYS: i64 = 7;

/// Trabajo reclamado de la cola durable.
#[derive(Debug)]
pub struct UsageJob {
    pub job_identifier: String,
    pub events: Vec<RequestEvent>,
    pub attempts: i64,
    pub created_at: DateTime<Utc>,
}

/// Resultado de aplicar un lote contra el Ledger Durable.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct BatchApplication {
    pub inserted_events: usize,
    pub duplicate_events: usize,
}

pub struct UsageRepository {
    database_client: TursoClient,
}

impl UsageRepository {
    pub fn new(client: TursoClient) -> Self {
        Self { database_client: client }
    }

    // --- ESTRATO DE COLA DURABLE ---

    /// Cristaliza un lote de eventos como trabajo pendiente.
    #[instrument(skip(self, events), fields(volume = events.len()))]
    pub async fn enqueue_batch(&self, events: &[RequestEvent]) -> Result<String, DbError> {
        let database_connection = self.database_client.get_connection()?;
        let job_identifier = Uuid::new_v4().to_string();

        let payload_json = serde_json::to_string(events)
            .map_err(|serialization_fault| DbError::MappingError(serialization_fault.to_string()))?;

        database_connection
            .execute(
                "INSERT INTO usage_jobs (id, payload_json, status, created_at)
                 VALUES (?1, ?2, 'pending', ?3)",
                params![job_identifier.clone(), payload_json, Utc::now().to_rfc3339()],
            )
            .await?;

        debug!("📦 [USAGE_QUEUE]: Batch {} sealed with {} events.", job_identifier, events.len());
        Ok(job_identifier)
    }

    /**
     * Reclama atómicamente el siguiente trabajo elegible.
     * El UPDATE ... RETURNING garantiza que dos workers jamás
     * procesen el mismo trabajo simultáneamente.
     */
    #[instrument(skip(self))]
    pub async fn claim_next_job(&self, now: DateTime<Utc>) -> Result<Option<UsageJob>, DbError> {
        let database_connection = self.database_client.get_connection()?;

        let mut claimed_rows = database_connection
            .query(
                "UPDATE usage_jobs SET status = 'processing'
                 WHERE id = (
                     SELECT id FROM usage_jobs
                     WHERE status = 'pending'
                       AND (next_attempt_at IS NULL OR next_attempt_at <= ?1)
                     ORDER BY created_at
                     LIMIT 1
                 )
                 RETURNING id, payload_json, attempts, created_at",
                params![now.to_rfc3339()],
            )
            .await?;

        let data_row = match claimed_rows.next().await? {
            Some(row) => row,
            None => return Ok(None),
        };

        let payload_json = data_row.get::<String>(1)?;
        let events = serde_json::from_str::<Vec<RequestEvent>>(&payload_json)
            .map_err(|deserialization_fault| DbError::MappingError(deserialization_fault.to_string()))?;

        Ok(Some(UsageJob {
            job_identifier: data_row.get::<String>(0)?,
            events,
            attempts: data_row.get::<i64>(2)?,
            created_at: parse_stored_timestamp(data_row.get::<Option<String>>(3)?)
                .unwrap_or_else(Utc::now),
        }))
    }

    /// Sella un trabajo completado (se elimina de la cola).
    pub async fn seal_job(&self, job_identifier: &str) -> Result<(), DbError> {
        let database_connection = self.database_client.get_connection()?;
        database_connection
            .execute("DELETE FROM usage_jobs WHERE id = ?1", params![job_identifier])
            .await?;
        Ok(())
    }

    /// Devuelve el trabajo a la cola con backoff exponencial.
    #[instrument(skip(self, failure_detail))]
    pub async fn schedule_retry(
        &self,
        job_identifier: &str,
        next_attempt_at: DateTime<Utc>,
        failure_detail: &str,
    ) -> Result<(), DbError> {
        let database_connection = self.database_client.get_connection()?;
        database_connection
            .execute(
                "UPDATE usage_jobs
                 SET status = 'pending', attempts = attempts + 1,
                     last_error = ?2, next_attempt_at = ?3
                 WHERE id = ?1",
                params![job_identifier, failure_detail, next_attempt_at.to_rfc3339()],
            )
            .await?;
        Ok(())
    }

    /// Sella un trabajo irrecuperable en el estrato dead-letter.
    #[instrument(skip(self, failure_detail))]
    pub async fn dead_letter_job(
        &self,
        job_identifier: &str,
        failure_detail: &str,
    ) -> Result<(), DbError> {
        let database_connection = self.database_client.get_connection()?;
        database_connection
            .execute(
                "UPDATE usage_jobs
                 SET status = 'dead', attempts = attempts + 1,
                     last_error = ?2, dead_lettered_at = ?3
                 WHERE id = ?1",
                params![job_identifier, failure_detail, Utc::now().to_rfc3339()],
            )
            .await?;
        info!("💀 [USAGE_QUEUE]: Job {} dead-lettered.", job_identifier);
        Ok(())
    }

    /**
     * Devuelve a 'pending' los trabajos atascados en 'processing'
     * (worker muerto a mitad de lote). El re-proceso es inocuo: la
     * aplicación de eventos deduplica por request_id.
     */
    pub async fn recover_stalled_jobs(
        &self,
        now: DateTime<Utc>,
        stall_threshold_seconds: i64,
    ) -> Result<u64, DbError> {
        let database_connection = self.database_client.get_connection()?;
        let stall_horizon = now - Duration::seconds(stall_threshold_seconds);

        let recovered_count = database_connection
            .execute(
                "UPDATE usage_jobs SET status = 'pending'
                 WHERE status = 'processing' AND created_at <= ?1",
                params![stall_horizon.to_rfc3339()],
            )
            .await?;

        Ok(recovered_count)
    }

    /// Purga trabajos muertos más antiguos que la retención de 7 días.
    pub async fn purge_expired_dead_jobs(&self, now: DateTime<Utc>) -> Result<u64, DbError> {
        let database_connection = self.database_client.get_connection()?;
        let expiration_threshold = now - Duration::days(DEAD_JOB_RETENTION_DAYS);

        let purged_count = database_connection
            .execute(
                "DELETE FROM usage_jobs
                 WHERE status = 'dead' AND dead_lettered_at <= ?1",
                params![expiration_threshold.to_rfc3339()],
            )
            .await?;

        Ok(purged_count)
    }

    /// Inventario de trabajos muertos (herramienta de operador).
    pub async fn list_dead_jobs(&self, limit: i64) -> Result<Vec<(String, String)>, DbError> {
        let database_connection = self.database_client.get_connection()?;

        let mut query_results = database_connection
            .query(
                "SELECT id, COALESCE(last_error, '') FROM usage_jobs
                 WHERE status = 'dead'
                 ORDER BY dead_lettered_at DESC
                 LIMIT ?1",
                params![limit],
            )
            .await?;

        let mut dead_collection = Vec::new();
        while let Some(data_row) = query_results.next().await? {
            dead_collection.push((data_row.get::<String>(0)?, data_row.get::<String>(1)?));
        }

        Ok(dead_collection)
    }

    // --- ESTRATO DE AGREGACIÓN DIARIA ---

    /**
     * Aplica un lote completo contra el Ledger Durable.
     *
     * # Logic:
     * Agrupa por (principal, fecha UTC); cada grupo ejecuta una única
     * transacción: INSERT OR IGNORE por evento y upsert del agregado
     * con los deltas de las filas realmente insertadas. Un lote
     * reintentado tras éxito parcial solo aplica los grupos faltantes.
     */
    #[instrument(skip(self, events), fields(volume = events.len()))]
    pub async fn apply_event_batch(
        &self,
        events: &[RequestEvent],
    ) -> Result<BatchApplication, DbError> {
        let mut grouped_events: BTreeMap<(String, String, String), Vec<&RequestEvent>> =
            BTreeMap::new();

        for event in events {
            let group_key = (
                event.owner.variant_label().to_string(),
                event.owner.identifier().to_string(),
                event.utc_date_stamp(),
            );
            grouped_events.entry(group_key).or_default().push(event);
        }

        let mut application_stats = BatchApplication::default();
        let database_connection = self.database_client.get_connection()?;

        for ((owner_type, owner_identifier, usage_date), group_events) in grouped_events {
            let group_transaction = database_connection
                .transaction()
                .await
                .map_err(|_| DbError::TransactionError)?;

            let mut group_delta = UsageDaily::default();

            for event in &group_events {
                if insert_event_in_transaction(&group_transaction, event).await? {
                    group_delta.absorb(event);
                    application_stats.inserted_events += 1;
                } else {
                    application_stats.duplicate_events += 1;
                }
            }

            if group_delta.request_count > 0 {
                group_transaction
                    .execute(
                        "INSERT INTO usage_daily (
                            owner_type, owner_id, usage_date, request_count,
                            success_count, error_count, input_tokens, output_tokens,
                            cost_cents, allowance_used
                         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                         ON CONFLICT(owner_type, owner_id, usage_date) DO UPDATE SET
                            request_count = request_count + excluded.request_count,
                            success_count = success_count + excluded.success_count,
                            error_count = error_count + excluded.error_count,
                            input_tokens = input_tokens + excluded.input_tokens,
                            output_tokens = output_tokens + excluded.output_tokens,
                            cost_cents = cost_cents + excluded.cost_cents,
                            allowance_used = allowance_used + excluded.allowance_used",
                        params![
                            owner_type,
                            owner_identifier,
                            usage_date,
                            group_delta.request_count,
                            group_delta.success_count,
                            group_delta.error_count,
                            group_delta.input_tokens,
                            group_delta.output_tokens,
                            group_delta.cost_cents,
                            group_delta.allowance_used,
                        ],
                    )
                    .await?;
            }

            group_transaction.commit().await.map_err(|_| DbError::TransactionError)?;
        }

        Ok(application_stats)
    }

    /// Agregado diario de un principal para una fecha (`YYYY-MM-DD`).
    pub async fn fetch_daily(
        &self,
        owner: &OwnerRef,
        usage_date: &str,
    ) -> Result<Option<UsageDaily>, DbError> {
        let database_connection = self.database_client.get_connection()?;

        let mut query_results = database_connection
            .query(
                "SELECT request_count, success_count, error_count, input_tokens,
                        output_tokens, cost_cents, allowance_used
                 FROM usage_daily
                 WHERE owner_type = ?1 AND owner_id = ?2 AND usage_date = ?3",
                params![owner.variant_label(), owner.identifier(), usage_date],
            )
            .await?;

        let data_row = match query_results.next().await? {
            Some(row) => row,
            None => return Ok(None),
        };

        Ok(Some(UsageDaily {
            request_count: data_row.get::<i64>(0)?,
            success_count: data_row.get::<i64>(1)?,
            error_count: data_row.get::<i64>(2)?,
            input_tokens: data_row.get::<i64>(3)?,
            output_tokens: data_row.get::<i64>(4)?,
            cost_cents: data_row.get::<i64>(5)?,
            allowance_used: data_row.get::<i64>(6)?,
        }))
    }
}
