// [apps/gateway/src/services/usage_worker.rs]
/*!
 * =================================================================
 * APARATO: USAGE AGGREGATION WORKER (V4.3 - GATEWAY MASTER)
 * CLASIFICACIÓN: BACKGROUND INFRASTRUCTURE SERVICE (ESTRATO L4)
 * RESPONSABILIDAD: COLA DURABLE -> EVENTOS DEDUPLICADOS + AGREGADOS
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. CONCURRENCY 5: Cinco consumidores reclaman trabajos vía UPDATE
 *    atómico; jamás comparten un lote.
 * 2. BACKOFF & DEAD-LETTER: Reintentos exponenciales (base 1 s, techo
 *    60 s); >= 3 fallas y >= 1 h de edad sellan el trabajo como
 *    muerto; la purga de muertos corre cada hora (retención 7 días).
 * =================================================================
 */

use chrono::{Duration as ChronoDuration, Utc};
use omniway_infra_db::repositories::UsageRepository;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tracing::{debug, error, info, instrument};

/// Consumidores concurrentes de la cola durable.
const WORKER_CONCURRENCY: usize = 5;
/// Pausa entre sondeos con cola vacía.
const IDLE_POLL_INTERVAL_SECONDS: u64 = 1;
/// Base del backoff exponencial (segundos).
const RETRY_BACKOFF_BASE_SECONDS: i64 = 1;
/// Techo del backoff (segundos).
const RETRY_BACKOFF_CEILING_SECONDS: i64 = 60;
/// Fallas mínimas antes de evaluar dead-letter.
const DEAD_LETTER_FAILURE_FLOOR: i64 = 3;
/// Edad mínima del trabajo antes de sellarlo muerto (segundos).
const DEAD_LETTER_AGE_FLOOR_SECONDS: i64 = 3600;

/**
 * Lanza los consumidores y el daemon de higiene de muertos.
 */
pub async fn spawn_aggregation_workers(usage_repository: Arc<UsageRepository>) {
    for worker_index in 0..WORKER_CONCURRENCY {
        let worker_repository = Arc::clone(&usage_repository);
        tokio::spawn(async move {
            info!("⚙️ [USAGE_WORKER_{}]: Aggregation consumer operational.", worker_index);
            loop {
                if !consume_one_job(&worker_repository).await {
                    sleep(Duration::from_secs(IDLE_POLL_INTERVAL_SECONDS)).await;
                }
            }
        });
    }

    let housekeeping_repository = usage_repository;
    tokio::spawn(async move {
        let mut housekeeping_timer = interval(Duration::from_secs(3600));
        housekeeping_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            housekeeping_timer.tick().await;

            match housekeeping_repository.recover_stalled_jobs(Utc::now(), 600).await {
                Ok(recovered_count) if recovered_count > 0 => {
                    info!("🩹 [USAGE_REAPER]: {} stalled jobs returned to queue.", recovered_count);
                }
                Ok(_) => {}
                Err(recovery_fault) => {
                    error!("⚠️ [USAGE_REAPER]: Stall recovery degraded: {}", recovery_fault);
                }
            }

            match housekeeping_repository.purge_expired_dead_jobs(Utc::now()).await {
                Ok(purged_count) if purged_count > 0 => {
                    info!("🧹 [USAGE_REAPER]: {} expired dead jobs purged.", purged_count);
                }
                Ok(_) => {}
                Err(purge_fault) => {
                    error!("⚠️ [USAGE_REAPER]: Dead job purge degraded: {}", purge_fault);
                }
            }
        }
    });
}

/// Reclama y procesa un trabajo. Retorna false con cola vacía.
#[instrument(skip(usage_repository))]
async fn consume_one_job(usage_repository: &Arc<UsageRepository>) -> bool {
    let now = Utc::now();

    let claimed_job = match usage_repository.claim_next_job(now).await {
        Ok(Some(job)) => job,
        Ok(None) => return false,
        Err(claim_fault) => {
            error!("⚠️ [USAGE_WORKER]: Claim degraded: {}", claim_fault);
            return false;
        }
    };

    match usage_repository.apply_event_batch(&claimed_job.events).await {
        Ok(application_stats) => {
            debug!(
                "✅ [USAGE_WORKER]: Job {} applied ({} inserted, {} duplicates).",
                claimed_job.job_identifier,
                application_stats.inserted_events,
                application_stats.duplicate_events
            );
            if let Err(seal_fault) = usage_repository.seal_job(&claimed_job.job_identifier).await {
                // El lote quedó aplicado; el re-proceso futuro es inocuo
                // gracias a la deduplicación por request_id.
                error!("⚠️ [USAGE_WORKER]: Seal degraded (idempotent retry ahead): {}", seal_fault);
            }
            true
        }
        Err(application_fault) => {
            let accumulated_failures = claimed_job.attempts + 1;
            let job_age_seconds = (now - claimed_job.created_at).num_seconds();

            if accumulated_failures >= DEAD_LETTER_FAILURE_FLOOR
                && job_age_seconds >= DEAD_LETTER_AGE_FLOOR_SECONDS
            {
                error!(
                    "💀 [USAGE_WORKER]: Job {} exhausted ({} failures, {} s old): {}",
                    claimed_job.job_identifier,
                    accumulated_failures,
                    job_age_seconds,
                    application_fault
                );
                if let Err(dead_fault) = usage_repository
                    .dead_letter_job(&claimed_job.job_identifier, &application_fault.to_string())
                    .await
                {
                    error!("🚨 [USAGE_WORKER]: Dead-letter sealing failed: {}", dead_fault);
                }
            } else {
                let backoff_seconds = (RETRY_BACKOFF_BASE_SECONDS << claimed_job.attempts.min(6))
                    .min(RETRY_BACKOFF_CEILING_SECONDS);
                let next_attempt_at = now + ChronoDuration::seconds(backoff_seconds);

                error!(
                    "🔁 [USAGE_WORKER]: Job {} failed (attempt {}). Retry in {} s: {}",
                    claimed_job.job_identifier,
                    accumulated_failures,
                    backoff_seconds,
                    application_fault
                );
                if let Err(retry_fault) = usage_repository
                    .schedule_retry(
                        &claimed_job.job_identifier,
                        next_attempt_at,
                        &application_fault.to_string(),
                    )
                    .await
                {
                    error!("🚨 [USAGE_WORKER]: Retry scheduling failed: {}", retry_fault);
                }
            }
            true
        }
    }
}
