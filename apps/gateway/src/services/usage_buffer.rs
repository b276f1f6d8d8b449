// [apps/gateway/src/services/usage_buffer.rs]
/*!
 * =================================================================
 * APARATO: USAGE BUFFER & FLUSH DAEMON (V4.3 - GATEWAY MASTER)
 * CLASIFICACIÓN: BACKGROUND INFRASTRUCTURE SERVICE (ESTRATO L4)
 * RESPONSABILIDAD: BUFFER EN RAM -> COLA DURABLE DE EVENTOS DE USO
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. DUAL TRIGGER: Volcado por volumen (>= 100 eventos) vía Notify o
 *    por tiempo (cada 5 s) vía timer con ticks perdidos ignorados.
 * 2. ZERO SILENT LOSS: Un colapso del encolado re-inyecta el lote al
 *    buffer; los eventos solo abandonan la RAM hacia la cola durable.
 * 3. ATOMIC DRAIN: Patrón Take & Clear para minimizar el tiempo de
 *    cerrojo sobre el buffer de alta frecuencia.
 * =================================================================
 */

use omniway_domain_models::events::RequestEvent;
use omniway_infra_db::repositories::UsageRepository;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, instrument};

/// Umbral de volumen que dispara un volcado inmediato.
const FLUSH_VOLUME_THRESHOLD: usize = 100;
/// Intervalo nominal de volcado por tiempo (segundos).
const FLUSH_INTERVAL_SECONDS: u64 = 5;

/// Buffer acotado en RAM para eventos terminales de petición.
pub struct UsageBuffer {
    pending_events: Mutex<Vec<RequestEvent>>,
    volume_trigger: Notify,
    usage_repository: Arc<UsageRepository>,
}

impl UsageBuffer {
    pub fn new(usage_repository: Arc<UsageRepository>) -> Self {
        Self {
            pending_events: Mutex::new(Vec::with_capacity(FLUSH_VOLUME_THRESHOLD * 2)),
            volume_trigger: Notify::new(),
            usage_repository,
        }
    }

    /**
     * Publica un evento terminal. Al cruzar el umbral de volumen se
     * despierta al daemon sin esperar el tick de 5 s.
     */
    pub fn publish(&self, event: RequestEvent) {
        let pending_volume = {
            match self.pending_events.lock() {
                Ok(mut buffer_guard) => {
                    buffer_guard.push(event);
                    buffer_guard.len()
                }
                Err(lock_poison_fault) => {
                    error!("❌ [USAGE_BUFFER]: Lock poisoned, event lost: {}", lock_poison_fault);
                    return;
                }
            }
        };

        if pending_volume >= FLUSH_VOLUME_THRESHOLD {
            self.volume_trigger.notify_one();
        }
    }

    /// Drenaje atómico Take & Clear.
    fn drain_pending(&self) -> Vec<RequestEvent> {
        match self.pending_events.lock() {
            Ok(mut buffer_guard) => std::mem::take(&mut *buffer_guard),
            Err(lock_poison_fault) => {
                error!("❌ [USAGE_BUFFER]: Drain under poisoned lock: {}", lock_poison_fault);
                Vec::new()
            }
        }
    }

    /// Re-inyección tras colapso del encolado (sin pérdida silenciosa).
    fn reinject(&self, mut failed_batch: Vec<RequestEvent>) {
        if let Ok(mut buffer_guard) = self.pending_events.lock() {
            buffer_guard.append(&mut failed_batch);
        }
    }

    /// Ciclo de volcado: drena y cristaliza en la cola durable.
    async fn flush_once(&self) {
        let pending_batch = self.drain_pending();
        if pending_batch.is_empty() {
            return;
        }

        let batch_volume = pending_batch.len();
        match self.usage_repository.enqueue_batch(&pending_batch).await {
            Ok(job_identifier) => {
                debug!("📦 [USAGE_FLUSH]: {} events sealed as job {}.", batch_volume, job_identifier);
            }
            Err(enqueue_fault) => {
                error!(
                    "⚠️ [USAGE_FLUSH_REJECTED]: Queue unavailable, re-injecting {} events: {}",
                    batch_volume, enqueue_fault
                );
                self.reinject(pending_batch);
            }
        }
    }

    /// Drenaje sincrónico terminal (apagado controlado).
    #[instrument(skip(self))]
    pub async fn drain_for_shutdown(&self) {
        info!("🛬 [USAGE_BUFFER]: Final synchronous drain before shutdown.");
        self.flush_once().await;
    }
}

/**
 * Lanza el daemon de volcado en el reactor de Tokio.
 */
pub async fn spawn_flush_daemon(usage_buffer: Arc<UsageBuffer>) {
    let mut synchronization_timer = interval(Duration::from_secs(FLUSH_INTERVAL_SECONDS));
    synchronization_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

    tokio::spawn(async move {
        info!("💾 [USAGE_FLUSH_DAEMON]: RAM -> durable queue engine operational.");

        loop {
            tokio::select! {
                _ = synchronization_timer.tick() => {}
                _ = usage_buffer.volume_trigger.notified() => {}
            }
            usage_buffer.flush_once().await;
        }
    });
}
