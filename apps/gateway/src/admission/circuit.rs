// [apps/gateway/src/admission/circuit.rs]
/*!
 * =================================================================
 * APARATO: PROVIDER CIRCUIT BREAKER (V4.4 - GATEWAY MASTER)
 * CLASIFICACIÓN: ADMISSION STRATUM (ESTRATO L4)
 * RESPONSABILIDAD: LATCH DE SALUD POR PROVEEDOR (CLOSED/OPEN/HALF-OPEN)
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. PURE CORE, THIN IO: Las transiciones son funciones puras sobre el
 *    blob JSON; el estrato caliente solo transporta el estado con TTL
 *    de seguridad 2x la ventana de reinicio.
 * 2. PROBE DISCIPLINE: open -> half-open admite exactamente la
 *    petición que cruza next_retry; las concurrentes en half-open se
 *    rechazan hasta el veredicto de la sonda.
 * 3. FAIL-OPEN ON HOT FAULTS: Sin estrato caliente no hay latch; el
 *    tráfico fluye con warning.
 * =================================================================
 */

use crate::errors::GatewayError;
use chrono::Utc;
use omniway_infra_hotstate::{keys, HotStateClient};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

/// Fallas consecutivas que abren el circuito.
pub const FAILURE_THRESHOLD: i64 = 50;
/// Ventana de reinicio antes de la sonda half-open (milisegundos).
pub const RESET_WINDOW_MILLISECONDS: i64 = 30_000;
/// TTL de seguridad del blob: 2x la ventana de reinicio.
const BLOB_SAFETY_TTL_SECONDS: u64 = (2 * RESET_WINDOW_MILLISECONDS / 1000) as u64;

/// Estados del latch por proveedor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitStatus {
    Closed,
    Open,
    HalfOpen,
}

/// Blob JSON persistido bajo `circuit:{provider}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitBlob {
    pub status: CircuitStatus,
    pub failures: i64,
    pub last_failure_epoch_ms: i64,
    pub next_retry_epoch_ms: i64,
}

impl Default for CircuitBlob {
    fn default() -> Self {
        CircuitBlob {
            status: CircuitStatus::Closed,
            failures: 0,
            last_failure_epoch_ms: 0,
            next_retry_epoch_ms: 0,
        }
    }
}

/// Veredicto de admisión del latch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitVerdict {
    /// Circuito cerrado: tráfico nominal.
    Admit,
    /// Transición open -> half-open: esta petición es la sonda.
    AdmitProbe,
    /// Circuito abierto o sonda en vuelo: rechazo 503.
    Deny,
}

/**
 * Transición pura de admisión. Retorna el veredicto y, si corresponde,
 * el blob a persistir (transición open -> half-open).
 */
pub fn evaluate_admission(blob: &CircuitBlob, now_epoch_ms: i64) -> (CircuitVerdict, Option<CircuitBlob>) {
    match blob.status {
        CircuitStatus::Closed => (CircuitVerdict::Admit, None),
        CircuitStatus::Open => {
            if now_epoch_ms >= blob.next_retry_epoch_ms {
                let mut probing_blob = blob.clone();
                probing_blob.status = CircuitStatus::HalfOpen;
                (CircuitVerdict::AdmitProbe, Some(probing_blob))
            } else {
                (CircuitVerdict::Deny, None)
            }
        }
        // Sonda en vuelo: el resto espera su veredicto.
        CircuitStatus::HalfOpen => (CircuitVerdict::Deny, None),
    }
}

/// Transición pura ante falla contabilizable.
pub fn register_failure(blob: &CircuitBlob, now_epoch_ms: i64) -> CircuitBlob {
    match blob.status {
        CircuitStatus::Closed => {
            let failures = blob.failures + 1;
            if failures >= FAILURE_THRESHOLD {
                CircuitBlob {
                    status: CircuitStatus::Open,
                    failures,
                    last_failure_epoch_ms: now_epoch_ms,
                    next_retry_epoch_ms: now_epoch_ms + RESET_WINDOW_MILLISECONDS,
                }
            } else {
                CircuitBlob {
                    status: CircuitStatus::Closed,
                    failures,
                    last_failure_epoch_ms: now_epoch_ms,
                    next_retry_epoch_ms: 0,
                }
            }
        }
        // La sonda falló: ventana de reinicio fresca.
        CircuitStatus::HalfOpen | CircuitStatus::Open => CircuitBlob {
            status: CircuitStatus::Open,
            failures: blob.failures + 1,
            last_failure_epoch_ms: now_epoch_ms,
            next_retry_epoch_ms: now_epoch_ms + RESET_WINDOW_MILLISECONDS,
        },
    }
}

/// Latch de salud respaldado por el estrato caliente.
pub struct CircuitBreakerService {
    hot_state: HotStateClient,
}

impl CircuitBreakerService {
    pub fn new(hot_state: HotStateClient) -> Self {
        Self { hot_state }
    }

    /**
     * Evalúa la admisión hacia un proveedor. Deny => 503
     * circuit_breaker_open sin tocar la facturación ni el upstream.
     */
    #[instrument(skip(self))]
    pub async fn admit(&self, provider_name: &str) -> Result<(), GatewayError> {
        let circuit_key = keys::circuit_key(provider_name);

        let blob = match self.hot_state.get_string(&circuit_key).await {
            Ok(Some(raw_blob)) => match serde_json::from_str::<CircuitBlob>(&raw_blob) {
                Ok(blob) => blob,
                Err(_) => {
                    let _ = self.hot_state.delete_key(&circuit_key).await;
                    return Ok(());
                }
            },
            Ok(None) => return Ok(()),
            Err(hot_fault) => {
                warn!("⚠️ [CIRCUIT_FAIL_OPEN]: Hot strata degraded, admitting: {}", hot_fault);
                return Ok(());
            }
        };

        let (verdict, transition) = evaluate_admission(&blob, Utc::now().timestamp_millis());

        if let Some(probing_blob) = transition {
            info!("🔦 [CIRCUIT]: '{}' transitioning open -> half-open (probe).", provider_name);
            self.persist_blob(&circuit_key, &probing_blob).await;
        }

        match verdict {
            CircuitVerdict::Admit | CircuitVerdict::AdmitProbe => Ok(()),
            CircuitVerdict::Deny => {
                Err(GatewayError::CircuitOpen { provider: provider_name.to_string() })
            }
        }
    }

    /// Éxito upstream: el contador consecutivo muere con la clave.
    #[instrument(skip(self))]
    pub async fn record_success(&self, provider_name: &str) {
        if let Err(hot_fault) =
            self.hot_state.delete_key(&keys::circuit_key(provider_name)).await
        {
            warn!("⚠️ [CIRCUIT]: Success reset degraded: {}", hot_fault);
        }
    }

    /// Falla contabilizable: estatus >= 500, 429, timeout o aborto.
    #[instrument(skip(self))]
    pub async fn record_failure(&self, provider_name: &str) {
        let circuit_key = keys::circuit_key(provider_name);

        let current_blob = match self.hot_state.get_string(&circuit_key).await {
            Ok(Some(raw_blob)) => {
                serde_json::from_str::<CircuitBlob>(&raw_blob).unwrap_or_default()
            }
            Ok(None) => CircuitBlob::default(),
            Err(hot_fault) => {
                warn!("⚠️ [CIRCUIT]: Failure accounting degraded: {}", hot_fault);
                return;
            }
        };

        let next_blob = register_failure(&current_blob, Utc::now().timestamp_millis());

        if next_blob.status == CircuitStatus::Open && current_blob.status != CircuitStatus::Open {
            warn!(
                "🛑 [CIRCUIT]: '{}' OPEN after {} consecutive failures. Retry in {} ms.",
                provider_name, next_blob.failures, RESET_WINDOW_MILLISECONDS
            );
        }

        self.persist_blob(&circuit_key, &next_blob).await;
    }

    async fn persist_blob(&self, circuit_key: &str, blob: &CircuitBlob) {
        if let Ok(serialized_blob) = serde_json::to_string(blob) {
            if let Err(hot_fault) = self
                .hot_state
                .set_string_with_ttl(circuit_key, &serialized_blob, BLOB_SAFETY_TTL_SECONDS)
                .await
            {
                warn!("⚠️ [CIRCUIT]: Blob persistence degraded: {}", hot_fault);
            }
        }
    }
}
