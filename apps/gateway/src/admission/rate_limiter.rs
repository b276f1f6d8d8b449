// [apps/gateway/src/admission/rate_limiter.rs]
/*!
 * =================================================================
 * APARATO: RATE LIMITER & CONCURRENCY SLOTS (V4.4 - GATEWAY MASTER)
 * CLASIFICACIÓN: ADMISSION STRATUM (ESTRATO L4)
 * RESPONSABILIDAD: VENTANAS FIJAS ATÓMICAS Y SLOTS CONCURRENTES
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. DENY-WITHOUT-INCREMENT: La denegación jamás consume cupo; el
 *    script lee las tres ventanas antes de mutar cualquiera.
 * 2. FAIL-OPEN DOCTRINE: Caídas del estrato caliente permiten el
 *    tráfico con warning; la admisión no se vuelve acantilado.
 * 3. SELF-HEALING SLOTS: El TTL de seguridad de 300 s auto-drena los
 *    slots filtrados por releases perdidos.
 *
 * # Mathematical Proof (Fixed Window Boundary):
 * bucket = floor(now / w); la clave expira en w - (now mod w) + 1 s.
 * Una ráfaga en la frontera puede duplicar brevemente el cupo: el
 * trade-off aceptado a cambio de atomicidad O(1) por petición.
 * =================================================================
 */

use crate::errors::GatewayError;
use chrono::Utc;
use omniway_domain_models::owner::OwnerRef;
use omniway_domain_models::policy::Policy;
use omniway_infra_hotstate::scripts::{
    verdict_elements, verdict_int, verdict_string, ScriptVerdict,
};
use omniway_infra_hotstate::{keys, ScriptVault};
use std::sync::Arc;
use tracing::{instrument, warn};

/// Ventanas fijas selladas (segundos).
pub const WINDOW_SIZES_SECONDS: [i64; 3] = [60, 3600, 86_400];
/// TTL de seguridad de los slots concurrentes.
const CONCURRENCY_SAFETY_TTL_SECONDS: i64 = 300;

/// Veredicto de las tres ventanas para una petición.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateDecision {
    pub allowed: bool,
    /// Ventana agotada (`minute|hour|day`) o None.
    pub limited_by: Option<String>,
    pub minute_remaining: i64,
    pub hour_remaining: i64,
    pub day_remaining: i64,
    /// Epochs UTC de reinicio por ventana.
    pub minute_reset_epoch: i64,
    pub hour_reset_epoch: i64,
    pub day_reset_epoch: i64,
}

impl RateDecision {
    /// Veredicto totalmente abierto (síntesis fail-open).
    pub fn fail_open(policy: &Policy, now_epoch: i64) -> Self {
        let resets = window_reset_epochs(now_epoch);
        RateDecision {
            allowed: true,
            limited_by: None,
            minute_remaining: policy.requests_per_minute,
            hour_remaining: policy.requests_per_hour,
            day_remaining: policy.requests_per_day,
            minute_reset_epoch: resets[0],
            hour_reset_epoch: resets[1],
            day_reset_epoch: resets[2],
        }
    }

    /// (límite, restante, reset) de la ventana más estrecha: la de
    /// menor cupo restante; empates resuelven hacia la más corta.
    pub fn tightest_window(&self, policy: &Policy) -> (i64, i64, i64) {
        let candidate_windows = [
            (policy.requests_per_minute, self.minute_remaining, self.minute_reset_epoch),
            (policy.requests_per_hour, self.hour_remaining, self.hour_reset_epoch),
            (policy.requests_per_day, self.day_remaining, self.day_reset_epoch),
        ];

        candidate_windows
            .into_iter()
            .min_by_key(|(_, remaining, _)| *remaining)
            .expect("three windows always present")
    }

    /// Segundos hasta el reinicio de la ventana agotada.
    pub fn retry_after_seconds(&self, now_epoch: i64) -> i64 {
        let reset_epoch = match self.limited_by.as_deref() {
            Some("minute") => self.minute_reset_epoch,
            Some("hour") => self.hour_reset_epoch,
            Some("day") => self.day_reset_epoch,
            _ => self.minute_reset_epoch,
        };
        (reset_epoch - now_epoch).max(1)
    }
}

/// Epochs de reinicio [minuto, hora, día] para `now`.
pub fn window_reset_epochs(now_epoch: i64) -> [i64; 3] {
    [
        (now_epoch / 60 + 1) * 60,
        (now_epoch / 3600 + 1) * 3600,
        (now_epoch / 86_400 + 1) * 86_400,
    ]
}

/// Resultado de la adquisición de un slot concurrente.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotGrant {
    /// Slot adquirido; debe liberarse en el desenlace terminal.
    Granted { active_slots: i64 },
    /// Estrato caliente caído: tráfico admitido sin contabilidad.
    FailOpen,
}

/// Enforcement atómico de ventanas y slots sobre el estrato caliente.
pub struct RateLimiterService {
    script_vault: Arc<ScriptVault>,
}

impl RateLimiterService {
    pub fn new(script_vault: Arc<ScriptVault>) -> Self {
        Self { script_vault }
    }

    /**
     * Evalúa las tres ventanas fijas en un solo round-trip atómico.
     */
    #[instrument(skip(self, policy), fields(owner = %owner))]
    pub async fn check_rate(&self, owner: &OwnerRef, policy: &Policy) -> RateDecision {
        let now_epoch = Utc::now().timestamp();
        let resets = window_reset_epochs(now_epoch);

        let window_keys: Vec<String> = WINDOW_SIZES_SECONDS
            .iter()
            .map(|window| keys::rate_limit_key(owner, *window, now_epoch / window))
            .collect();

        let script_args: Vec<String> = vec![
            policy.requests_per_minute.to_string(),
            policy.requests_per_hour.to_string(),
            policy.requests_per_day.to_string(),
            (resets[0] - now_epoch + 1).to_string(),
            (resets[1] - now_epoch + 1).to_string(),
            (resets[2] - now_epoch + 1).to_string(),
        ];

        let verdict = match self.script_vault.invoke("rate_limit", &window_keys, &script_args).await
        {
            Ok(verdict) => verdict,
            Err(hot_fault) => {
                warn!("⚠️ [RATE_FAIL_OPEN]: Hot strata degraded, admitting: {}", hot_fault);
                return RateDecision::fail_open(policy, now_epoch);
            }
        };

        match decode_rate_verdict(&verdict, resets) {
            Ok(decision) => decision,
            Err(decode_fault) => {
                warn!("⚠️ [RATE_FAIL_OPEN]: Verdict undecodable, admitting: {}", decode_fault);
                RateDecision::fail_open(policy, now_epoch)
            }
        }
    }

    /**
     * Adquiere un slot concurrente. Denegación => 429 sin mutación.
     */
    #[instrument(skip(self), fields(owner = %owner))]
    pub async fn acquire_slot(
        &self,
        owner: &OwnerRef,
        max_concurrent: i64,
        request_identifier: &str,
    ) -> Result<SlotGrant, GatewayError> {
        let script_keys =
            vec![keys::concurrency_key(owner), keys::concurrency_registry_key(owner)];
        let script_args = vec![
            "acquire".to_string(),
            max_concurrent.to_string(),
            request_identifier.to_string(),
            CONCURRENCY_SAFETY_TTL_SECONDS.to_string(),
            Utc::now().timestamp().to_string(),
        ];

        let verdict = match self.script_vault.invoke("concurrency", &script_keys, &script_args).await
        {
            Ok(verdict) => verdict,
            Err(hot_fault) => {
                warn!("⚠️ [CONCURRENCY_FAIL_OPEN]: Hot strata degraded, admitting: {}", hot_fault);
                return Ok(SlotGrant::FailOpen);
            }
        };

        let elements = verdict_elements(&verdict)
            .map_err(|decode_fault| GatewayError::Internal(decode_fault.to_string()))?;
        let granted = verdict_int(&elements[0])
            .map_err(|decode_fault| GatewayError::Internal(decode_fault.to_string()))?;
        let active_slots = verdict_int(&elements[1])
            .map_err(|decode_fault| GatewayError::Internal(decode_fault.to_string()))?;

        if granted == 1 {
            Ok(SlotGrant::Granted { active_slots })
        } else {
            Err(GatewayError::ConcurrencyExceeded { limit: max_concurrent })
        }
    }

    /// Libera un slot (best-effort; el TTL de seguridad cubre fallos).
    #[instrument(skip(self), fields(owner = %owner))]
    pub async fn release_slot(&self, owner: &OwnerRef, request_identifier: &str) {
        let script_keys =
            vec![keys::concurrency_key(owner), keys::concurrency_registry_key(owner)];
        let script_args = vec![
            "release".to_string(),
            "0".to_string(),
            request_identifier.to_string(),
            CONCURRENCY_SAFETY_TTL_SECONDS.to_string(),
            "0".to_string(),
        ];

        if let Err(release_fault) =
            self.script_vault.invoke("concurrency", &script_keys, &script_args).await
        {
            warn!("⚠️ [CONCURRENCY]: Slot release degraded (safety TTL will heal): {}", release_fault);
        }
    }
}

fn decode_rate_verdict(
    verdict: &ScriptVerdict,
    resets: [i64; 3],
) -> Result<RateDecision, GatewayError> {
    let elements =
        verdict_elements(verdict).map_err(|fault| GatewayError::Internal(fault.to_string()))?;

    if elements.len() != 5 {
        return Err(GatewayError::Internal("rate verdict arity mismatch".into()));
    }

    let allowed =
        verdict_int(&elements[0]).map_err(|fault| GatewayError::Internal(fault.to_string()))? == 1;
    let limited_by_label =
        verdict_string(&elements[1]).map_err(|fault| GatewayError::Internal(fault.to_string()))?;

    Ok(RateDecision {
        allowed,
        limited_by: if limited_by_label == "none" { None } else { Some(limited_by_label) },
        minute_remaining: verdict_int(&elements[2])
            .map_err(|fault| GatewayError::Internal(fault.to_string()))?
            .max(0),
        hour_remaining: verdict_int(&elements[3])
            .map_err(|fault| GatewayError::Internal(fault.to_string()))?
            .max(0),
        day_remaining: verdict_int(&elements[4])
            .map_err(|fault| GatewayError::Internal(fault.to_string()))?
            .max(0),
        minute_reset_epoch: resets[0],
        hour_reset_epoch: resets[1],
        day_reset_epoch: resets[2],
    })
}
