// [libs/domain/models/src/policy.rs]
/*!
 * =================================================================
 * APARATO: EFFECTIVE POLICY MODEL (V4.2 - GATEWAY MASTER)
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: LÍMITES EFECTIVOS DE ADMISIÓN Y FACTURACIÓN
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. DERIVED, NEVER STORED BACK: La política se deriva de la tríada
 *    suscripción + plan + billetera y se cachea con TTL; jamás se
 *    escribe de vuelta al Ledger Durable.
 * 2. FREE FALLBACK SYNTHESIS: Ante suscripción ausente o muerta, el
 *    resolver sintetiza la política gratuita con constantes selladas.
 * =================================================================
 */

use serde::{Deserialize, Serialize};

/// Estados de suscripción que habilitan la política del plan contratado.
/// Cualquier otro estado colapsa a la política gratuita por defecto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubscriptionStatus {
    Active,
    Trialing,
    PastDue,
    Canceled,
    Incomplete,
    Unpaid,
}

impl SubscriptionStatus {
    /// Un estado facturable mantiene los límites del plan contratado.
    pub fn grants_plan_policy(&self) -> bool {
        matches!(
            self,
            SubscriptionStatus::Active | SubscriptionStatus::Trialing | SubscriptionStatus::PastDue
        )
    }
}

/// Política efectiva de un principal: la verdad operativa contra la que
/// se admite, limita y factura cada petición.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Policy {
    /// Peticiones permitidas por minuto (ventana fija de 60 s).
    pub requests_per_minute: i64,
    /// Peticiones permitidas por hora (ventana fija de 3600 s).
    pub requests_per_hour: i64,
    /// Peticiones permitidas por día (ventana fija de 86400 s).
    pub requests_per_day: i64,
    /// Peticiones gratuitas por día UTC antes de facturar billetera.
    pub daily_allowance: i64,
    /// Slots concurrentes máximos del principal.
    pub max_concurrent_requests: i64,
    /// Techo de tokens de entrada estimados.
    pub max_input_tokens: i64,
    /// Techo de tokens de salida solicitables.
    pub max_output_tokens: i64,
    /// Tamaño máximo de cuerpo aceptado en bytes.
    pub max_body_bytes: i64,
    /// Habilitación de respuestas en streaming SSE.
    pub has_streaming: bool,
    /// Habilitación de prioridad de despacho.
    pub has_priority: bool,
    /// Habilitación de facturación por billetera prepaga.
    pub has_wallet_access: bool,
    /// Allowlist de modelos del plan; vacía = todos los activos.
    pub allowed_models: Vec<String>,
    /// Estado de la suscripción que originó esta política.
    pub subscription_status: SubscriptionStatus,
    /// Bandera de billetera bloqueada por disputa.
    pub wallet_locked: bool,
}

impl Policy {
    /**
     * Sintetiza la política gratuita por defecto.
     *
     * Constantes selladas del plan libre: se aplican ante suscripción
     * ausente, cancelada o impaga.
     */
    pub fn default_free() -> Self {
        Policy {
            requests_per_minute: 10,
            requests_per_hour: 50,
            requests_per_day: 100,
            daily_allowance: 100,
            max_concurrent_requests: 2,
            max_input_tokens: 4000,
            max_output_tokens: 2000,
            max_body_bytes: 512 * 1024,
            has_streaming: true,
            has_priority: false,
            has_wallet_access: false,
            allowed_models: vec![
                "gpt-3.5-turbo".to_string(),
                "claude-3-haiku".to_string(),
            ],
            subscription_status: SubscriptionStatus::Canceled,
            wallet_locked: false,
        }
    }

    /// Evalúa la pertenencia de un modelo a la allowlist del plan.
    /// Una allowlist vacía no restringe.
    pub fn permits_model(&self, model_identifier: &str) -> bool {
        self.allowed_models.is_empty()
            || self.allowed_models.iter().any(|allowed| allowed == model_identifier)
    }
}
