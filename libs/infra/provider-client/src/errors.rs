// [libs/infra/provider-client/src/errors.rs]
/*!
 * =================================================================
 * APARATO: PROVIDER ERROR CATALOG (V4.0 - GATEWAY MASTER)
 * CLASIFICACIÓN: INFRASTRUCTURE CORE (ESTRATO L3)
 * RESPONSABILIDAD: CATALOGACIÓN SEMÁNTICA DE FALLOS UPSTREAM
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. CIRCUIT AWARENESS: El consumidor clasifica las variantes en
 *    contabilizables (>=500, 429, timeout, aborto) o neutras (4xx
 *    ordinarios) para el circuit breaker; el catálogo solo describe.
 * 2. PASSTHROUGH FIDELITY: 'UpstreamRejection' transporta el
 *    message/type/code original del proveedor cuando es parseable.
 * =================================================================
 */

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProviderError {
    /// Proveedor desconocido o configuración ausente en el registro.
    #[error("[L3_PROVIDER_CONFIG_FAULT]: PROVIDER_UNDEFINED -> {0}")]
    ConfigError(String),

    /// Fallo físico de red o de protocolo HTTP.
    #[error("[L3_PROVIDER_NET_FAULT]: UPLINK_SEVERED -> {0}")]
    NetworkError(#[from] reqwest::Error),

    /// El proveedor rechazó la petición con un estatus no-2xx.
    #[error("[L3_PROVIDER_REJECTION]: HTTP_{status} -> {message}")]
    UpstreamRejection {
        status: u16,
        message: String,
        error_type: Option<String>,
        error_code: Option<String>,
    },

    /// El temporizador de lectura expiró antes de la respuesta completa.
    #[error("[L3_PROVIDER_TIMEOUT]: READ_DEADLINE_EXCEEDED after {0} s")]
    ReadTimeout(u64),

    /// El cuerpo 2xx del proveedor no respeta el contrato esperado.
    #[error("[L3_PROVIDER_DECODE_FAULT]: RESPONSE_MALFORMED -> {0}")]
    DecodeError(String),
}

impl ProviderError {
    /// Un fallo contabilizable empuja el circuit breaker hacia 'open'.
    /// Los 4xx distintos de 429 jamás cuentan.
    pub fn counts_toward_circuit(&self) -> bool {
        match self {
            ProviderError::UpstreamRejection { status, .. } => *status >= 500 || *status == 429,
            ProviderError::NetworkError(_) | ProviderError::ReadTimeout(_) => true,
            ProviderError::ConfigError(_) | ProviderError::DecodeError(_) => false,
        }
    }
}
