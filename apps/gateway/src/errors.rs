// [apps/gateway/src/errors.rs]
/*!
 * =================================================================
 * APARATO: GATEWAY ERROR AUTHORITY (V4.3 - GATEWAY MASTER)
 * CLASIFICACIÓN: API ADAPTER LAYER (ESTRATO L4)
 * RESPONSABILIDAD: TAXONOMÍA DE FALLOS Y RENDERIZADO OPENAI-COMPATIBLE
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. SINGLE SHAPE DOCTRINE: Toda falla del gateway emite exactamente
 *    {error:{message,type,code,param?},request_id}; los rechazos de
 *    proveedor conservan su message/type/code cuando son parseables.
 * 2. STATUS TABLE PARITY: El mapeo estatus -> (type, code) respeta la
 *    tabla sellada: 400 bad_request, 401 invalid_api_key, 402 billing,
 *    403 permission, 404 not_found, 409 idempotency, 429 rate limit,
 *    5xx api/service_unavailable.
 * =================================================================
 */

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use omniway_infra_provider::ProviderError;
use serde_json::json;
use thiserror::Error;

/// Sub-causas de fallo de autenticación.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    /// Header ausente, sin esquema Bearer o sin prefijo `omni_`.
    InvalidFormat,
    /// Huella desconocida o propietario irresoluble.
    Invalid,
    /// Clave desactivada o revocada.
    Inactive,
    /// Clave más allá de su expiración.
    Expired,
    /// IP de origen fuera de la allowlist de la clave.
    IpNotAllowed,
}

impl AuthFailure {
    fn message(&self) -> &'static str {
        match self {
            AuthFailure::InvalidFormat => "Malformed Authorization header: expected 'Bearer omni_...'",
            AuthFailure::Invalid => "Invalid API key",
            AuthFailure::Inactive => "API key is inactive or has been revoked",
            AuthFailure::Expired => "API key has expired",
            AuthFailure::IpNotAllowed => "Request IP is not in the key allowlist",
        }
    }
}

/// Taxonomía completa de fallos terminales del pipeline.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("auth rejection")]
    Auth(AuthFailure),

    #[error("rate window '{window}' exhausted")]
    RateLimited { window: String, retry_after_seconds: i64 },

    #[error("concurrency slots exhausted")]
    ConcurrencyExceeded { limit: i64 },

    #[error("invalid request: {message}")]
    InvalidRequest { message: String, param: Option<String> },

    #[error("permission denied: {message}")]
    PermissionDenied { message: String, code: &'static str, param: Option<String> },

    #[error("model '{model}' not found")]
    ModelNotFound { model: String },

    #[error("model '{model}' inactive")]
    ModelInactive { model: String },

    #[error("wallet locked")]
    WalletLocked,

    #[error("insufficient wallet balance")]
    InsufficientWallet { wallet_balance_cents: i64, required_cents: i64 },

    #[error("billing durable layer unavailable")]
    BillingUnavailable,

    #[error("circuit open for provider '{provider}'")]
    CircuitOpen { provider: String },

    #[error("idempotent replay rejected")]
    IdempotentReplay,

    #[error("upstream rejection HTTP {status}")]
    Upstream {
        status: u16,
        message: String,
        error_type: Option<String>,
        error_code: Option<String>,
    },

    #[error("upstream read deadline exceeded")]
    UpstreamTimeout,

    #[error("provider '{provider}' is not configured")]
    ProviderUnconfigured { provider: String },

    #[error("internal collapse: {0}")]
    Internal(String),
}

impl GatewayError {
    /// Adopta un fallo del enlace upstream conservando su detalle.
    pub fn from_provider(provider_fault: ProviderError) -> Self {
        match provider_fault {
            ProviderError::UpstreamRejection { status, message, error_type, error_code } => {
                GatewayError::Upstream { status, message, error_type, error_code }
            }
            ProviderError::ReadTimeout(_) => GatewayError::UpstreamTimeout,
            ProviderError::ConfigError(provider) => GatewayError::ProviderUnconfigured { provider },
            ProviderError::NetworkError(network_fault) => GatewayError::Upstream {
                status: 502,
                message: format!("upstream network failure: {}", network_fault),
                error_type: None,
                error_code: None,
            },
            ProviderError::DecodeError(detail) => GatewayError::Internal(detail),
        }
    }

    /// Estatus HTTP del veredicto.
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::Auth(_) => StatusCode::UNAUTHORIZED,
            GatewayError::RateLimited { .. } | GatewayError::ConcurrencyExceeded { .. } => {
                StatusCode::TOO_MANY_REQUESTS
            }
            GatewayError::InvalidRequest { .. } => StatusCode::BAD_REQUEST,
            GatewayError::PermissionDenied { .. } => StatusCode::FORBIDDEN,
            GatewayError::ModelNotFound { .. } => StatusCode::NOT_FOUND,
            GatewayError::ModelInactive { .. }
            | GatewayError::BillingUnavailable
            | GatewayError::CircuitOpen { .. }
            | GatewayError::ProviderUnconfigured { .. } => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::WalletLocked | GatewayError::InsufficientWallet { .. } => {
                StatusCode::PAYMENT_REQUIRED
            }
            GatewayError::IdempotentReplay => StatusCode::CONFLICT,
            GatewayError::Upstream { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            GatewayError::UpstreamTimeout => StatusCode::GATEWAY_TIMEOUT,
            GatewayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Tripleta (type, code, param) del cuerpo de error.
    fn error_shape(&self) -> (String, String, Option<String>) {
        match self {
            GatewayError::Auth(_) => {
                ("authentication_error".into(), "invalid_api_key".into(), None)
            }
            GatewayError::RateLimited { window, .. } => (
                "rate_limit_error".into(),
                "rate_limit_exceeded".into(),
                Some(window.clone()),
            ),
            GatewayError::ConcurrencyExceeded { .. } => {
                ("rate_limit_error".into(), "concurrency_limit_exceeded".into(), None)
            }
            GatewayError::InvalidRequest { param, .. } => {
                ("invalid_request_error".into(), "bad_request".into(), param.clone())
            }
            GatewayError::PermissionDenied { code, param, .. } => {
                ("permission_error".into(), (*code).into(), param.clone())
            }
            GatewayError::ModelNotFound { .. } => {
                ("not_found_error".into(), "not_found".into(), None)
            }
            GatewayError::ModelInactive { .. } => {
                ("service_unavailable_error".into(), "model_inactive".into(), None)
            }
            GatewayError::WalletLocked => {
                ("billing_error".into(), "dispute_pending".into(), None)
            }
            GatewayError::InsufficientWallet { .. } => {
                ("billing_error".into(), "payment_required".into(), None)
            }
            GatewayError::BillingUnavailable => {
                ("service_unavailable_error".into(), "billing_unavailable".into(), None)
            }
            GatewayError::CircuitOpen { .. } => {
                ("service_unavailable_error".into(), "circuit_breaker_open".into(), None)
            }
            GatewayError::ProviderUnconfigured { .. } => {
                ("service_unavailable_error".into(), "provider_unavailable".into(), None)
            }
            GatewayError::IdempotentReplay => {
                ("idempotency_error".into(), "request_replayed".into(), None)
            }
            GatewayError::Upstream { error_type, error_code, .. } => (
                error_type.clone().unwrap_or_else(|| "api_error".into()),
                error_code.clone().unwrap_or_else(|| "upstream_error".into()),
                None,
            ),
            GatewayError::UpstreamTimeout => {
                ("api_error".into(), "upstream_timeout".into(), None)
            }
            GatewayError::Internal(_) => ("api_error".into(), "internal_error".into(), None),
        }
    }

    fn client_message(&self) -> String {
        match self {
            GatewayError::Auth(auth_failure) => auth_failure.message().to_string(),
            GatewayError::RateLimited { window, retry_after_seconds } => format!(
                "Rate limit exceeded for the {} window. Retry after {} seconds.",
                window, retry_after_seconds
            ),
            GatewayError::ConcurrencyExceeded { limit } => {
                format!("Concurrency limit of {} simultaneous requests exceeded.", limit)
            }
            GatewayError::InvalidRequest { message, .. } => message.clone(),
            GatewayError::PermissionDenied { message, .. } => message.clone(),
            GatewayError::ModelNotFound { model } => format!("Model '{}' does not exist.", model),
            GatewayError::ModelInactive { model } => {
                format!("Model '{}' is temporarily unavailable.", model)
            }
            GatewayError::WalletLocked => {
                "Wallet is locked pending dispute resolution.".to_string()
            }
            GatewayError::InsufficientWallet { wallet_balance_cents, required_cents } => format!(
                "Insufficient wallet balance: {} cents available, {} cents required.",
                wallet_balance_cents, required_cents
            ),
            GatewayError::BillingUnavailable => {
                "Billing is temporarily unavailable. No charge was applied.".to_string()
            }
            GatewayError::CircuitOpen { provider } => format!(
                "Upstream provider '{}' is temporarily unavailable (circuit open).",
                provider
            ),
            GatewayError::ProviderUnconfigured { provider } => {
                format!("Upstream provider '{}' is not configured.", provider)
            }
            GatewayError::IdempotentReplay => {
                "This request id was already processed; streaming responses cannot be replayed."
                    .to_string()
            }
            GatewayError::Upstream { message, .. } => message.clone(),
            GatewayError::UpstreamTimeout => "Upstream provider timed out.".to_string(),
            GatewayError::Internal(_) => "Internal server error.".to_string(),
        }
    }

    /**
     * Renderiza el veredicto como respuesta OpenAI-compatible.
     * Las variantes financieras adjuntan sus magnitudes al nivel raíz.
     */
    pub fn render(&self, request_identifier: &str) -> Response {
        let (error_type, error_code, error_param) = self.error_shape();

        let mut body = json!({
            "error": {
                "message": self.client_message(),
                "type": error_type,
                "code": error_code,
            },
            "request_id": request_identifier,
        });

        if let Some(param) = error_param {
            body["error"]["param"] = json!(param);
        }

        if let GatewayError::InsufficientWallet { wallet_balance_cents, required_cents } = self {
            body["wallet_balance_cents"] = json!(wallet_balance_cents);
            body["required_cents"] = json!(required_cents);
        }

        let mut response = (self.status_code(), Json(body)).into_response();

        if let GatewayError::RateLimited { retry_after_seconds, .. } = self {
            if let Ok(header_value) = HeaderValue::from_str(&retry_after_seconds.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, header_value);
            }
        }

        response
    }
}
