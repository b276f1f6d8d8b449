// [libs/domain/models/src/events.rs]
/*!
 * =================================================================
 * APARATO: REQUEST EVENT & USAGE MODELS (V4.2 - GATEWAY MASTER)
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: REGISTRO TERMINAL DE PETICIONES Y AGREGADOS DIARIOS
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. AT-LEAST-ONCE READY: 'RequestEvent' es único por request_id; la
 *    tubería de uso puede reintentar lotes sin duplicar filas.
 * 2. MONOTONE AGGREGATES: 'UsageDaily' solo se incrementa con filas
 *    realmente insertadas, preservando la monotonía bajo re-aplicación.
 * =================================================================
 */

use crate::owner::OwnerRef;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Estado terminal de una petición atravesando el pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    Success,
    ClientError,
    UpstreamError,
    Timeout,
    RateLimited,
    BillingBlocked,
}

impl RequestStatus {
    /// Etiqueta estable persistida en la columna `status`.
    pub fn as_label(&self) -> &'static str {
        match self {
            RequestStatus::Success => "SUCCESS",
            RequestStatus::ClientError => "CLIENT_ERROR",
            RequestStatus::UpstreamError => "UPSTREAM_ERROR",
            RequestStatus::Timeout => "TIMEOUT",
            RequestStatus::RateLimited => "RATE_LIMITED",
            RequestStatus::BillingBlocked => "BILLING_BLOCKED",
        }
    }

    /// Un estado exitoso incrementa `success_count`; el resto, `error_count`.
    pub fn is_success(&self) -> bool {
        matches!(self, RequestStatus::Success)
    }
}

/// Fuente de facturación registrada en el evento terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageBillingSource {
    Allowance,
    Wallet,
    None,
}

impl UsageBillingSource {
    pub fn as_label(&self) -> &'static str {
        match self {
            UsageBillingSource::Allowance => "allowance",
            UsageBillingSource::Wallet => "wallet",
            UsageBillingSource::None => "none",
        }
    }
}

/// Registro terminal e inmutable de una petición. Único por request_id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestEvent {
    /// Identificador de la petición (ancla de deduplicación).
    pub request_identifier: String,
    /// Principal de facturación.
    pub owner: OwnerRef,
    /// Clave API que originó la petición.
    pub api_key_identifier: String,
    /// Modelo público solicitado.
    pub model_identifier: String,
    /// Proveedor upstream efectivo.
    pub provider_name: String,
    /// Endpoint atravesado (`/v1/chat/completions`).
    pub endpoint: String,
    /// Estado terminal.
    pub status: RequestStatus,
    /// Código HTTP devuelto al cliente.
    pub status_code: u16,
    /// Duración total en milisegundos.
    pub duration_milliseconds: i64,
    /// Tiempo al primer byte upstream; nulo = ningún byte llegó.
    pub time_to_first_byte_milliseconds: Option<i64>,
    /// Bytes reenviados al cliente.
    pub output_bytes: i64,
    /// Tokens de entrada reportados por el proveedor.
    pub prompt_tokens: i64,
    /// Tokens de salida reportados por el proveedor.
    pub completion_tokens: i64,
    /// Fuente de la decisión de facturación.
    pub billing_source: UsageBillingSource,
    /// Costo cargado en centavos.
    pub cost_cents: i64,
    /// Bandera de petición en streaming.
    pub is_streaming: bool,
    /// Chunks SSE parseados con éxito.
    pub chunk_count: i64,
    /// IP del cliente resuelta en admisión.
    pub client_ip: String,
    /// User-Agent declarado por el cliente.
    pub user_agent: String,
    /// Instante terminal.
    pub created_at: DateTime<Utc>,
}

impl RequestEvent {
    /// Día UTC (YYYY-MM-DD) bajo el que agrega este evento.
    pub fn utc_date_stamp(&self) -> String {
        self.created_at.format("%Y-%m-%d").to_string()
    }
}

/// Agregado diario por (principal, fecha UTC).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UsageDaily {
    pub request_count: i64,
    pub success_count: i64,
    pub error_count: i64,
    pub input_tokens: i64,
    pub output_tokens: i64,
    pub cost_cents: i64,
    pub allowance_used: i64,
}

impl UsageDaily {
    /// Acumula un evento en el delta del lote.
    pub fn absorb(&mut self, event: &RequestEvent) {
        self.request_count += 1;
        if event.status.is_success() {
            self.success_count += 1;
        } else {
            self.error_count += 1;
        }
        self.input_tokens += event.prompt_tokens;
        self.output_tokens += event.completion_tokens;
        self.cost_cents += event.cost_cents;
        if event.billing_source == UsageBillingSource::Allowance {
            self.allowance_used += 1;
        }
    }
}
