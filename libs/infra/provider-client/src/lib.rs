// [libs/infra/provider-client/src/lib.rs]
/*!
 * =================================================================
 * APARATO: PROVIDER UPLINK ROOT (V4.0 - GATEWAY MASTER)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: AUTORIDAD DEL ENLACE HACIA PROVEEDORES LLM
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. BYTE-FOR-BYTE RELAY: El cuerpo SSE upstream fluye intacto hacia
 *    el cliente; las métricas (TTFB, chunks, bytes) se recolectan
 *    lateralmente sin alterar la trama.
 * 2. ERROR PASSTHROUGH: Los errores de proveedor conservan su
 *    message/type/code cuando son parseables.
 * =================================================================
 */

/// Catálogo semántico de fallos del enlace upstream.
pub mod errors;
/// Configuración inmutable de proveedores (leída al arranque).
pub mod config;
/// Parser incremental de tramas SSE con buffer de línea parcial.
pub mod sse;
/// Cliente HTTP unario y apertura de streams.
pub mod client;
/// Relevo de stream con métricas y estatus terminal.
pub mod stream;

pub use client::{ProviderClient, UnaryExchange};
pub use config::{ProviderConfig, ProviderRegistry};
pub use errors::ProviderError;
pub use stream::{relay_sse_stream, StreamOutcome, StreamTerminal};
