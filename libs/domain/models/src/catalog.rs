// [libs/domain/models/src/catalog.rs]
/*!
 * =================================================================
 * APARATO: MODEL CATALOG & PRICING MODELS (V4.0 - GATEWAY MASTER)
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: CONTRATOS DEL CATÁLOGO LLM Y REGISTROS DE PRECIO
 * =================================================================
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Registro del catálogo para un modelo LLM expuesto por el gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelRecord {
    /// Identificador público del modelo (el que viaja en la petición).
    pub model_identifier: String,
    /// Identificador que entiende el proveedor upstream.
    pub upstream_model_identifier: String,
    /// Nombre del proveedor upstream (ancla del circuit breaker).
    pub provider_name: String,
    /// Capacidad de respuesta en streaming SSE.
    pub supports_streaming: bool,
    /// Capacidad de entrada visual.
    pub supports_vision: bool,
    /// Capacidad de herramientas.
    pub supports_tools: bool,
    /// Capacidad de function-calling.
    pub supports_function_call: bool,
    /// Capacidad de salida JSON estricta.
    pub supports_json_mode: bool,
    /// Ventana de contexto en tokens.
    pub context_window_tokens: i64,
    /// Techo de tokens de salida del modelo.
    pub max_output_tokens: i64,
    /// Bandera de activación en el catálogo.
    pub is_active: bool,
    /// Bandera de deprecación (se admite con advertencia).
    pub is_deprecated: bool,
}

/// Registro de precio acotado en el tiempo para un modelo.
/// La fila vigente satisface `effective_from <= now < effective_to`
/// (o `effective_to` nulo), la más reciente primero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingRecord {
    /// Modelo al que aplica esta franja de precio.
    pub model_identifier: String,
    /// Precio de entrada en centavos por millón de tokens.
    pub input_price_cents_per_million: i64,
    /// Precio de salida en centavos por millón de tokens.
    pub output_price_cents_per_million: i64,
    /// Inicio de vigencia.
    pub effective_from: DateTime<Utc>,
    /// Fin de vigencia; nulo = franja abierta.
    pub effective_to: Option<DateTime<Utc>>,
}
