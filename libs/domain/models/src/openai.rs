// [libs/domain/models/src/openai.rs]
/*!
 * =================================================================
 * APARATO: OPENAI WIRE CONTRACTS (V4.3 - GATEWAY MASTER)
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: DTOs OPENAI-COMPATIBLES DE ENTRADA Y SALIDA
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. PASSTHROUGH FIDELITY: Los campos que el pipeline no inspecciona
 *    viajan aplanados (#[serde(flatten)]) hacia el proveedor upstream
 *    sin pérdida ni reordenado semántico.
 * 2. ERROR SHAPE PARITY: Toda falla del gateway emite exactamente
 *    {error:{message,type,code,param?},request_id}.
 * =================================================================
 */

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Mensaje de conversación. `content` queda como Value: el estimador de
/// tokens y el proveedor aceptan tanto string como arreglos multimodales.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: Value,
    #[serde(flatten)]
    pub passthrough: Map<String, Value>,
}

/// Cuerpo de `POST /v1/chat/completions`. Solo se tipan los campos que
/// el pipeline inspecciona; el resto fluye hacia upstream intacto.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<i64>,
    #[serde(flatten)]
    pub passthrough: Map<String, Value>,
}

impl ChatCompletionRequest {
    /// Bandera efectiva de streaming.
    pub fn wants_streaming(&self) -> bool {
        self.stream.unwrap_or(false)
    }

    /**
     * Estimación gruesa de tokens de entrada: ceil(len(content)/4)
     * sumando el contenido textual de cada mensaje. El contenido no
     * textual aporta la longitud de su forma JSON serializada.
     */
    pub fn estimate_input_tokens(&self) -> i64 {
        let total_content_bytes: usize = self
            .messages
            .iter()
            .map(|message| match &message.content {
                Value::String(text_content) => text_content.len(),
                other_content => other_content.to_string().len(),
            })
            .sum();

        ((total_content_bytes + 3) / 4) as i64
    }
}

/// Bloque de uso reportado por el proveedor.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ChatUsage {
    #[serde(default)]
    pub prompt_tokens: i64,
    #[serde(default)]
    pub completion_tokens: i64,
    #[serde(default)]
    pub total_tokens: i64,
}

/// Detalle interior del cuerpo de error OpenAI-compatible.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub message: String,
    #[serde(rename = "type")]
    pub error_type: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub param: Option<String>,
}

/// Envoltura completa de error emitida por todas las fallas del gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ErrorDetail,
    pub request_id: String,
}

/// Objeto de modelo para `GET /v1/models`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelObject {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub owned_by: String,
}

/// Lista de modelos OpenAI-compatible.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelListResponse {
    pub object: String,
    pub data: Vec<ModelObject>,
}

impl ModelListResponse {
    pub fn from_models(models: Vec<ModelObject>) -> Self {
        ModelListResponse { object: "list".to_string(), data: models }
    }
}
