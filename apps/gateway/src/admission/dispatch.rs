// [apps/gateway/src/admission/dispatch.rs]
/*!
 * =================================================================
 * APARATO: PRE-DISPATCH VALIDATION (V4.2 - GATEWAY MASTER)
 * CLASIFICACIÓN: ADMISSION STRATUM (ESTRATO L4)
 * RESPONSABILIDAD: VALIDACIÓN FINAL Y REESCRITURA DEL CUERPO UPSTREAM
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. CLAMP LADDER: max_tokens respeta min(política, modelo); la
 *    estimación gruesa de entrada (ceil(len/4)) respeta la política.
 * 2. IDENTITY REWRITE: El cuerpo viaja intacto salvo el identificador
 *    de modelo, sustituido por el que entiende el proveedor.
 * =================================================================
 */

use crate::errors::GatewayError;
use omniway_domain_models::catalog::ModelRecord;
use omniway_domain_models::openai::ChatCompletionRequest;
use omniway_domain_models::policy::Policy;
use serde_json::Value;

/**
 * Validación previa al despacho upstream.
 *
 * # Logic:
 * - max_tokens solicitado <= min(policy.max_output_tokens,
 *   model.max_output_tokens); techos no positivos no restringen.
 * - Estimación de entrada (ceil(bytes/4)) <= policy.max_input_tokens.
 */
pub fn validate_for_dispatch(
    request: &ChatCompletionRequest,
    policy: &Policy,
    model_record: &ModelRecord,
) -> Result<(), GatewayError> {
    if request.messages.is_empty() {
        return Err(GatewayError::InvalidRequest {
            message: "At least one message is required.".to_string(),
            param: Some("messages".to_string()),
        });
    }

    let output_ceiling = effective_output_ceiling(policy, model_record);
    if let (Some(requested_max_tokens), Some(ceiling)) = (request.max_tokens, output_ceiling) {
        if requested_max_tokens > ceiling {
            return Err(GatewayError::InvalidRequest {
                message: format!(
                    "max_tokens {} exceeds the allowed ceiling of {}.",
                    requested_max_tokens, ceiling
                ),
                param: Some("max_tokens".to_string()),
            });
        }
    }

    if policy.max_input_tokens > 0 {
        let estimated_input_tokens = request.estimate_input_tokens();
        if estimated_input_tokens > policy.max_input_tokens {
            return Err(GatewayError::InvalidRequest {
                message: format!(
                    "Estimated input of {} tokens exceeds the policy limit of {}.",
                    estimated_input_tokens, policy.max_input_tokens
                ),
                param: Some("messages".to_string()),
            });
        }
    }

    Ok(())
}

/// Techo efectivo de salida: min de los techos positivos.
pub fn effective_output_ceiling(policy: &Policy, model_record: &ModelRecord) -> Option<i64> {
    let ceilings: Vec<i64> = [policy.max_output_tokens, model_record.max_output_tokens]
        .into_iter()
        .filter(|ceiling| *ceiling > 0)
        .collect();

    ceilings.into_iter().min()
}

/**
 * Reescribe el cuerpo hacia el proveedor: el identificador público se
 * sustituye por el upstream y el resto fluye intacto.
 */
pub fn rewrite_for_upstream(
    request: &ChatCompletionRequest,
    model_record: &ModelRecord,
) -> Result<Value, GatewayError> {
    let mut upstream_body = serde_json::to_value(request)
        .map_err(|serialization_fault| GatewayError::Internal(serialization_fault.to_string()))?;

    upstream_body["model"] = Value::String(model_record.upstream_model_identifier.clone());
    Ok(upstream_body)
}
