// [apps/gateway/src/admission/model_access.rs]
/*!
 * =================================================================
 * APARATO: MODEL ACCESS GUARD (V4.2 - GATEWAY MASTER)
 * CLASIFICACIÓN: ADMISSION STRATUM (ESTRATO L4)
 * RESPONSABILIDAD: RESOLUCIÓN DE CATÁLOGO Y AUTORIZACIÓN DE MODELO
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. VERDICT LADDER: Desconocido 404, inactivo 503, fuera de allowlist
 *    403; los deprecados se admiten con advertencia estructurada.
 * 2. DUAL ALLOWLIST: El plan y la clave restringen de forma
 *    independiente; ambas vacías = sin restricción.
 * =================================================================
 */

use crate::errors::GatewayError;
use omniway_domain_models::auth::AuthContext;
use omniway_domain_models::catalog::ModelRecord;
use omniway_infra_db::repositories::ModelCatalogRepository;
use omniway_infra_hotstate::{keys, HotStateClient};
use std::sync::Arc;
use tracing::{instrument, warn};

/// TTL del catálogo cacheado (segundos).
const CATALOG_CACHE_TTL_SECONDS: u64 = 300;

pub struct ModelAccessService {
    hot_state: HotStateClient,
    catalog_repository: Arc<ModelCatalogRepository>,
}

impl ModelAccessService {
    pub fn new(hot_state: HotStateClient, catalog_repository: Arc<ModelCatalogRepository>) -> Self {
        Self { hot_state, catalog_repository }
    }

    /**
     * Resuelve el modelo del catálogo (cache 5 min) y aplica la
     * escalera de veredictos de acceso.
     */
    #[instrument(skip(self, auth_context))]
    pub async fn authorize(
        &self,
        model_identifier: &str,
        auth_context: &AuthContext,
    ) -> Result<ModelRecord, GatewayError> {
        let model_record = self.resolve_model(model_identifier).await?;

        if !model_record.is_active {
            return Err(GatewayError::ModelInactive { model: model_identifier.to_string() });
        }

        if model_record.is_deprecated {
            warn!(
                model = model_identifier,
                "🕰️ [MODEL_ACCESS]: Deprecated model admitted with warning."
            );
        }

        if !auth_context.policy.permits_model(model_identifier) {
            return Err(GatewayError::PermissionDenied {
                message: format!("Model '{}' is not included in your plan.", model_identifier),
                code: "model_not_allowed",
                param: Some("model".to_string()),
            });
        }

        if !auth_context.key_allowed_models.is_empty()
            && !auth_context
                .key_allowed_models
                .iter()
                .any(|allowed| allowed == model_identifier)
        {
            return Err(GatewayError::PermissionDenied {
                message: format!("Model '{}' is not allowed for this API key.", model_identifier),
                code: "model_not_allowed",
                param: Some("model".to_string()),
            });
        }

        Ok(model_record)
    }

    /// Validación de capacidad/permiso de streaming.
    pub fn authorize_streaming(
        &self,
        model_record: &ModelRecord,
        auth_context: &AuthContext,
    ) -> Result<(), GatewayError> {
        if !model_record.supports_streaming {
            return Err(GatewayError::InvalidRequest {
                message: format!(
                    "Model '{}' does not support streaming responses.",
                    model_record.model_identifier
                ),
                param: Some("stream".to_string()),
            });
        }

        if !auth_context.policy.has_streaming {
            return Err(GatewayError::PermissionDenied {
                message: "Streaming is not enabled for your plan.".to_string(),
                code: "streaming_not_allowed",
                param: Some("stream".to_string()),
            });
        }

        Ok(())
    }

    /// Lookup con cache caliente; fail-open hacia el Ledger Durable.
    async fn resolve_model(&self, model_identifier: &str) -> Result<ModelRecord, GatewayError> {
        let cache_key = keys::catalog_key(model_identifier);

        match self.hot_state.get_string(&cache_key).await {
            Ok(Some(cached_record)) => {
                if let Ok(record) = serde_json::from_str::<ModelRecord>(&cached_record) {
                    return Ok(record);
                }
                let _ = self.hot_state.delete_key(&cache_key).await;
            }
            Ok(None) => {}
            Err(hot_fault) => {
                warn!("⚠️ [CATALOG_FAIL_OPEN]: Hot strata degraded: {}", hot_fault);
            }
        }

        let record = self
            .catalog_repository
            .find_model(model_identifier)
            .await
            .map_err(|durable_fault| GatewayError::Internal(durable_fault.to_string()))?
            .ok_or_else(|| GatewayError::ModelNotFound { model: model_identifier.to_string() })?;

        if let Ok(serialized_record) = serde_json::to_string(&record) {
            let _ = self
                .hot_state
                .set_string_with_ttl(&cache_key, &serialized_record, CATALOG_CACHE_TTL_SECONDS)
                .await;
        }

        Ok(record)
    }

    /// Invalidación por edición del catálogo.
    pub async fn invalidate_model_cache(&self, model_identifier: &str) {
        let _ = self.hot_state.delete_key(&keys::catalog_key(model_identifier)).await;
    }
}
