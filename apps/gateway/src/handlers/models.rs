// [apps/gateway/src/handlers/models.rs]
/*!
 * =================================================================
 * APARATO: MODEL CATALOG HANDLERS (V4.2 - GATEWAY MASTER)
 * CLASIFICACIÓN: API ADAPTER LAYER (ESTRATO L4)
 * RESPONSABILIDAD: EXPOSICIÓN OPENAI-COMPATIBLE DEL CATÁLOGO
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. POLICY-FILTERED LISTING: El inventario se filtra por la allowlist
 *    del plan y la de la clave; allowlists vacías no restringen.
 * 2. AUTH-ONLY SURFACE: Estas rutas atraviesan el guard perimetral
 *    pero no consumen allowance ni slots.
 * =================================================================
 */

use crate::errors::GatewayError;
use crate::middleware::RequestContext;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use chrono::Utc;
use omniway_domain_models::auth::AuthContext;
use omniway_domain_models::openai::{ModelListResponse, ModelObject};
use tracing::instrument;

/**
 * Endpoint: GET /v1/models
 * Inventario activo filtrado por las allowlists del principal.
 */
#[instrument(skip_all)]
pub async fn handle_list_models(
    State(application_state): State<AppState>,
    Extension(request_context): Extension<RequestContext>,
    Extension(auth_context): Extension<AuthContext>,
) -> Response {
    let catalog_inventory = match application_state.catalog_repository.list_active_models().await {
        Ok(inventory) => inventory,
        Err(durable_fault) => {
            return GatewayError::Internal(durable_fault.to_string())
                .render(&request_context.request_identifier);
        }
    };

    let listing_epoch = Utc::now().timestamp();
    let visible_models: Vec<ModelObject> = catalog_inventory
        .into_iter()
        .filter(|model_record| {
            auth_context.policy.permits_model(&model_record.model_identifier)
                && (auth_context.key_allowed_models.is_empty()
                    || auth_context
                        .key_allowed_models
                        .iter()
                        .any(|allowed| allowed == &model_record.model_identifier))
        })
        .map(|model_record| ModelObject {
            id: model_record.model_identifier,
            object: "model".to_string(),
            created: listing_epoch,
            owned_by: model_record.provider_name,
        })
        .collect();

    (StatusCode::OK, Json(ModelListResponse::from_models(visible_models))).into_response()
}

/**
 * Endpoint: GET /v1/models/{model_id}
 * Ficha individual bajo el mismo veredicto de acceso del pipeline.
 */
#[instrument(skip_all, fields(model = %model_identifier))]
pub async fn handle_get_model(
    State(application_state): State<AppState>,
    Extension(request_context): Extension<RequestContext>,
    Extension(auth_context): Extension<AuthContext>,
    Path(model_identifier): Path<String>,
) -> Response {
    match application_state.model_access.authorize(&model_identifier, &auth_context).await {
        Ok(model_record) => {
            let model_object = ModelObject {
                id: model_record.model_identifier,
                object: "model".to_string(),
                created: Utc::now().timestamp(),
                owned_by: model_record.provider_name,
            };
            (StatusCode::OK, Json(model_object)).into_response()
        }
        Err(rejection) => rejection.render(&request_context.request_identifier),
    }
}
