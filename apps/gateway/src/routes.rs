// [apps/gateway/src/routes.rs]
/*!
 * =================================================================
 * APARATO: SOVEREIGN ROUTING MATRIX (V4.2 - GATEWAY MASTER)
 * CLASIFICACIÓN: API ADAPTER LAYER (ESTRATO L3)
 * RESPONSABILIDAD: TOPOLOGÍA DE RED OPENAI-COMPATIBLE
 *
 * VISION HIPER-HOLÍSTICA:
 * La topología expone:
 * 1. Pipeline de inferencia (High Frequency): /v1/chat/completions.
 * 2. Catálogo auth-only: /v1/models.
 * 3. Liveness sin autenticación: /health.
 * Los guards perimetrales (contexto + autenticación) envuelven todo
 * el estrato /v1.
 * =================================================================
 */

use crate::handlers::{chat, models};
use crate::middleware::{auth_guard, request_context_guard};
use crate::state::AppState;
use axum::{
    http::{header, Method},
    middleware,
    routing::{get, post},
    Router,
};
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};

pub fn create_gateway_router(application_shared_state: AppState) -> Router {
    // Escudo de Red: CORS para consolas de clientes y herramientas de Ops.
    let network_security_shield = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .max_age(Duration::from_secs(3600));

    // ESTRATO DE INFERENCIA: Pipeline OpenAI-compatible.
    let inference_stratum = Router::new()
        // Pipeline completo (auth -> rate -> slots -> modelo -> billing -> proxy)
        .route("/chat/completions", post(chat::handle_chat_completion))
        // Catálogo filtrado por política
        .route("/models", get(models::handle_list_models))
        .route("/models/:model_id", get(models::handle_get_model))
        // Guard de autenticación (interior) y contexto de petición (exterior)
        .layer(middleware::from_fn_with_state(application_shared_state.clone(), auth_guard))
        .layer(middleware::from_fn(request_context_guard));

    // COMPOSICIÓN GLOBAL (Root Topology)
    Router::new()
        .route("/health", get(|| async { "STATUS_OK" }))
        .nest("/v1", inference_stratum)
        .layer(network_security_shield)
        .with_state(application_shared_state)
}
