// [apps/gateway/src/middleware.rs]
/*!
 * =================================================================
 * APARATO: PERIMETER GUARDS (V4.4 - GATEWAY MASTER)
 * CLASIFICACIÓN: SECURITY STRATUM (ESTRATO L4)
 * RESPONSABILIDAD: CONTEXTO DE PETICIÓN Y AUTENTICACIÓN PERIMETRAL
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. REQUEST IDENTITY FIRST: El guard exterior sella request_id
 *    (X-Request-ID entrante u UUID v4), resuelve la IP del cliente
 *    (XFF[0] -> X-Real-IP -> peer) y emite el rastro terminal
 *    estructurado de cada petición.
 * 2. EXTENSION INJECTION: 'RequestContext' y 'AuthContext' viajan por
 *    extensiones hacia los handlers del pipeline.
 * =================================================================
 */

use crate::state::AppState;
use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderValue},
    middleware::Next,
    response::Response,
};
use std::net::SocketAddr;
use std::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

/// Contexto perimetral de una petición en vuelo.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_identifier: String,
    pub client_ip: String,
    pub user_agent: String,
}

/// Resuelve la IP del cliente: XFF[0] -> X-Real-IP -> peer.
fn resolve_client_ip(request: &Request) -> String {
    if let Some(forwarded_chain) = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|header_value| header_value.to_str().ok())
    {
        if let Some(first_hop) = forwarded_chain.split(',').next() {
            let first_hop = first_hop.trim();
            if !first_hop.is_empty() {
                return first_hop.to_string();
            }
        }
    }

    if let Some(real_ip) = request
        .headers()
        .get("x-real-ip")
        .and_then(|header_value| header_value.to_str().ok())
    {
        if !real_ip.is_empty() {
            return real_ip.to_string();
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|peer| peer.0.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/**
 * Guard exterior: identidad de petición, IP, rastro terminal y eco
 * del header x-request-id en toda respuesta.
 */
pub async fn request_context_guard(mut request: Request, next: Next) -> Response {
    let dispatch_instant = Instant::now();

    let request_identifier = request
        .headers()
        .get("x-request-id")
        .and_then(|header_value| header_value.to_str().ok())
        .filter(|inbound_id| !inbound_id.is_empty() && inbound_id.len() <= 128)
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let client_ip = resolve_client_ip(&request);
    let user_agent = request
        .headers()
        .get(header::USER_AGENT)
        .and_then(|header_value| header_value.to_str().ok())
        .unwrap_or("")
        .to_string();

    let method = request.method().clone();
    let path = request.uri().path().to_string();

    request.extensions_mut().insert(RequestContext {
        request_identifier: request_identifier.clone(),
        client_ip,
        user_agent,
    });

    let mut response = next.run(request).await;

    if let Ok(header_value) = HeaderValue::from_str(&request_identifier) {
        response.headers_mut().insert("x-request-id", header_value);
    }

    // Rastro terminal estructurado: una línea por petición.
    info!(
        request_id = %request_identifier,
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        duration_ms = dispatch_instant.elapsed().as_millis() as u64,
        "📡 [REQUEST_TRACE]"
    );

    response
}

/**
 * Guard de autenticación: forja el AuthContext completo (clave,
 * principal, política) y lo inyecta en el flujo de la petición.
 */
pub async fn auth_guard(
    State(application_state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let request_context = request
        .extensions()
        .get::<RequestContext>()
        .cloned()
        .unwrap_or_else(|| RequestContext {
            request_identifier: Uuid::new_v4().to_string(),
            client_ip: "unknown".to_string(),
            user_agent: String::new(),
        });

    let authorization_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|header_value| header_value.to_str().ok())
        .map(str::to_string);

    let auth_verdict = application_state
        .auth_service
        .authenticate(authorization_header.as_deref(), &request_context.client_ip)
        .await;

    match auth_verdict {
        Ok(auth_context) => {
            request.extensions_mut().insert(auth_context);
            next.run(request).await
        }
        Err(auth_rejection) => {
            warn!(
                request_id = %request_context.request_identifier,
                "❌ [AUTH_REJECTION]: {}",
                auth_rejection
            );
            auth_rejection.render(&request_context.request_identifier)
        }
    }
}
