// [apps/gateway/src/handlers/chat.rs]
/*!
 * =================================================================
 * APARATO: CHAT COMPLETIONS PIPELINE HANDLER (V4.6 - GATEWAY MASTER)
 * CLASIFICACIÓN: API ADAPTER LAYER (ESTRATO L4)
 * RESPONSABILIDAD: PIPELINE COMPLETO DE /v1/chat/completions
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. FIXED ADMISSION ORDER: cuerpo -> rate -> concurrencia -> modelo ->
 *    validación -> precio -> circuito -> facturación -> despacho.
 *    El circuito se evalúa antes del cargo: una petición condenada
 *    jamás debita la billetera.
 * 2. TERMINAL TRUTH: Todo desenlace (éxito, denegación, colapso)
 *    emite exactamente un RequestEvent y libera su slot concurrente.
 * 3. STREAM FINALIZER: El relevo SSE corre en su propia tarea; el
 *    desenlace terminal (circuito, reembolso TTFB-0, slot, evento)
 *    se sella allí, incluso ante abandono del cliente.
 * =================================================================
 */

use crate::admission::dispatch::{rewrite_for_upstream, validate_for_dispatch};
use crate::admission::rate_limiter::{RateDecision, SlotGrant};
use crate::errors::GatewayError;
use crate::middleware::RequestContext;
use crate::state::AppState;
use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use bytes::Bytes;
use chrono::Utc;
use futures_util::StreamExt;
use omniway_domain_billing::{BillingSource, ChargeCode, ChargeDecision};
use omniway_domain_models::auth::AuthContext;
use omniway_domain_models::events::{RequestEvent, RequestStatus, UsageBillingSource};
use omniway_domain_models::openai::{ChatCompletionRequest, ChatUsage};
use omniway_domain_models::owner::OwnerRef;
use omniway_domain_models::policy::Policy;
use omniway_infra_provider::{relay_sse_stream, StreamOutcome, StreamTerminal};
use std::convert::Infallible;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{instrument, warn};

/// Capacidad del canal de relevo hacia el cliente (backpressure).
const STREAM_RELAY_CHANNEL_CAPACITY: usize = 64;
/// Estatus sintético para abandono del cliente (convención nginx).
const CLIENT_ABORT_STATUS_CODE: u16 = 499;

/**
 * Endpoint: POST /v1/chat/completions
 * Pipeline de admisión completo con despacho unario o streaming.
 */
#[instrument(skip_all, fields(request_id = %request_context.request_identifier))]
pub async fn handle_chat_completion(
    State(application_state): State<AppState>,
    Extension(request_context): Extension<RequestContext>,
    Extension(auth_context): Extension<AuthContext>,
    body_bytes: Bytes,
) -> Response {
    let dispatch_instant = Instant::now();
    let request_identifier = request_context.request_identifier.clone();
    let owner = auth_context.owner.clone();
    let policy = auth_context.policy.clone();

    // --- ETAPA 0: TAMAÑO Y PARSEO DEL CUERPO ---
    if policy.max_body_bytes > 0 && body_bytes.len() as i64 > policy.max_body_bytes {
        let rejection = GatewayError::InvalidRequest {
            message: format!(
                "Request body of {} bytes exceeds the {} byte limit.",
                body_bytes.len(),
                policy.max_body_bytes
            ),
            param: None,
        };
        return rejection.render(&request_identifier);
    }

    let chat_request: ChatCompletionRequest = match serde_json::from_slice(&body_bytes) {
        Ok(parsed_request) => parsed_request,
        Err(parse_fault) => {
            let rejection = GatewayError::InvalidRequest {
                message: format!("Malformed JSON body: {}", parse_fault),
                param: None,
            };
            return rejection.render(&request_identifier);
        }
    };
    let is_streaming = chat_request.wants_streaming();
    let model_identifier = chat_request.model.clone();

    // --- ETAPA 1: VENTANAS DE RATE LIMIT ---
    let rate_decision = application_state.rate_limiter.check_rate(&owner, &policy).await;
    let mut response_headers = build_rate_limit_headers(&rate_decision, &policy);

    if !rate_decision.allowed {
        let exhausted_window = rate_decision.limited_by.clone().unwrap_or_else(|| "minute".into());
        let rejection = GatewayError::RateLimited {
            window: exhausted_window,
            retry_after_seconds: rate_decision.retry_after_seconds(Utc::now().timestamp()),
        };

        publish_terminal_event(
            &application_state,
            terminal_event_seed(
                &request_identifier,
                &owner,
                &auth_context,
                &model_identifier,
                "",
                is_streaming,
                &request_context,
            ),
            RequestStatus::RateLimited,
            429,
            dispatch_instant,
            None,
            0,
            ChatUsage::default(),
            0,
            UsageBillingSource::None,
            0,
        );

        return render_with_headers(&rejection, &request_identifier, &response_headers);
    }

    // --- ETAPA 2: SLOT CONCURRENTE ---
    let slot_grant = match application_state
        .rate_limiter
        .acquire_slot(&owner, policy.max_concurrent_requests, &request_identifier)
        .await
    {
        Ok(grant) => grant,
        Err(rejection) => {
            extend_concurrency_headers(
                &mut response_headers,
                policy.max_concurrent_requests,
                policy.max_concurrent_requests,
            );
            publish_terminal_event(
                &application_state,
                terminal_event_seed(
                    &request_identifier,
                    &owner,
                    &auth_context,
                    &model_identifier,
                    "",
                    is_streaming,
                    &request_context,
                ),
                RequestStatus::RateLimited,
                429,
                dispatch_instant,
                None,
                0,
                ChatUsage::default(),
                0,
                UsageBillingSource::None,
                0,
            );
            return render_with_headers(&rejection, &request_identifier, &response_headers);
        }
    };

    if let SlotGrant::Granted { active_slots } = slot_grant {
        extend_concurrency_headers(&mut response_headers, policy.max_concurrent_requests, active_slots);
    }
    let slot_was_granted = matches!(slot_grant, SlotGrant::Granted { .. });

    // Macro local de salida con liberación de slot y evento terminal.
    macro_rules! reject_with_slot_release {
        ($rejection:expr, $provider_name:expr, $billing_source:expr, $cost:expr) => {{
            let rejection: GatewayError = $rejection;
            if slot_was_granted {
                application_state.rate_limiter.release_slot(&owner, &request_identifier).await;
            }
            let terminal_status = terminal_status_for(&rejection);
            let status_code = rejection.status_code().as_u16();
            publish_terminal_event(
                &application_state,
                terminal_event_seed(
                    &request_identifier,
                    &owner,
                    &auth_context,
                    &model_identifier,
                    $provider_name,
                    is_streaming,
                    &request_context,
                ),
                terminal_status,
                status_code,
                dispatch_instant,
                None,
                0,
                ChatUsage::default(),
                0,
                $billing_source,
                $cost,
            );
            return render_with_headers(&rejection, &request_identifier, &response_headers);
        }};
    }

    // --- ETAPA 3: ACCESO AL MODELO ---
    let model_record = match application_state
        .model_access
        .authorize(&model_identifier, &auth_context)
        .await
    {
        Ok(record) => record,
        Err(rejection) => reject_with_slot_release!(rejection, "", UsageBillingSource::None, 0),
    };
    let provider_name = model_record.provider_name.clone();

    if is_streaming {
        if let Err(rejection) =
            application_state.model_access.authorize_streaming(&model_record, &auth_context)
        {
            reject_with_slot_release!(rejection, &provider_name, UsageBillingSource::None, 0);
        }
    }

    // --- ETAPA 4: VALIDACIÓN PRE-DESPACHO ---
    if let Err(rejection) = validate_for_dispatch(&chat_request, &policy, &model_record) {
        reject_with_slot_release!(rejection, &provider_name, UsageBillingSource::None, 0);
    }

    // --- ETAPA 5: ENLACE Y CIRCUITO DEL PROVEEDOR ---
    let provider_client = match application_state.provider_client(&provider_name) {
        Some(client) => client,
        None => reject_with_slot_release!(
            GatewayError::ProviderUnconfigured { provider: provider_name.clone() },
            &provider_name,
            UsageBillingSource::None,
            0
        ),
    };

    if let Err(rejection) = application_state.circuit_breaker.admit(&provider_name).await {
        reject_with_slot_release!(rejection, &provider_name, UsageBillingSource::None, 0);
    }

    // --- ETAPA 6: PRECIO Y CARGO ATÓMICO ---
    let price_cents = application_state.pricing_service.resolve_price_cents(&model_identifier).await;

    let charge_decision = match application_state
        .billing_engine
        .charge(&owner, &request_identifier, &model_identifier, price_cents, &policy)
        .await
    {
        Ok(decision) => decision,
        Err(rejection) => {
            reject_with_slot_release!(rejection, &provider_name, UsageBillingSource::None, 0)
        }
    };

    if charge_decision.code == ChargeCode::Replayed {
        // Sin cache de respuesta en el núcleo, el replay es conflicto
        // tanto para streaming como para unario.
        reject_with_slot_release!(
            GatewayError::IdempotentReplay,
            &provider_name,
            UsageBillingSource::None,
            0
        );
    }

    extend_billing_headers(&mut response_headers, &charge_decision);
    let was_wallet_charge =
        charge_decision.code == ChargeCode::Charged && charge_decision.source == BillingSource::Wallet;
    let event_billing_source = match charge_decision.source {
        BillingSource::Wallet => UsageBillingSource::Wallet,
        _ => UsageBillingSource::Allowance,
    };

    // --- ETAPA 7: REESCRITURA Y DESPACHO ---
    let upstream_body = match rewrite_for_upstream(&chat_request, &model_record) {
        Ok(body) => body,
        Err(rejection) => reject_with_slot_release!(
            rejection,
            &provider_name,
            event_billing_source,
            charge_decision.charged_cents
        ),
    };

    if is_streaming {
        dispatch_streaming(
            application_state,
            request_context,
            auth_context,
            owner,
            request_identifier,
            model_identifier,
            provider_name,
            provider_client,
            upstream_body,
            charge_decision,
            was_wallet_charge,
            slot_was_granted,
            response_headers,
            dispatch_instant,
        )
        .await
    } else {
        dispatch_unary(
            application_state,
            request_context,
            auth_context,
            owner,
            request_identifier,
            model_identifier,
            provider_name,
            provider_client,
            upstream_body,
            charge_decision,
            event_billing_source,
            slot_was_granted,
            response_headers,
            dispatch_instant,
        )
        .await
    }
}

// --- DESPACHO UNARIO ---

#[allow(clippy::too_many_arguments)]
async fn dispatch_unary(
    application_state: AppState,
    request_context: RequestContext,
    auth_context: AuthContext,
    owner: OwnerRef,
    request_identifier: String,
    model_identifier: String,
    provider_name: String,
    provider_client: std::sync::Arc<omniway_infra_provider::ProviderClient>,
    upstream_body: serde_json::Value,
    charge_decision: ChargeDecision,
    event_billing_source: UsageBillingSource,
    slot_was_granted: bool,
    mut response_headers: HeaderMap,
    dispatch_instant: Instant,
) -> Response {
    let exchange_result =
        provider_client.execute_unary(&upstream_body, &request_identifier).await;

    if slot_was_granted {
        application_state.rate_limiter.release_slot(&owner, &request_identifier).await;
    }

    match exchange_result {
        Ok(exchange) => {
            application_state.circuit_breaker.record_success(&provider_name).await;

            extend_token_headers(&mut response_headers, &exchange.usage);

            publish_terminal_event(
                &application_state,
                terminal_event_seed(
                    &request_identifier,
                    &owner,
                    &auth_context,
                    &model_identifier,
                    &provider_name,
                    false,
                    &request_context,
                ),
                RequestStatus::Success,
                200,
                dispatch_instant,
                Some(dispatch_instant.elapsed().as_millis() as i64),
                exchange.body_length_bytes as i64,
                exchange.usage,
                0,
                event_billing_source,
                charge_decision.charged_cents,
            );

            let mut response = (StatusCode::OK, Json(exchange.body)).into_response();
            merge_headers(&mut response, &response_headers);
            response
        }
        Err(provider_fault) => {
            if provider_fault.counts_toward_circuit() {
                application_state.circuit_breaker.record_failure(&provider_name).await;
            } else {
                application_state.circuit_breaker.record_success(&provider_name).await;
            }

            let rejection = GatewayError::from_provider(provider_fault);
            let terminal_status = terminal_status_for(&rejection);

            publish_terminal_event(
                &application_state,
                terminal_event_seed(
                    &request_identifier,
                    &owner,
                    &auth_context,
                    &model_identifier,
                    &provider_name,
                    false,
                    &request_context,
                ),
                terminal_status,
                rejection.status_code().as_u16(),
                dispatch_instant,
                None,
                0,
                ChatUsage::default(),
                0,
                event_billing_source,
                charge_decision.charged_cents,
            );

            render_with_headers(&rejection, &request_identifier, &response_headers)
        }
    }
}

// --- DESPACHO STREAMING ---

#[allow(clippy::too_many_arguments)]
async fn dispatch_streaming(
    application_state: AppState,
    request_context: RequestContext,
    auth_context: AuthContext,
    owner: OwnerRef,
    request_identifier: String,
    model_identifier: String,
    provider_name: String,
    provider_client: std::sync::Arc<omniway_infra_provider::ProviderClient>,
    upstream_body: serde_json::Value,
    charge_decision: ChargeDecision,
    was_wallet_charge: bool,
    slot_was_granted: bool,
    response_headers: HeaderMap,
    dispatch_instant: Instant,
) -> Response {
    let upstream_response =
        match provider_client.open_stream(&upstream_body, &request_identifier).await {
            Ok(response) => response,
            Err(provider_fault) => {
                // Rechazo antes del primer byte: TTFB nulo => reembolso.
                if provider_fault.counts_toward_circuit() {
                    application_state.circuit_breaker.record_failure(&provider_name).await;
                }
                if slot_was_granted {
                    application_state.rate_limiter.release_slot(&owner, &request_identifier).await;
                }

                let refunded = attempt_ttfb_zero_refund(
                    &application_state,
                    &owner,
                    &request_identifier,
                    &charge_decision,
                    was_wallet_charge,
                )
                .await;

                let rejection = GatewayError::from_provider(provider_fault);
                let terminal_status = terminal_status_for(&rejection);
                let effective_cost = if refunded { 0 } else { charge_decision.charged_cents };
                let event_source = if was_wallet_charge {
                    UsageBillingSource::Wallet
                } else {
                    UsageBillingSource::Allowance
                };

                publish_terminal_event(
                    &application_state,
                    terminal_event_seed(
                        &request_identifier,
                        &owner,
                        &auth_context,
                        &model_identifier,
                        &provider_name,
                        true,
                        &request_context,
                    ),
                    terminal_status,
                    rejection.status_code().as_u16(),
                    dispatch_instant,
                    None,
                    0,
                    ChatUsage::default(),
                    0,
                    event_source,
                    effective_cost,
                );

                return render_with_headers(&rejection, &request_identifier, &response_headers);
            }
        };

    let (client_byte_sender, client_byte_receiver) =
        mpsc::channel::<Bytes>(STREAM_RELAY_CHANNEL_CAPACITY);
    let max_stream_duration = provider_client.stream_max_duration();

    // Finalizador terminal: relevo + contabilidad completa.
    let finalizer_state = application_state.clone();
    let finalizer_owner = owner.clone();
    let finalizer_request = request_identifier.clone();
    tokio::spawn(async move {
        let stream_outcome =
            relay_sse_stream(upstream_response, client_byte_sender, max_stream_duration).await;

        finalize_stream(
            finalizer_state,
            request_context,
            auth_context,
            finalizer_owner,
            finalizer_request,
            model_identifier,
            provider_name,
            charge_decision,
            was_wallet_charge,
            slot_was_granted,
            dispatch_instant,
            stream_outcome,
        )
        .await;
    });

    let relay_body = Body::from_stream(
        ReceiverStream::new(client_byte_receiver).map(Ok::<Bytes, Infallible>),
    );

    let mut response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .body(relay_body)
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response());

    merge_headers(&mut response, &response_headers);
    response
}

/// Desenlace terminal de un stream: circuito, reembolso, slot, evento.
#[allow(clippy::too_many_arguments)]
async fn finalize_stream(
    application_state: AppState,
    request_context: RequestContext,
    auth_context: AuthContext,
    owner: OwnerRef,
    request_identifier: String,
    model_identifier: String,
    provider_name: String,
    charge_decision: ChargeDecision,
    was_wallet_charge: bool,
    slot_was_granted: bool,
    dispatch_instant: Instant,
    stream_outcome: StreamOutcome,
) {
    // 1. Circuito: éxito para COMPLETED/CLIENT_ABORT, falla para el resto.
    match stream_outcome.terminal {
        StreamTerminal::Completed | StreamTerminal::ClientAbort => {
            application_state.circuit_breaker.record_success(&provider_name).await;
        }
        StreamTerminal::UpstreamError | StreamTerminal::Timeout | StreamTerminal::Error => {
            application_state.circuit_breaker.record_failure(&provider_name).await;
        }
    }

    // 2. Slot concurrente.
    if slot_was_granted {
        application_state.rate_limiter.release_slot(&owner, &request_identifier).await;
    }

    // 3. Reembolso TTFB-0 (solo cargos wallet-source).
    let refunded = if stream_outcome.is_refund_eligible() {
        attempt_ttfb_zero_refund(
            &application_state,
            &owner,
            &request_identifier,
            &charge_decision,
            was_wallet_charge,
        )
        .await
    } else {
        false
    };

    // 4. Evento terminal.
    let (terminal_status, status_code) = match stream_outcome.terminal {
        StreamTerminal::Completed => (RequestStatus::Success, 200),
        StreamTerminal::ClientAbort => (RequestStatus::ClientError, CLIENT_ABORT_STATUS_CODE),
        StreamTerminal::Timeout => (RequestStatus::Timeout, 504),
        StreamTerminal::UpstreamError => (
            RequestStatus::UpstreamError,
            stream_outcome.upstream_status.unwrap_or(502),
        ),
        StreamTerminal::Error => (RequestStatus::UpstreamError, 502),
    };

    let event_source = match charge_decision.source {
        BillingSource::Wallet => UsageBillingSource::Wallet,
        _ => UsageBillingSource::Allowance,
    };
    let effective_cost = if refunded { 0 } else { charge_decision.charged_cents };

    publish_terminal_event(
        &application_state,
        terminal_event_seed(
            &request_identifier,
            &owner,
            &auth_context,
            &model_identifier,
            &provider_name,
            true,
            &request_context,
        ),
        terminal_status,
        status_code,
        dispatch_instant,
        stream_outcome.ttfb_milliseconds,
        stream_outcome.output_bytes,
        stream_outcome.usage.unwrap_or_default(),
        stream_outcome.chunk_count,
        event_source,
        effective_cost,
    );
}

/// Intenta el reembolso TTFB-0. Retorna true si el monto fue devuelto.
async fn attempt_ttfb_zero_refund(
    application_state: &AppState,
    owner: &OwnerRef,
    request_identifier: &str,
    charge_decision: &ChargeDecision,
    was_wallet_charge: bool,
) -> bool {
    let refund_outcome = application_state
        .refund_engine
        .refund(
            owner,
            request_identifier,
            charge_decision.charged_cents,
            "ttfb_zero_stream_failure",
            was_wallet_charge,
        )
        .await;

    match refund_outcome {
        omniway_domain_billing::RefundOutcome::Success { .. } => true,
        omniway_domain_billing::RefundOutcome::AlreadyRefunded => true,
        other_outcome => {
            if was_wallet_charge {
                warn!(
                    request_id = request_identifier,
                    "↩️ [REFUND]: TTFB-0 refund not applied: {:?}", other_outcome
                );
            }
            false
        }
    }
}

// --- SÍNTESIS DE EVENTOS TERMINALES ---

/// Semilla invariante del evento terminal de esta petición.
struct TerminalSeed {
    request_identifier: String,
    owner: OwnerRef,
    api_key_identifier: String,
    model_identifier: String,
    provider_name: String,
    is_streaming: bool,
    client_ip: String,
    user_agent: String,
}

fn terminal_event_seed(
    request_identifier: &str,
    owner: &OwnerRef,
    auth_context: &AuthContext,
    model_identifier: &str,
    provider_name: &str,
    is_streaming: bool,
    request_context: &RequestContext,
) -> TerminalSeed {
    TerminalSeed {
        request_identifier: request_identifier.to_string(),
        owner: owner.clone(),
        api_key_identifier: auth_context.api_key_identifier.clone(),
        model_identifier: model_identifier.to_string(),
        provider_name: provider_name.to_string(),
        is_streaming,
        client_ip: request_context.client_ip.clone(),
        user_agent: request_context.user_agent.clone(),
    }
}

#[allow(clippy::too_many_arguments)]
fn publish_terminal_event(
    application_state: &AppState,
    seed: TerminalSeed,
    status: RequestStatus,
    status_code: u16,
    dispatch_instant: Instant,
    ttfb_milliseconds: Option<i64>,
    output_bytes: i64,
    usage: ChatUsage,
    chunk_count: i64,
    billing_source: UsageBillingSource,
    cost_cents: i64,
) {
    application_state.usage_buffer.publish(RequestEvent {
        request_identifier: seed.request_identifier,
        owner: seed.owner,
        api_key_identifier: seed.api_key_identifier,
        model_identifier: seed.model_identifier,
        provider_name: seed.provider_name,
        endpoint: "/v1/chat/completions".to_string(),
        status,
        status_code,
        duration_milliseconds: dispatch_instant.elapsed().as_millis() as i64,
        time_to_first_byte_milliseconds: ttfb_milliseconds,
        output_bytes,
        prompt_tokens: usage.prompt_tokens,
        completion_tokens: usage.completion_tokens,
        billing_source,
        cost_cents,
        is_streaming: seed.is_streaming,
        chunk_count,
        client_ip: seed.client_ip,
        user_agent: seed.user_agent,
        created_at: Utc::now(),
    });
}

/// Estado terminal registrado para cada variante de rechazo.
fn terminal_status_for(rejection: &GatewayError) -> RequestStatus {
    match rejection {
        GatewayError::RateLimited { .. } | GatewayError::ConcurrencyExceeded { .. } => {
            RequestStatus::RateLimited
        }
        GatewayError::WalletLocked
        | GatewayError::InsufficientWallet { .. }
        | GatewayError::BillingUnavailable => RequestStatus::BillingBlocked,
        GatewayError::UpstreamTimeout => RequestStatus::Timeout,
        GatewayError::Upstream { .. }
        | GatewayError::CircuitOpen { .. }
        | GatewayError::ProviderUnconfigured { .. } => RequestStatus::UpstreamError,
        _ => RequestStatus::ClientError,
    }
}

// --- SÍNTESIS DE CABECERAS ---

fn header_pair(headers: &mut HeaderMap, name: &'static str, value: String) {
    if let Ok(header_value) = HeaderValue::from_str(&value) {
        headers.insert(HeaderName::from_static(name), header_value);
    }
}

/// Cabeceras de rate limit: tripleta de la ventana más estrecha más
/// las variantes por ventana. Presentes en TODA respuesta del pipeline.
pub fn build_rate_limit_headers(rate_decision: &RateDecision, policy: &Policy) -> HeaderMap {
    let mut headers = HeaderMap::new();

    let (tightest_limit, tightest_remaining, tightest_reset) =
        rate_decision.tightest_window(policy);

    header_pair(&mut headers, "x-ratelimit-limit", tightest_limit.to_string());
    header_pair(&mut headers, "x-ratelimit-remaining", tightest_remaining.to_string());
    header_pair(&mut headers, "x-ratelimit-reset", tightest_reset.to_string());

    header_pair(&mut headers, "x-ratelimit-limit-minute", policy.requests_per_minute.to_string());
    header_pair(
        &mut headers,
        "x-ratelimit-remaining-minute",
        rate_decision.minute_remaining.to_string(),
    );
    header_pair(
        &mut headers,
        "x-ratelimit-reset-minute",
        rate_decision.minute_reset_epoch.to_string(),
    );

    header_pair(&mut headers, "x-ratelimit-limit-hour", policy.requests_per_hour.to_string());
    header_pair(
        &mut headers,
        "x-ratelimit-remaining-hour",
        rate_decision.hour_remaining.to_string(),
    );
    header_pair(&mut headers, "x-ratelimit-reset-hour", rate_decision.hour_reset_epoch.to_string());

    header_pair(&mut headers, "x-ratelimit-limit-day", policy.requests_per_day.to_string());
    header_pair(
        &mut headers,
        "x-ratelimit-remaining-day",
        rate_decision.day_remaining.to_string(),
    );
    header_pair(&mut headers, "x-ratelimit-reset-day", rate_decision.day_reset_epoch.to_string());

    headers
}

fn extend_concurrency_headers(headers: &mut HeaderMap, limit: i64, current: i64) {
    header_pair(headers, "x-concurrency-limit", limit.to_string());
    header_pair(headers, "x-concurrency-current", current.to_string());
}

fn extend_billing_headers(headers: &mut HeaderMap, charge_decision: &ChargeDecision) {
    let source_label = match charge_decision.source {
        BillingSource::Wallet => "wallet",
        _ => "allowance",
    };
    header_pair(headers, "x-billing-source", source_label.to_string());
    header_pair(
        headers,
        "x-billing-charged-cents",
        charge_decision.charged_cents.to_string(),
    );
    header_pair(
        headers,
        "x-allowance-remaining",
        charge_decision.allowance_remaining.to_string(),
    );
}

fn extend_token_headers(headers: &mut HeaderMap, usage: &ChatUsage) {
    header_pair(headers, "x-prompt-tokens", usage.prompt_tokens.to_string());
    header_pair(headers, "x-completion-tokens", usage.completion_tokens.to_string());
    header_pair(headers, "x-total-tokens", usage.total_tokens.to_string());
}

fn merge_headers(response: &mut Response, headers: &HeaderMap) {
    for (header_name, header_value) in headers {
        response.headers_mut().insert(header_name.clone(), header_value.clone());
    }
}

fn render_with_headers(
    rejection: &GatewayError,
    request_identifier: &str,
    headers: &HeaderMap,
) -> Response {
    let mut response = rejection.render(request_identifier);
    merge_headers(&mut response, headers);
    response
}
