// [tests/mirror/apps/gateway/services/usage_buffer.test.rs]
/**
 * =================================================================
 * APARATO: USAGE BUFFER TEST (V4.0)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L4-MIRROR
 * RESPONSABILIDAD: CERTIFICACIÓN DEL DRENAJE RAM -> COLA DURABLE
 * =================================================================
 */

use chrono::Utc;
use omniway_domain_models::events::{RequestEvent, RequestStatus, UsageBillingSource};
use omniway_domain_models::owner::OwnerRef;
use omniway_gateway::services::UsageBuffer;
use omniway_infra_db::repositories::UsageRepository;
use omniway_infra_db::TursoClient;
use std::sync::Arc;

fn forge_event(request_identifier: &str) -> RequestEvent {
    RequestEvent {
        request_identifier: request_identifier.to_string(),
        owner: OwnerRef::User("u_buffer".to_string()),
        api_key_identifier: "key_1".to_string(),
        model_identifier: "gpt-3.5-turbo".to_string(),
        provider_name: "openai".to_string(),
        endpoint: "/v1/chat/completions".to_string(),
        status: RequestStatus::Success,
        status_code: 200,
        duration_milliseconds: 50,
        time_to_first_byte_milliseconds: Some(12),
        output_bytes: 256,
        prompt_tokens: 4,
        completion_tokens: 6,
        billing_source: UsageBillingSource::Allowance,
        cost_cents: 0,
        is_streaming: false,
        chunk_count: 0,
        client_ip: "10.0.0.3".to_string(),
        user_agent: "proving-grounds".to_string(),
        created_at: Utc::now(),
    }
}

#[tokio::test]
async fn certify_shutdown_drain_seals_pending_events() {
    println!("\n💾 [PROVING_GROUNDS]: Auditing RAM buffer drain strata...");

    let client = TursoClient::connect("file:usage_buffer_test?mode=memory&cache=shared", None)
        .await
        .unwrap();
    let usage_repository = Arc::new(UsageRepository::new(client.clone()));
    let usage_buffer = UsageBuffer::new(Arc::clone(&usage_repository));

    // 1. PUBLICACIÓN: tres eventos quedan en RAM.
    usage_buffer.publish(forge_event("req_buf_1"));
    usage_buffer.publish(forge_event("req_buf_2"));
    usage_buffer.publish(forge_event("req_buf_3"));
    assert!(usage_repository.claim_next_job(Utc::now()).await.unwrap().is_none());

    // 2. DRENAJE TERMINAL: el lote cristaliza como un solo trabajo.
    usage_buffer.drain_for_shutdown().await;

    let sealed_job = usage_repository.claim_next_job(Utc::now()).await.unwrap().unwrap();
    assert_eq!(sealed_job.events.len(), 3);
    assert!(sealed_job
        .events
        .iter()
        .any(|event| event.request_identifier == "req_buf_2"));

    // 3. VACÍO: un segundo drenaje no produce trabajos fantasma.
    usage_buffer.drain_for_shutdown().await;
    assert!(usage_repository.claim_next_job(Utc::now()).await.unwrap().is_none());

    println!("   ✅ [SUCCESS]: Buffer drain certified bit-perfect.");
}
