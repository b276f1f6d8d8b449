// [tests/mirror/libs/infra/db/usage_pipeline.test.rs]
/**
 * =================================================================
 * APARATO: USAGE PIPELINE TEST (V4.0)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L3-MIRROR
 * RESPONSABILIDAD: CERTIFICACIÓN DE DEDUPLICACIÓN Y MONOTONÍA
 *
 * # Mathematical Proof (Monotone Re-Apply):
 * Aplicar el mismo lote n veces debe producir exactamente los
 * agregados de aplicarlo una vez: la deduplicación por request_id
 * dentro de la transacción de grupo lo garantiza.
 * =================================================================
 */

use chrono::{TimeZone, Utc};
use omniway_domain_models::events::{RequestEvent, RequestStatus, UsageBillingSource};
use omniway_domain_models::owner::OwnerRef;
use omniway_infra_db::repositories::{RequestEventRepository, UsageRepository};
use omniway_infra_db::TursoClient;

fn forge_event(request_identifier: &str, status: RequestStatus, cost_cents: i64) -> RequestEvent {
    RequestEvent {
        request_identifier: request_identifier.to_string(),
        owner: OwnerRef::User("u1".to_string()),
        api_key_identifier: "key_1".to_string(),
        model_identifier: "gpt-3.5-turbo".to_string(),
        provider_name: "openai".to_string(),
        endpoint: "/v1/chat/completions".to_string(),
        status,
        status_code: if status == RequestStatus::Success { 200 } else { 502 },
        duration_milliseconds: 120,
        time_to_first_byte_milliseconds: Some(45),
        output_bytes: 2048,
        prompt_tokens: 10,
        completion_tokens: 20,
        billing_source: if cost_cents > 0 {
            UsageBillingSource::Wallet
        } else {
            UsageBillingSource::Allowance
        },
        cost_cents,
        is_streaming: false,
        chunk_count: 0,
        client_ip: "10.0.0.1".to_string(),
        user_agent: "proving-grounds".to_string(),
        created_at: Utc.with_ymd_and_hms(2026, 3, 14, 12, 0, 0).unwrap(),
    }
}

#[tokio::test]
async fn certify_monotone_aggregation_under_reapply() {
    println!("\n📊 [PROVING_GROUNDS]: Auditing monotone aggregation strata...");

    let client = TursoClient::connect("file:usage_pipeline_test?mode=memory&cache=shared", None)
        .await
        .unwrap();
    let usage_repository = UsageRepository::new(client.clone());

    let batch = vec![
        forge_event("req_a", RequestStatus::Success, 0),
        forge_event("req_b", RequestStatus::Success, 3),
        forge_event("req_c", RequestStatus::UpstreamError, 0),
    ];

    // 1. PRIMERA APLICACIÓN: tres filas nuevas.
    let first_application = usage_repository.apply_event_batch(&batch).await.unwrap();
    assert_eq!(first_application.inserted_events, 3);
    assert_eq!(first_application.duplicate_events, 0);

    // 2. RE-APLICACIÓN ÍNTEGRA: cero deltas.
    let second_application = usage_repository.apply_event_batch(&batch).await.unwrap();
    assert_eq!(second_application.inserted_events, 0);
    assert_eq!(second_application.duplicate_events, 3);

    // 3. AGREGADO: idéntico al de una sola aplicación.
    let principal = OwnerRef::User("u1".to_string());
    let daily = usage_repository.fetch_daily(&principal, "2026-03-14").await.unwrap().unwrap();
    assert_eq!(daily.request_count, 3, "MONOTONE_FAULT: Re-apply double-counted.");
    assert_eq!(daily.success_count, 2);
    assert_eq!(daily.error_count, 1);
    assert_eq!(daily.input_tokens, 30);
    assert_eq!(daily.output_tokens, 60);
    assert_eq!(daily.cost_cents, 3);
    assert_eq!(daily.allowance_used, 2);

    println!("   ✅ [SUCCESS]: Aggregation monotonicity certified bit-perfect.");
}

#[tokio::test]
async fn certify_partial_batch_completion() {
    let client = TursoClient::connect("file:usage_partial_test?mode=memory&cache=shared", None)
        .await
        .unwrap();
    let usage_repository = UsageRepository::new(client.clone());

    // Lote reintentado donde la mitad ya fue aplicada.
    let first_half = vec![forge_event("req_x", RequestStatus::Success, 2)];
    usage_repository.apply_event_batch(&first_half).await.unwrap();

    let retried_batch = vec![
        forge_event("req_x", RequestStatus::Success, 2),
        forge_event("req_y", RequestStatus::Success, 2),
    ];
    let application = usage_repository.apply_event_batch(&retried_batch).await.unwrap();
    assert_eq!(application.inserted_events, 1);
    assert_eq!(application.duplicate_events, 1);

    let principal = OwnerRef::User("u1".to_string());
    let daily = usage_repository.fetch_daily(&principal, "2026-03-14").await.unwrap().unwrap();
    assert_eq!(daily.request_count, 2);
    assert_eq!(daily.cost_cents, 4);
}

#[tokio::test]
async fn certify_event_row_uniqueness() {
    let client = TursoClient::connect("file:usage_unique_test?mode=memory&cache=shared", None)
        .await
        .unwrap();
    let event_repository = RequestEventRepository::new(client.clone());

    let event = forge_event("req_dup", RequestStatus::Success, 0);
    assert!(event_repository.insert_event(&event).await.unwrap());
    assert!(!event_repository.insert_event(&event).await.unwrap(), "DEDUP_FAULT: Duplicate row.");
    assert!(event_repository.event_exists("req_dup").await.unwrap());
    assert_eq!(event_repository.count_events_for_owner("user", "u1").await.unwrap(), 1);
}
