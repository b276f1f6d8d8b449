// [tests/mirror/libs/infra/db/usage_queue.test.rs]
/**
 * =================================================================
 * APARATO: USAGE QUEUE LIFECYCLE TEST (V4.0)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L3-MIRROR
 * RESPONSABILIDAD: CERTIFICACIÓN DE RECLAMO, BACKOFF Y DEAD-LETTER
 * =================================================================
 */

use chrono::{Duration, TimeZone, Utc};
use omniway_domain_models::events::{RequestEvent, RequestStatus, UsageBillingSource};
use omniway_domain_models::owner::OwnerRef;
use omniway_infra_db::repositories::UsageRepository;
use omniway_infra_db::TursoClient;

fn forge_event(request_identifier: &str) -> RequestEvent {
    RequestEvent {
        request_identifier: request_identifier.to_string(),
        owner: OwnerRef::User("u1".to_string()),
        api_key_identifier: "key_1".to_string(),
        model_identifier: "gpt-3.5-turbo".to_string(),
        provider_name: "openai".to_string(),
        endpoint: "/v1/chat/completions".to_string(),
        status: RequestStatus::Success,
        status_code: 200,
        duration_milliseconds: 80,
        time_to_first_byte_milliseconds: None,
        output_bytes: 512,
        prompt_tokens: 5,
        completion_tokens: 7,
        billing_source: UsageBillingSource::Allowance,
        cost_cents: 0,
        is_streaming: false,
        chunk_count: 0,
        client_ip: "10.0.0.2".to_string(),
        user_agent: "proving-grounds".to_string(),
        created_at: Utc.with_ymd_and_hms(2026, 3, 14, 9, 0, 0).unwrap(),
    }
}

#[tokio::test]
async fn certify_claim_and_seal_lifecycle() {
    println!("\n📦 [PROVING_GROUNDS]: Auditing durable queue lifecycle...");

    let client = TursoClient::connect("file:usage_queue_test?mode=memory&cache=shared", None)
        .await
        .unwrap();
    let repository = UsageRepository::new(client.clone());

    let batch = vec![forge_event("req_q1"), forge_event("req_q2")];
    let job_identifier = repository.enqueue_batch(&batch).await.unwrap();

    // 1. RECLAMO: el trabajo sale con su payload rehidratado.
    let claimed = repository.claim_next_job(Utc::now()).await.unwrap().unwrap();
    assert_eq!(claimed.job_identifier, job_identifier);
    assert_eq!(claimed.events.len(), 2);
    assert_eq!(claimed.attempts, 0);

    // 2. EXCLUSIVIDAD: un segundo reclamo no ve nada.
    assert!(repository.claim_next_job(Utc::now()).await.unwrap().is_none());

    // 3. SELLADO: el trabajo desaparece de la cola.
    repository.seal_job(&job_identifier).await.unwrap();
    assert!(repository.claim_next_job(Utc::now()).await.unwrap().is_none());

    println!("   ✅ [SUCCESS]: Queue lifecycle certified bit-perfect.");
}

#[tokio::test]
async fn certify_retry_backoff_visibility() {
    let client = TursoClient::connect("file:usage_retry_test?mode=memory&cache=shared", None)
        .await
        .unwrap();
    let repository = UsageRepository::new(client.clone());

    let job_identifier = repository.enqueue_batch(&[forge_event("req_r1")]).await.unwrap();
    let claimed = repository.claim_next_job(Utc::now()).await.unwrap().unwrap();

    // Reintento agendado 30 s en el futuro.
    let next_attempt_at = Utc::now() + Duration::seconds(30);
    repository
        .schedule_retry(&claimed.job_identifier, next_attempt_at, "durable hiccup")
        .await
        .unwrap();

    // Invisible antes del horizonte; visible después con attempts=1.
    assert!(repository.claim_next_job(Utc::now()).await.unwrap().is_none());
    let reclaimed = repository
        .claim_next_job(Utc::now() + Duration::seconds(60))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reclaimed.job_identifier, job_identifier);
    assert_eq!(reclaimed.attempts, 1);
}

#[tokio::test]
async fn certify_dead_letter_governance() {
    let client = TursoClient::connect("file:usage_dead_test?mode=memory&cache=shared", None)
        .await
        .unwrap();
    let repository = UsageRepository::new(client.clone());

    let job_identifier = repository.enqueue_batch(&[forge_event("req_d1")]).await.unwrap();
    let claimed = repository.claim_next_job(Utc::now()).await.unwrap().unwrap();

    repository.dead_letter_job(&claimed.job_identifier, "schema collapsed").await.unwrap();

    // El muerto no vuelve a la cola pero queda inspeccionable.
    assert!(repository.claim_next_job(Utc::now()).await.unwrap().is_none());
    let dead_inventory = repository.list_dead_jobs(10).await.unwrap();
    assert_eq!(dead_inventory.len(), 1);
    assert_eq!(dead_inventory[0].0, job_identifier);
    assert!(dead_inventory[0].1.contains("schema collapsed"));

    // Purga: intocado dentro de la retención, purgado después de 7 días.
    assert_eq!(repository.purge_expired_dead_jobs(Utc::now()).await.unwrap(), 0);
    let beyond_retention = Utc::now() + Duration::days(8);
    assert_eq!(repository.purge_expired_dead_jobs(beyond_retention).await.unwrap(), 1);
    assert!(repository.list_dead_jobs(10).await.unwrap().is_empty());
}
