// [tests/mirror/libs/infra/db/key_policy.test.rs]
/**
 * =================================================================
 * APARATO: KEY & POLICY RESOLUTION TEST (V4.0)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L3-MIRROR
 * RESPONSABILIDAD: CERTIFICACIÓN DE CREDENCIALES Y TRÍADA DE POLÍTICA
 * =================================================================
 */

use omniway_domain_models::auth::{ApiKeyKind, ApiKeyRecord, KeyLiveness};
use omniway_domain_models::owner::OwnerRef;
use omniway_domain_models::policy::{Policy, SubscriptionStatus};
use omniway_infra_db::repositories::{ApiKeyRepository, PolicyRepository};
use omniway_infra_db::TursoClient;

fn forge_key(hashed_secret: &str) -> ApiKeyRecord {
    ApiKeyRecord {
        api_key_identifier: format!("key_{}", hashed_secret),
        key_kind: ApiKeyKind::User,
        user_identifier: Some("u1".to_string()),
        project_identifier: None,
        hashed_secret: hashed_secret.to_string(),
        key_prefix: "omni_abcd1234".to_string(),
        scopes: vec!["chat".to_string()],
        allowed_models: vec![],
        allowed_ips: vec![],
        is_active: true,
        expires_at: None,
        revoked_at: None,
    }
}

#[tokio::test]
async fn certify_key_lookup_by_digest() {
    println!("\n🔑 [PROVING_GROUNDS]: Auditing digest-only key resolution...");

    let client = TursoClient::connect("file:key_lookup_test?mode=memory&cache=shared", None)
        .await
        .unwrap();
    let repository = ApiKeyRepository::new(client.clone());

    repository.register_key(&forge_key("digest_alpha")).await.unwrap();

    let resolved = repository.find_by_hashed_secret("digest_alpha").await.unwrap().unwrap();
    assert_eq!(resolved.key_prefix, "omni_abcd1234");
    assert_eq!(resolved.scopes, vec!["chat".to_string()]);
    assert_eq!(resolved.liveness(chrono::Utc::now()), KeyLiveness::Alive);

    // Huella desconocida: None, jamás un error.
    assert!(repository.find_by_hashed_secret("digest_ghost").await.unwrap().is_none());

    println!("   ✅ [SUCCESS]: Key resolution certified bit-perfect.");
}

#[tokio::test]
async fn certify_project_org_resolution() {
    let client = TursoClient::connect("file:key_project_test?mode=memory&cache=shared", None)
        .await
        .unwrap();
    let repository = ApiKeyRepository::new(client.clone());

    repository.register_project("proj_1", "org_9").await.unwrap();
    assert_eq!(
        repository.resolve_project_org("proj_1").await.unwrap().as_deref(),
        Some("org_9")
    );
    assert!(repository.resolve_project_org("proj_ghost").await.unwrap().is_none());
}

#[tokio::test]
async fn certify_plan_policy_triad_resolution() {
    let client = TursoClient::connect("file:policy_triad_test?mode=memory&cache=shared", None)
        .await
        .unwrap();
    let repository = PolicyRepository::new(client.clone());
    let principal = OwnerRef::Org("org_pro".to_string());

    // Plan Pro con billetera habilitada.
    let mut pro_template = Policy::default_free();
    pro_template.requests_per_minute = 600;
    pro_template.daily_allowance = 1000;
    pro_template.has_wallet_access = true;
    pro_template.allowed_models = vec![];

    repository.register_plan("plan_pro", "Pro", &pro_template).await.unwrap();
    repository
        .register_subscription("sub_1", &principal, "plan_pro", SubscriptionStatus::Active)
        .await
        .unwrap();

    let resolved_policy = repository.resolve_plan_policy(&principal).await.unwrap().unwrap();
    assert_eq!(resolved_policy.requests_per_minute, 600);
    assert_eq!(resolved_policy.daily_allowance, 1000);
    assert!(resolved_policy.has_wallet_access);
    assert!(!resolved_policy.wallet_locked);
    assert_eq!(resolved_policy.subscription_status, SubscriptionStatus::Active);
}

#[tokio::test]
async fn certify_dead_subscription_yields_none() {
    let client = TursoClient::connect("file:policy_dead_test?mode=memory&cache=shared", None)
        .await
        .unwrap();
    let repository = PolicyRepository::new(client.clone());
    let principal = OwnerRef::User("u_canceled".to_string());

    repository.register_plan("plan_basic", "Basic", &Policy::default_free()).await.unwrap();
    repository
        .register_subscription("sub_dead", &principal, "plan_basic", SubscriptionStatus::Canceled)
        .await
        .unwrap();

    // Estado no facturable: el resolver sintetizará la política libre.
    assert!(repository.resolve_plan_policy(&principal).await.unwrap().is_none());

    // Principal sin suscripción alguna: mismo veredicto.
    let ghost_principal = OwnerRef::User("u_ghost".to_string());
    assert!(repository.resolve_plan_policy(&ghost_principal).await.unwrap().is_none());
}
