// [tests/mirror/libs/domain/models/policy_defaults.test.rs]
/**
 * =================================================================
 * APARATO: FREE POLICY DEFAULTS TEST (V4.0)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L2-MIRROR
 * RESPONSABILIDAD: CERTIFICACIÓN DE LAS CONSTANTES DEL PLAN LIBRE
 * =================================================================
 */

use omniway_domain_models::policy::{Policy, SubscriptionStatus};

#[test]
fn certify_default_free_policy_constants() {
    println!("\n🪙 [PROVING_GROUNDS]: Auditing free plan sealed constants...");

    let free_policy = Policy::default_free();

    assert_eq!(free_policy.requests_per_minute, 10);
    assert_eq!(free_policy.requests_per_hour, 50);
    assert_eq!(free_policy.requests_per_day, 100);
    assert_eq!(free_policy.daily_allowance, 100);
    assert_eq!(free_policy.max_concurrent_requests, 2);
    assert_eq!(free_policy.max_input_tokens, 4000);
    assert_eq!(free_policy.max_output_tokens, 2000);
    assert_eq!(free_policy.max_body_bytes, 512 * 1024);
    assert!(free_policy.has_streaming);
    assert!(!free_policy.has_wallet_access);
    assert!(!free_policy.wallet_locked);

    println!("   ✅ [SUCCESS]: Free plan constants certified bit-perfect.");
}

#[test]
fn certify_model_allowlist_semantics() {
    let free_policy = Policy::default_free();

    // Los dos modelos del plan libre son admitidos; el resto no.
    assert!(free_policy.permits_model("gpt-3.5-turbo"));
    assert!(free_policy.permits_model("claude-3-haiku"));
    assert!(!free_policy.permits_model("gpt-4o"));

    // Allowlist vacía no restringe.
    let mut unrestricted_policy = Policy::default_free();
    unrestricted_policy.allowed_models.clear();
    assert!(unrestricted_policy.permits_model("gpt-4o"));
}

#[test]
fn certify_billable_subscription_states() {
    assert!(SubscriptionStatus::Active.grants_plan_policy());
    assert!(SubscriptionStatus::Trialing.grants_plan_policy());
    assert!(SubscriptionStatus::PastDue.grants_plan_policy());
    assert!(!SubscriptionStatus::Canceled.grants_plan_policy());
    assert!(!SubscriptionStatus::Unpaid.grants_plan_policy());
    assert!(!SubscriptionStatus::Incomplete.grants_plan_policy());
}
