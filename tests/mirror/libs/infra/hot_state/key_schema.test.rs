// [tests/mirror/libs/infra/hot_state/key_schema.test.rs]
/**
 * =================================================================
 * APARATO: HOT-STATE KEY SCHEMA TEST (V4.0)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L3-MIRROR
 * RESPONSABILIDAD: CERTIFICACIÓN DEL ESQUEMA CANÓNICO DE CLAVES
 * =================================================================
 */

use omniway_domain_models::owner::OwnerRef;
use omniway_infra_hotstate::keys;

#[test]
fn certify_owner_partitioned_key_grammar() {
    println!("\n🗝️ [PROVING_GROUNDS]: Auditing hot-state key schema...");

    let user_principal = OwnerRef::User("u1".to_string());
    let org_principal = OwnerRef::Org("o9".to_string());

    assert_eq!(keys::policy_key(&user_principal), "policy:user:u1");
    assert_eq!(keys::policy_key(&org_principal), "policy:org:o9");
    assert_eq!(keys::wallet_key(&user_principal), "wallet:user:u1");
    assert_eq!(keys::wallet_lock_key(&user_principal), "wallet:user:u1:locked");
    assert_eq!(keys::allowance_key(&user_principal, "20260314"), "allowance:user:u1:20260314");
    assert_eq!(keys::concurrency_key(&org_principal), "concurrency:org:o9");
    assert_eq!(keys::concurrency_registry_key(&org_principal), "concurrency:req:org:o9");
    assert_eq!(
        keys::billing_idempotency_key(&user_principal, "req_1"),
        "idem:billing:user:u1:req_1"
    );
    assert_eq!(
        keys::refund_idempotency_key(&org_principal, "req_2"),
        "idem:refund:org:o9:req_2"
    );
    assert_eq!(keys::refund_count_key(&user_principal, "20260314"), "refund:user:u1:20260314");

    println!("   ✅ [SUCCESS]: Key schema certified bit-perfect.");
}

#[test]
fn certify_window_and_catalog_keys() {
    let principal = OwnerRef::User("u1".to_string());

    // Ventana de 60 s, bucket 28954321.
    assert_eq!(keys::rate_limit_key(&principal, 60, 28_954_321), "rl:user:u1:60:28954321");
    assert_eq!(keys::auth_key("deadbeef"), "auth:key:deadbeef");
    assert_eq!(keys::catalog_key("gpt-4o"), "catalog:model:gpt-4o");
    assert_eq!(keys::pricing_key("gpt-4o"), "pricing:gpt-4o");
    assert_eq!(keys::circuit_key("openai"), "circuit:openai");
}

#[test]
fn certify_same_raw_id_never_collides_across_variants() {
    let user_principal = OwnerRef::User("shared".to_string());
    let org_principal = OwnerRef::Org("shared".to_string());

    assert_ne!(keys::wallet_key(&user_principal), keys::wallet_key(&org_principal));
    assert_ne!(
        keys::allowance_key(&user_principal, "20260101"),
        keys::allowance_key(&org_principal, "20260101")
    );
}
