// [tests/mirror/libs/shared/heimdall/heimdall_integrity.test.rs]
/**
 * =================================================================
 * APARATO: HEIMDALL INTEGRITY TEST (V3.0)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L4-MIRROR
 * RESPONSABILIDAD: CERTIFICACIÓN DE IGNICIÓN DEL OBSERVADOR
 * =================================================================
 */

use omniway_shared_heimdall::init_tracing;

#[tokio::test]
async fn certify_tracing_ignition_survives_traffic() {
    println!("\n👁️ [PROVING_GROUNDS]: Auditing Heimdall ignition strata...");

    // 1. IGNICIÓN: Un único suscriptor global por proceso de test.
    init_tracing("omniway_gateway_proving_grounds");

    // 2. TRÁFICO: Las macros de rastro no deben colapsar el reactor.
    tracing::info!("🧪 ignition probe");
    tracing::warn!(request_id = "req_test", "🧪 structured field probe");
    tracing::debug!("🧪 silent strata probe");

    // 3. PHOENIX SHIELD: El hook de pánico queda armado sin detonar.
    let panic_hook_armed = std::panic::catch_unwind(|| {}).is_ok();
    assert!(panic_hook_armed, "OBSERVER_FAULT: Panic shield destabilized the runtime.");

    println!("   ✅ [SUCCESS]: Observability strata certified operational.");
}
