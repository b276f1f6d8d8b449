// [tests/mirror/apps/gateway/admission/circuit_machine.test.rs]
/**
 * =================================================================
 * APARATO: CIRCUIT STATE MACHINE TEST (V4.0)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L4-MIRROR
 * RESPONSABILIDAD: CERTIFICACIÓN DE TRANSICIONES CLOSED/OPEN/HALF-OPEN
 * =================================================================
 */

use omniway_gateway::admission::circuit::{
    evaluate_admission, register_failure, CircuitBlob, CircuitStatus, CircuitVerdict,
    FAILURE_THRESHOLD, RESET_WINDOW_MILLISECONDS,
};

#[test]
fn certify_threshold_opens_the_circuit() {
    println!("\n🛑 [PROVING_GROUNDS]: Auditing circuit threshold strata...");

    let mut blob = CircuitBlob::default();
    let probe_instant: i64 = 1_000_000;

    // Fallas consecutivas por debajo del umbral: el circuito respira.
    for _ in 0..(FAILURE_THRESHOLD - 1) {
        blob = register_failure(&blob, probe_instant);
        assert_eq!(blob.status, CircuitStatus::Closed);
    }
    assert_eq!(blob.failures, FAILURE_THRESHOLD - 1);

    // La falla del umbral abre con ventana de reinicio fresca.
    blob = register_failure(&blob, probe_instant);
    assert_eq!(blob.status, CircuitStatus::Open);
    assert_eq!(blob.next_retry_epoch_ms, probe_instant + RESET_WINDOW_MILLISECONDS);

    println!("   ✅ [SUCCESS]: Threshold transition certified bit-perfect.");
}

#[test]
fn certify_open_denies_until_retry_horizon() {
    let mut blob = CircuitBlob::default();
    blob.status = CircuitStatus::Open;
    blob.next_retry_epoch_ms = 2_000_000;

    // Antes del horizonte: denegación sin transición.
    let (early_verdict, early_transition) = evaluate_admission(&blob, 1_999_999);
    assert_eq!(early_verdict, CircuitVerdict::Deny);
    assert!(early_transition.is_none());

    // En el horizonte exacto: la petición cruza como sonda half-open.
    let (probe_verdict, probe_transition) = evaluate_admission(&blob, 2_000_000);
    assert_eq!(probe_verdict, CircuitVerdict::AdmitProbe);
    assert_eq!(probe_transition.unwrap().status, CircuitStatus::HalfOpen);
}

#[test]
fn certify_half_open_single_probe_discipline() {
    let mut blob = CircuitBlob::default();
    blob.status = CircuitStatus::HalfOpen;

    // Con la sonda en vuelo, el resto del tráfico espera.
    let (verdict, transition) = evaluate_admission(&blob, 5_000_000);
    assert_eq!(verdict, CircuitVerdict::Deny);
    assert!(transition.is_none());
}

#[test]
fn certify_probe_failure_reopens_fresh_window() {
    let mut blob = CircuitBlob::default();
    blob.status = CircuitStatus::HalfOpen;
    blob.failures = FAILURE_THRESHOLD;

    let reopen_instant: i64 = 9_000_000;
    let reopened = register_failure(&blob, reopen_instant);

    assert_eq!(reopened.status, CircuitStatus::Open);
    assert_eq!(reopened.next_retry_epoch_ms, reopen_instant + RESET_WINDOW_MILLISECONDS);
    assert_eq!(reopened.last_failure_epoch_ms, reopen_instant);
}

#[test]
fn certify_closed_circuit_admits() {
    let blob = CircuitBlob::default();
    let (verdict, transition) = evaluate_admission(&blob, 0);
    assert_eq!(verdict, CircuitVerdict::Admit);
    assert!(transition.is_none());
}
