// [tests/mirror/apps/gateway/admission/rate_window.test.rs]
/**
 * =================================================================
 * APARATO: RATE WINDOW MATH TEST (V4.0)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L4-MIRROR
 * RESPONSABILIDAD: CERTIFICACIÓN DE LA ARITMÉTICA DE VENTANAS FIJAS
 * =================================================================
 */

use omniway_domain_models::policy::Policy;
use omniway_gateway::admission::rate_limiter::{window_reset_epochs, RateDecision};
use omniway_gateway::handlers::chat::build_rate_limit_headers;

#[test]
fn certify_window_reset_arithmetic() {
    println!("\n⏳ [PROVING_GROUNDS]: Auditing fixed window arithmetic...");

    // Epoch 3723 = minuto 62, hora 1, día 0.
    let resets = window_reset_epochs(3723);
    assert_eq!(resets[0], 3780, "MINUTE_FAULT: 62 * 60 + 60 expected.");
    assert_eq!(resets[1], 7200, "HOUR_FAULT: next hour boundary expected.");
    assert_eq!(resets[2], 86_400, "DAY_FAULT: next UTC midnight expected.");

    // Frontera exacta: el reset salta a la ventana siguiente completa.
    let boundary_resets = window_reset_epochs(60);
    assert_eq!(boundary_resets[0], 120);

    println!("   ✅ [SUCCESS]: Window arithmetic certified bit-perfect.");
}

#[test]
fn certify_tightest_window_selection_and_retry() {
    let policy = Policy::default_free();

    let decision = RateDecision {
        allowed: false,
        limited_by: Some("minute".to_string()),
        minute_remaining: 0,
        hour_remaining: 12,
        day_remaining: 40,
        minute_reset_epoch: 1060,
        hour_reset_epoch: 3600,
        day_reset_epoch: 86_400,
    };

    // La ventana más estrecha es la de menor cupo restante.
    let (tightest_limit, tightest_remaining, tightest_reset) = decision.tightest_window(&policy);
    assert_eq!(tightest_limit, policy.requests_per_minute);
    assert_eq!(tightest_remaining, 0);
    assert_eq!(tightest_reset, 1060);

    // Retry-After apunta al reset de la ventana agotada (<= 60 s).
    let retry_after = decision.retry_after_seconds(1020);
    assert_eq!(retry_after, 40);
    assert!(retry_after <= 60);
}

#[test]
fn certify_rate_headers_always_present() {
    let policy = Policy::default_free();
    let decision = RateDecision::fail_open(&policy, 1000);

    let headers = build_rate_limit_headers(&decision, &policy);

    // Tripleta principal + variantes por ventana: 12 cabeceras.
    for header_name in [
        "x-ratelimit-limit",
        "x-ratelimit-remaining",
        "x-ratelimit-reset",
        "x-ratelimit-limit-minute",
        "x-ratelimit-remaining-minute",
        "x-ratelimit-reset-minute",
        "x-ratelimit-limit-hour",
        "x-ratelimit-remaining-hour",
        "x-ratelimit-reset-hour",
        "x-ratelimit-limit-day",
        "x-ratelimit-remaining-day",
        "x-ratelimit-reset-day",
    ] {
        assert!(headers.contains_key(header_name), "HEADER_FAULT: '{}' missing.", header_name);
    }

    assert_eq!(headers.get("x-ratelimit-limit-minute").unwrap(), "10");
    assert_eq!(headers.get("x-ratelimit-remaining-day").unwrap(), "100");
}

#[test]
fn certify_fail_open_synthesis() {
    let policy = Policy::default_free();
    let decision = RateDecision::fail_open(&policy, 7261);

    // Fail-open admite con los cupos íntegros del plan.
    assert!(decision.allowed);
    assert!(decision.limited_by.is_none());
    assert_eq!(decision.minute_remaining, policy.requests_per_minute);
    assert_eq!(decision.hour_remaining, policy.requests_per_hour);
    assert_eq!(decision.day_remaining, policy.requests_per_day);
    assert_eq!(decision.minute_reset_epoch, 7320);
}
