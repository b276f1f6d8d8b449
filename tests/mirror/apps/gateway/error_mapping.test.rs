// [tests/mirror/apps/gateway/error_mapping.test.rs]
/**
 * =================================================================
 * APARATO: ERROR MAPPING TEST (V4.0)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L4-MIRROR
 * RESPONSABILIDAD: CERTIFICACIÓN DE LA TABLA ESTATUS -> (TYPE, CODE)
 * =================================================================
 */

use axum::body::to_bytes;
use omniway_gateway::errors::{AuthFailure, GatewayError};
use serde_json::Value;

async fn render_to_json(rejection: GatewayError) -> (u16, Value) {
    let response = rejection.render("req_map_test");
    let status_code = response.status().as_u16();
    let raw_body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status_code, serde_json::from_slice(&raw_body).unwrap())
}

#[tokio::test]
async fn certify_status_table_parity() {
    println!("\n🗺️ [PROVING_GROUNDS]: Auditing error mapping table...");

    let mapping_cases: Vec<(GatewayError, u16, &str, &str)> = vec![
        (
            GatewayError::Auth(AuthFailure::Invalid),
            401,
            "authentication_error",
            "invalid_api_key",
        ),
        (
            GatewayError::RateLimited { window: "minute".into(), retry_after_seconds: 42 },
            429,
            "rate_limit_error",
            "rate_limit_exceeded",
        ),
        (
            GatewayError::ConcurrencyExceeded { limit: 2 },
            429,
            "rate_limit_error",
            "concurrency_limit_exceeded",
        ),
        (
            GatewayError::InvalidRequest { message: "bad".into(), param: None },
            400,
            "invalid_request_error",
            "bad_request",
        ),
        (
            GatewayError::ModelNotFound { model: "ghost".into() },
            404,
            "not_found_error",
            "not_found",
        ),
        (GatewayError::WalletLocked, 402, "billing_error", "dispute_pending"),
        (
            GatewayError::InsufficientWallet { wallet_balance_cents: 2, required_cents: 3 },
            402,
            "billing_error",
            "payment_required",
        ),
        (
            GatewayError::BillingUnavailable,
            503,
            "service_unavailable_error",
            "billing_unavailable",
        ),
        (
            GatewayError::CircuitOpen { provider: "openai".into() },
            503,
            "service_unavailable_error",
            "circuit_breaker_open",
        ),
        (GatewayError::IdempotentReplay, 409, "idempotency_error", "request_replayed"),
        (GatewayError::Internal("boom".into()), 500, "api_error", "internal_error"),
    ];

    for (rejection, expected_status, expected_type, expected_code) in mapping_cases {
        let (status_code, body) = render_to_json(rejection).await;
        assert_eq!(status_code, expected_status, "STATUS_FAULT for code '{}'", expected_code);
        assert_eq!(body["error"]["type"], expected_type);
        assert_eq!(body["error"]["code"], expected_code);
        assert_eq!(body["request_id"], "req_map_test");
    }

    println!("   ✅ [SUCCESS]: Mapping table certified bit-perfect.");
}

#[tokio::test]
async fn certify_rate_limited_carries_retry_after_and_param() {
    let rejection =
        GatewayError::RateLimited { window: "minute".into(), retry_after_seconds: 37 };
    let response = rejection.render("req_retry");

    assert_eq!(response.headers().get("retry-after").unwrap(), "37");

    let raw_body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&raw_body).unwrap();
    assert_eq!(body["error"]["param"], "minute");
}

#[tokio::test]
async fn certify_insufficient_wallet_exposes_magnitudes() {
    let (status_code, body) = render_to_json(GatewayError::InsufficientWallet {
        wallet_balance_cents: 2,
        required_cents: 3,
    })
    .await;

    assert_eq!(status_code, 402);
    assert_eq!(body["wallet_balance_cents"], 2);
    assert_eq!(body["required_cents"], 3);
}

#[tokio::test]
async fn certify_upstream_detail_passthrough() {
    let (status_code, body) = render_to_json(GatewayError::Upstream {
        status: 429,
        message: "Rate limit reached for gpt-4o".into(),
        error_type: Some("requests".into()),
        error_code: Some("rate_limit_reached".into()),
    })
    .await;

    // El detalle del proveedor sobrevive el tránsito por el gateway.
    assert_eq!(status_code, 429);
    assert_eq!(body["error"]["type"], "requests");
    assert_eq!(body["error"]["code"], "rate_limit_reached");
    assert_eq!(body["error"]["message"], "Rate limit reached for gpt-4o");
}
