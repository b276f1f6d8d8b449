// [tests/mirror/apps/gateway/admission/dispatch_validation.test.rs]
/**
 * =================================================================
 * APARATO: PRE-DISPATCH VALIDATION TEST (V4.0)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L4-MIRROR
 * RESPONSABILIDAD: CERTIFICACIÓN DE CLAMPS Y REESCRITURA UPSTREAM
 * =================================================================
 */

use omniway_domain_models::catalog::ModelRecord;
use omniway_domain_models::openai::ChatCompletionRequest;
use omniway_domain_models::policy::Policy;
use omniway_gateway::admission::dispatch::{
    effective_output_ceiling, rewrite_for_upstream, validate_for_dispatch,
};
use omniway_gateway::errors::GatewayError;
use serde_json::json;

fn forge_model(max_output_tokens: i64) -> ModelRecord {
    ModelRecord {
        model_identifier: "gpt-4o".to_string(),
        upstream_model_identifier: "gpt-4o-2024-11-20".to_string(),
        provider_name: "openai".to_string(),
        supports_streaming: true,
        supports_vision: false,
        supports_tools: true,
        supports_function_call: true,
        supports_json_mode: true,
        context_window_tokens: 128_000,
        max_output_tokens,
        is_active: true,
        is_deprecated: false,
    }
}

fn forge_request(body: serde_json::Value) -> ChatCompletionRequest {
    serde_json::from_value(body).expect("request forge collapsed")
}

#[test]
fn certify_output_ceiling_is_min_of_positive_limits() {
    println!("\n📐 [PROVING_GROUNDS]: Auditing output ceiling strata...");

    let policy = Policy::default_free(); // techo de política: 2000

    assert_eq!(effective_output_ceiling(&policy, &forge_model(4096)), Some(2000));
    assert_eq!(effective_output_ceiling(&policy, &forge_model(1024)), Some(1024));
    // Techo de modelo no positivo: solo restringe la política.
    assert_eq!(effective_output_ceiling(&policy, &forge_model(0)), Some(2000));

    println!("   ✅ [SUCCESS]: Ceiling arithmetic certified bit-perfect.");
}

#[test]
fn certify_max_tokens_clamp_rejection() {
    let policy = Policy::default_free();
    let model = forge_model(4096);

    let oversized_request = forge_request(json!({
        "model": "gpt-4o",
        "max_tokens": 3000,
        "messages": [{ "role": "user", "content": "hola" }]
    }));

    let verdict = validate_for_dispatch(&oversized_request, &policy, &model);
    assert!(matches!(
        verdict,
        Err(GatewayError::InvalidRequest { ref param, .. }) if param.as_deref() == Some("max_tokens")
    ));

    let compliant_request = forge_request(json!({
        "model": "gpt-4o",
        "max_tokens": 2000,
        "messages": [{ "role": "user", "content": "hola" }]
    }));
    assert!(validate_for_dispatch(&compliant_request, &policy, &model).is_ok());
}

#[test]
fn certify_input_estimate_rejection() {
    let mut tight_policy = Policy::default_free();
    tight_policy.max_input_tokens = 4; // 16 bytes de contenido

    let verbose_request = forge_request(json!({
        "model": "gpt-4o",
        "messages": [{ "role": "user", "content": "this content is far too long" }]
    }));

    let verdict = validate_for_dispatch(&verbose_request, &tight_policy, &forge_model(4096));
    assert!(matches!(
        verdict,
        Err(GatewayError::InvalidRequest { ref param, .. }) if param.as_deref() == Some("messages")
    ));
}

#[test]
fn certify_empty_messages_rejection() {
    let empty_request = forge_request(json!({
        "model": "gpt-4o",
        "messages": []
    }));

    let verdict =
        validate_for_dispatch(&empty_request, &Policy::default_free(), &forge_model(4096));
    assert!(matches!(verdict, Err(GatewayError::InvalidRequest { .. })));
}

#[test]
fn certify_upstream_rewrite_preserves_passthrough() {
    let request = forge_request(json!({
        "model": "gpt-4o",
        "temperature": 0.3,
        "stream": true,
        "messages": [{ "role": "user", "content": "hola" }]
    }));

    let upstream_body = rewrite_for_upstream(&request, &forge_model(4096)).unwrap();

    // Solo el identificador de modelo cambia; el resto viaja intacto.
    assert_eq!(upstream_body["model"], json!("gpt-4o-2024-11-20"));
    assert_eq!(upstream_body["temperature"], json!(0.3));
    assert_eq!(upstream_body["stream"], json!(true));
    assert_eq!(upstream_body["messages"][0]["content"], json!("hola"));
}
