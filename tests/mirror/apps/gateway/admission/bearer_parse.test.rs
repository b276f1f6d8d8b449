// [tests/mirror/apps/gateway/admission/bearer_parse.test.rs]
/**
 * =================================================================
 * APARATO: BEARER PARSE & DIGEST TEST (V4.0)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L4-MIRROR
 * RESPONSABILIDAD: CERTIFICACIÓN DEL PARSEO Y HUELLA DE CREDENCIALES
 * =================================================================
 */

use omniway_gateway::admission::auth::{digest_secret, extract_bearer_secret};
use omniway_gateway::errors::GatewayError;

#[test]
fn certify_bearer_extraction_ladder() {
    println!("\n🔐 [PROVING_GROUNDS]: Auditing bearer extraction strata...");

    // 1. FORMA CANÓNICA: esquema Bearer + prefijo omni_.
    let secret = extract_bearer_secret(Some("Bearer omni_dGVzdF9zZWNyZXQ")).unwrap();
    assert_eq!(secret, "omni_dGVzdF9zZWNyZXQ");

    // 2. ESCALERA DE RECHAZOS: todas colapsan a invalid_format.
    let rejection_cases = [
        None,
        Some("omni_raw_without_scheme"),
        Some("Basic b21uaV9hYmM="),
        Some("Bearer sk-openai-shaped-token"),
        Some("Bearer "),
    ];

    for rejected_header in rejection_cases {
        let verdict = extract_bearer_secret(rejected_header);
        assert!(
            matches!(verdict, Err(GatewayError::Auth(_))),
            "FORMAT_FAULT: '{:?}' should have been rejected.",
            rejected_header
        );
    }

    println!("   ✅ [SUCCESS]: Extraction ladder certified bit-perfect.");
}

#[test]
fn certify_digest_is_deterministic_hex_sha256() {
    let first_digest = digest_secret("omni_dGVzdF9zZWNyZXQ");
    let second_digest = digest_secret("omni_dGVzdF9zZWNyZXQ");

    // Determinista, 64 nibbles hexadecimales, sensible al secreto.
    assert_eq!(first_digest, second_digest);
    assert_eq!(first_digest.len(), 64);
    assert!(first_digest.chars().all(|nibble| nibble.is_ascii_hexdigit()));
    assert_ne!(first_digest, digest_secret("omni_otro_secreto"));
}
