// [tests/mirror/libs/domain/billing/decision_parity.test.rs]
/**
 * =================================================================
 * APARATO: BILLING DECISION PARITY TEST (V4.0)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L2-MIRROR
 * RESPONSABILIDAD: CERTIFICACIÓN DE LA GRAMÁTICA CODIFICADA DE CARGOS
 *
 * # Mathematical Proof (Grammar Authority):
 * La forma 'source:charged:remaining:balance' que este dominio emite
 * es exactamente la que el script Lua cachea y re-parsea. Cualquier
 * deriva rompería el replay idempotente (code=2).
 * =================================================================
 */

use omniway_domain_billing::{
    derive_request_price_cents, BillingSource, ChargeCode, ChargeDecision,
};

#[test]
fn certify_wallet_decision_roundtrip() {
    println!("\n💳 [PROVING_GROUNDS]: Auditing encoded decision grammar...");

    let original_decision = ChargeDecision {
        code: ChargeCode::Charged,
        source: BillingSource::Wallet,
        charged_cents: 3,
        allowance_remaining: 0,
        wallet_balance_cents: 497,
    };

    let encoded = original_decision.encode();
    assert_eq!(encoded, "wallet:3:0:497", "GRAMMAR_DRIFT: Encoded shape changed.");

    let replayed = ChargeDecision::parse_replay(&encoded).expect("Replay parse collapsed.");
    assert_eq!(replayed.code, ChargeCode::Replayed);
    assert_eq!(replayed.source, BillingSource::Wallet);
    assert_eq!(replayed.charged_cents, 3);
    assert_eq!(replayed.allowance_remaining, 0);
    assert_eq!(replayed.wallet_balance_cents, 497);

    println!("   ✅ [SUCCESS]: Decision grammar certified bit-perfect.");
}

#[test]
fn certify_allowance_decision_roundtrip() {
    let allowance_decision = ChargeDecision {
        code: ChargeCode::Charged,
        source: BillingSource::Allowance,
        charged_cents: 0,
        allowance_remaining: 99,
        wallet_balance_cents: 0,
    };

    let replayed =
        ChargeDecision::parse_replay(&allowance_decision.encode()).expect("Replay parse collapsed.");
    assert_eq!(replayed.source, BillingSource::Allowance);
    assert_eq!(replayed.allowance_remaining, 99);
}

#[test]
fn certify_malformed_grammar_rejection() {
    assert!(ChargeDecision::parse_replay("").is_none());
    assert!(ChargeDecision::parse_replay("wallet:3:0").is_none());
    assert!(ChargeDecision::parse_replay("unknown_source:3:0:497").is_none());
    assert!(ChargeDecision::parse_replay("wallet:abc:0:497").is_none());
}

#[test]
fn certify_price_derivation_examples() {
    // gpt-3.5 class: 50 + 150 centavos/1M -> 1 centavo por petición.
    assert_eq!(derive_request_price_cents(50, 150), 1);
    // gpt-4 class: 3000 + 6000 -> ceil(9000/1000) = 9.
    assert_eq!(derive_request_price_cents(3000, 6000), 9);
    // Mispriced model: nunca por debajo del piso de 1 centavo.
    assert_eq!(derive_request_price_cents(0, 0), 1);
}
