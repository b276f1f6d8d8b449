// [tests/mirror/libs/infra/db/wallet_ledger.test.rs]
/**
 * =================================================================
 * APARATO: WALLET LEDGER TEST (V4.0)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L3-MIRROR
 * RESPONSABILIDAD: CERTIFICACIÓN DE RECONCILIACIÓN Y FIRMAS DEL LEDGER
 * =================================================================
 */

use omniway_domain_models::owner::OwnerRef;
use omniway_domain_models::wallet::{LedgerTxType, MAX_WALLET_BALANCE_CENTS};
use omniway_infra_db::repositories::WalletRepository;
use omniway_infra_db::{DbError, TursoClient};

#[tokio::test]
async fn certify_ledger_reconciliation_invariant() {
    println!("\n⚖️ [PROVING_GROUNDS]: Auditing signed ledger reconciliation...");

    let client = TursoClient::connect("file:wallet_ledger_test?mode=memory&cache=shared", None)
        .await
        .unwrap();
    let repository = WalletRepository::new(client.clone());
    let principal = OwnerRef::User("u1".to_string());

    // 1. ESCENARIO: recarga 500, cargo 3, reembolso 3.
    let balance_after_topup = repository.apply_topup(&principal, 500, "pay_abc").await.unwrap();
    assert_eq!(balance_after_topup, 500);

    let balance_after_charge =
        repository.apply_charge(&principal, 3, "req_1", "gpt-4o").await.unwrap();
    assert_eq!(balance_after_charge, 497);

    let balance_after_refund =
        repository.apply_refund(&principal, 3, "req_1", "ttfb_zero").await.unwrap();
    assert_eq!(balance_after_refund, 500);

    // 2. INVARIANTE: suma firmada del ledger == balance vigente.
    let signed_sum = repository.signed_ledger_sum(&principal).await.unwrap();
    let snapshot = repository.fetch_snapshot(&principal).await.unwrap().unwrap();
    assert_eq!(signed_sum, snapshot.balance_cents, "LEDGER_DRIFT: Reconciliation violated.");
    assert_eq!(snapshot.total_topup_cents, 500);
    assert_eq!(snapshot.total_spent_cents, 3);

    // 3. RASTRO: tipos y correlación de request presentes.
    let ledger_trail = repository.list_ledger(&principal, 10).await.unwrap();
    assert_eq!(ledger_trail.len(), 3);
    assert!(ledger_trail.iter().any(|entry| entry.tx_type == LedgerTxType::Charge
        && entry.amount_cents == -3
        && entry.request_identifier.as_deref() == Some("req_1")));
    assert!(ledger_trail.iter().any(|entry| entry.tx_type == LedgerTxType::Refund
        && entry.amount_cents == 3));

    println!("   ✅ [SUCCESS]: Ledger reconciliation certified bit-perfect.");
}

#[tokio::test]
async fn certify_charge_uniqueness_per_request() {
    let client = TursoClient::connect("file:wallet_unique_test?mode=memory&cache=shared", None)
        .await
        .unwrap();
    let repository = WalletRepository::new(client.clone());
    let principal = OwnerRef::Org("o1".to_string());

    repository.apply_topup(&principal, 100, "pay_x").await.unwrap();
    repository.apply_charge(&principal, 5, "req_unique", "gpt-4o").await.unwrap();

    // El motor de facturación garantiza un cargo por request_id vía la
    // clave de idempotencia caliente; el Ledger Durable lo evidencia.
    let charge_rows = repository.charge_row_count_for_request("req_unique").await.unwrap();
    assert_eq!(charge_rows, 1);
}

#[tokio::test]
async fn certify_balance_ceiling_enforcement() {
    let client = TursoClient::connect("file:wallet_ceiling_test?mode=memory&cache=shared", None)
        .await
        .unwrap();
    let repository = WalletRepository::new(client.clone());
    let principal = OwnerRef::User("u_ceiling".to_string());

    repository.apply_topup(&principal, 100, "pay_seed").await.unwrap();

    let overflow_attempt =
        repository.apply_topup(&principal, MAX_WALLET_BALANCE_CENTS, "pay_overflow").await;
    assert!(matches!(overflow_attempt, Err(DbError::BalanceCeilingExceeded)));

    // El colapso no dejó rastro: balance y ledger intactos.
    let snapshot = repository.fetch_snapshot(&principal).await.unwrap().unwrap();
    assert_eq!(snapshot.balance_cents, 100);
    let signed_sum = repository.signed_ledger_sum(&principal).await.unwrap();
    assert_eq!(signed_sum, 100);
}

#[tokio::test]
async fn certify_lock_cycle_with_audit_trail() {
    let client = TursoClient::connect("file:wallet_lock_test?mode=memory&cache=shared", None)
        .await
        .unwrap();
    let repository = WalletRepository::new(client.clone());
    let principal = OwnerRef::User("u_dispute".to_string());

    repository.set_lock(&principal, "chargeback_dispute", Some("dp_77")).await.unwrap();
    let locked_snapshot = repository.fetch_snapshot(&principal).await.unwrap().unwrap();
    assert!(locked_snapshot.is_locked);
    assert_eq!(locked_snapshot.lock_reason.as_deref(), Some("chargeback_dispute"));

    repository.clear_lock(&principal, "dispute_won").await.unwrap();
    let released_snapshot = repository.fetch_snapshot(&principal).await.unwrap().unwrap();
    assert!(!released_snapshot.is_locked);

    // Dos filas de auditoría de monto cero sellan el ciclo.
    let ledger_trail = repository.list_ledger(&principal, 10).await.unwrap();
    let audit_rows = ledger_trail
        .iter()
        .filter(|entry| entry.tx_type == LedgerTxType::AdminAdjustment && entry.amount_cents == 0)
        .count();
    assert_eq!(audit_rows, 2);
}
