// [libs/infra/db/src/repositories/wallet.rs]
/*!
 * =================================================================
 * APARATO: WALLET LEDGER REPOSITORY (V4.3 - GATEWAY MASTER)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: MUTACIONES DURABLES DE BILLETERA CON LEDGER FIRMADO
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. ATOMIC ROW + LEDGER: Cada mutación financiera es una transacción
 *    corta que actualiza la fila de billetera y apendiza su fila de
 *    ledger; nunca una sin la otra.
 * 2. CEILING ENFORCEMENT: Las recargas respetan el techo 2^53-1 para
 *    mantener la aritmética representable en clientes IEEE-754.
 *
 * # Mathematical Proof (Ledger Reconciliation):
 * Tras cada transacción comprometida, la suma de amount_cents del
 * ledger de un principal es igual a balance_cents de su billetera.
 * =================================================================
 */

use crate::errors::DbError;
use crate::repositories::parse_stored_timestamp;
use crate::TursoClient;
use chrono::Utc;
use libsql::{params, Transaction};
use omniway_domain_models::owner::OwnerRef;
use omniway_domain_models::wallet::{
    LedgerEntry, LedgerTxType, WalletSnapshot, MAX_WALLET_BALANCE_CENTS,
};
use tracing::{info, instrument};
use uuid::Uuid;

pub struct WalletRepository {
    database_client: TursoClient,
}

impl WalletRepository {
    pub fn new(client: TursoClient) -> Self {
        Self { database_client: client }
    }

    /// Snapshot durable de la billetera de un principal.
    #[instrument(skip(self), fields(owner = %owner))]
    pub async fn fetch_snapshot(&self, owner: &OwnerRef) -> Result<Option<WalletSnapshot>, DbError> {
        let database_connection = self.database_client.get_connection()?;

        let mut query_results = database_connection
            .query(
                "SELECT balance_cents, is_locked, lock_reason, locked_at,
                        total_topup_cents, total_spent_cents, last_reconciled_at
                 FROM wallets WHERE owner_type = ?1 AND owner_id = ?2",
                params![owner.variant_label(), owner.identifier()],
            )
            .await?;

        let data_row = match query_results.next().await? {
            Some(row) => row,
            None => return Ok(None),
        };

        Ok(Some(WalletSnapshot {
            balance_cents: data_row.get::<i64>(0)?,
            is_locked: data_row.get::<i64>(1)? != 0,
            lock_reason: data_row.get::<Option<String>>(2)?,
            locked_at: parse_stored_timestamp(data_row.get::<Option<String>>(3)?),
            total_topup_cents: data_row.get::<i64>(4)?,
            total_spent_cents: data_row.get::<i64>(5)?,
            last_reconciled_at: parse_stored_timestamp(data_row.get::<Option<String>>(6)?),
        }))
    }

    /**
     * Cargo durable sincrónico (éxitos wallet-source del motor de
     * facturación): debita balance, acumula total_spent y apendiza
     * la fila CHARGE con correlación de request.
     *
     * Retorna el balance posterior comprometido.
     */
    #[instrument(skip(self), fields(owner = %owner))]
    pub async fn apply_charge(
        &self,
        owner: &OwnerRef,
        price_cents: i64,
        request_identifier: &str,
        model_identifier: &str,
    ) -> Result<i64, DbError> {
        let database_connection = self.database_client.get_connection()?;
        let financial_transaction = database_connection
            .transaction()
            .await
            .map_err(|_| DbError::TransactionError)?;

        let affected_rows = financial_transaction
            .execute(
                "UPDATE wallets
                 SET balance_cents = balance_cents - ?3,
                     total_spent_cents = total_spent_cents + ?3
                 WHERE owner_type = ?1 AND owner_id = ?2",
                params![owner.variant_label(), owner.identifier(), price_cents],
            )
            .await?;

        if affected_rows == 0 {
            return Err(DbError::WalletNotFound);
        }

        let balance_after = read_balance(&financial_transaction, owner).await?;

        append_ledger_row(
            &financial_transaction,
            owner,
            LedgerTxType::Charge,
            -price_cents,
            balance_after,
            Some(request_identifier),
            &format!("CHARGE model={}", model_identifier),
        )
        .await?;

        financial_transaction.commit().await.map_err(|_| DbError::TransactionError)?;
        Ok(balance_after)
    }

    /**
     * Recarga durable: upsert de billetera, techo de balance y fila TOPUP.
     */
    #[instrument(skip(self), fields(owner = %owner))]
    pub async fn apply_topup(
        &self,
        owner: &OwnerRef,
        amount_cents: i64,
        payment_reference: &str,
    ) -> Result<i64, DbError> {
        let database_connection = self.database_client.get_connection()?;
        let financial_transaction = database_connection
            .transaction()
            .await
            .map_err(|_| DbError::TransactionError)?;

        financial_transaction
            .execute(
                "INSERT OR IGNORE INTO wallets (owner_type, owner_id) VALUES (?1, ?2)",
                params![owner.variant_label(), owner.identifier()],
            )
            .await?;

        let balance_before = read_balance(&financial_transaction, owner).await?;
        if balance_before.saturating_add(amount_cents) > MAX_WALLET_BALANCE_CENTS {
            return Err(DbError::BalanceCeilingExceeded);
        }

        financial_transaction
            .execute(
                "UPDATE wallets
                 SET balance_cents = balance_cents + ?3,
                     total_topup_cents = total_topup_cents + ?3
                 WHERE owner_type = ?1 AND owner_id = ?2",
                params![owner.variant_label(), owner.identifier(), amount_cents],
            )
            .await?;

        let balance_after = balance_before + amount_cents;

        append_ledger_row(
            &financial_transaction,
            owner,
            LedgerTxType::Topup,
            amount_cents,
            balance_after,
            None,
            &format!("TOPUP ref={}", payment_reference),
        )
        .await?;

        financial_transaction.commit().await.map_err(|_| DbError::TransactionError)?;
        info!("💰 [WALLET_TOPUP]: {} credited with {} cents.", owner, amount_cents);
        Ok(balance_after)
    }

    /**
     * Reembolso durable: acredita balance y apendiza la fila REFUND
     * con correlación de request.
     */
    #[instrument(skip(self), fields(owner = %owner))]
    pub async fn apply_refund(
        &self,
        owner: &OwnerRef,
        amount_cents: i64,
        request_identifier: &str,
        refund_reason: &str,
    ) -> Result<i64, DbError> {
        let database_connection = self.database_client.get_connection()?;
        let financial_transaction = database_connection
            .transaction()
            .await
            .map_err(|_| DbError::TransactionError)?;

        let affected_rows = financial_transaction
            .execute(
                "UPDATE wallets SET balance_cents = balance_cents + ?3
                 WHERE owner_type = ?1 AND owner_id = ?2",
                params![owner.variant_label(), owner.identifier(), amount_cents],
            )
            .await?;

        if affected_rows == 0 {
            return Err(DbError::WalletNotFound);
        }

        let balance_after = read_balance(&financial_transaction, owner).await?;

        append_ledger_row(
            &financial_transaction,
            owner,
            LedgerTxType::Refund,
            amount_cents,
            balance_after,
            Some(request_identifier),
            &format!("REFUND reason={}", refund_reason),
        )
        .await?;

        financial_transaction.commit().await.map_err(|_| DbError::TransactionError)?;
        Ok(balance_after)
    }

    /**
     * Bloqueo por disputa: sella banderas y apendiza fila de auditoría
     * de monto cero.
     */
    #[instrument(skip(self), fields(owner = %owner))]
    pub async fn set_lock(
        &self,
        owner: &OwnerRef,
        lock_reason: &str,
        dispute_identifier: Option<&str>,
    ) -> Result<(), DbError> {
        let database_connection = self.database_client.get_connection()?;
        let financial_transaction = database_connection
            .transaction()
            .await
            .map_err(|_| DbError::TransactionError)?;

        financial_transaction
            .execute(
                "INSERT OR IGNORE INTO wallets (owner_type, owner_id) VALUES (?1, ?2)",
                params![owner.variant_label(), owner.identifier()],
            )
            .await?;

        financial_transaction
            .execute(
                "UPDATE wallets SET is_locked = 1, lock_reason = ?3, locked_at = ?4
                 WHERE owner_type = ?1 AND owner_id = ?2",
                params![
                    owner.variant_label(),
                    owner.identifier(),
                    lock_reason,
                    Utc::now().to_rfc3339(),
                ],
            )
            .await?;

        let balance_after = read_balance(&financial_transaction, owner).await?;
        let audit_description = match dispute_identifier {
            Some(dispute) => format!("WALLET_LOCK reason={} dispute={}", lock_reason, dispute),
            None => format!("WALLET_LOCK reason={}", lock_reason),
        };

        append_ledger_row(
            &financial_transaction,
            owner,
            LedgerTxType::AdminAdjustment,
            0,
            balance_after,
            None,
            &audit_description,
        )
        .await?;

        financial_transaction.commit().await.map_err(|_| DbError::TransactionError)?;
        Ok(())
    }

    /// Desbloqueo: limpia banderas y apendiza fila de auditoría.
    #[instrument(skip(self), fields(owner = %owner))]
    pub async fn clear_lock(&self, owner: &OwnerRef, unlock_reason: &str) -> Result<(), DbError> {
        let database_connection = self.database_client.get_connection()?;
        let financial_transaction = database_connection
            .transaction()
            .await
            .map_err(|_| DbError::TransactionError)?;

        financial_transaction
            .execute(
                "UPDATE wallets SET is_locked = 0, lock_reason = NULL, locked_at = NULL
                 WHERE owner_type = ?1 AND owner_id = ?2",
                params![owner.variant_label(), owner.identifier()],
            )
            .await?;

        let balance_after = read_balance(&financial_transaction, owner).await?;

        append_ledger_row(
            &financial_transaction,
            owner,
            LedgerTxType::AdminAdjustment,
            0,
            balance_after,
            None,
            &format!("WALLET_UNLOCK reason={}", unlock_reason),
        )
        .await?;

        financial_transaction.commit().await.map_err(|_| DbError::TransactionError)?;
        Ok(())
    }

    /// Sella la marca de reconciliación cache <- durable.
    pub async fn stamp_reconciliation(&self, owner: &OwnerRef) -> Result<(), DbError> {
        let database_connection = self.database_client.get_connection()?;
        database_connection
            .execute(
                "UPDATE wallets SET last_reconciled_at = ?3
                 WHERE owner_type = ?1 AND owner_id = ?2",
                params![owner.variant_label(), owner.identifier(), Utc::now().to_rfc3339()],
            )
            .await?;
        Ok(())
    }

    /// Rastro histórico del ledger, más reciente primero.
    pub async fn list_ledger(
        &self,
        owner: &OwnerRef,
        limit: i64,
    ) -> Result<Vec<LedgerEntry>, DbError> {
        let database_connection = self.database_client.get_connection()?;

        let mut query_results = database_connection
            .query(
                "SELECT id, tx_type, amount_cents, balance_after_cents,
                        request_id, description, created_at
                 FROM wallet_ledger
                 WHERE owner_type = ?1 AND owner_id = ?2
                 ORDER BY created_at DESC, id DESC
                 LIMIT ?3",
                params![owner.variant_label(), owner.identifier(), limit],
            )
            .await?;

        let mut ledger_collection = Vec::new();
        while let Some(data_row) = query_results.next().await? {
            let tx_type = parse_tx_type(&data_row.get::<String>(1)?)?;
            ledger_collection.push(LedgerEntry {
                entry_identifier: data_row.get::<String>(0)?,
                tx_type,
                amount_cents: data_row.get::<i64>(2)?,
                balance_after_cents: data_row.get::<i64>(3)?,
                request_identifier: data_row.get::<Option<String>>(4)?,
                description: data_row.get::<String>(5)?,
                created_at: parse_stored_timestamp(data_row.get::<Option<String>>(6)?)
                    .unwrap_or_else(Utc::now),
            });
        }

        Ok(ledger_collection)
    }

    /// Suma firmada del ledger (invariante de reconciliación).
    pub async fn signed_ledger_sum(&self, owner: &OwnerRef) -> Result<i64, DbError> {
        let database_connection = self.database_client.get_connection()?;

        let mut query_results = database_connection
            .query(
                "SELECT COALESCE(SUM(amount_cents), 0) FROM wallet_ledger
                 WHERE owner_type = ?1 AND owner_id = ?2",
                params![owner.variant_label(), owner.identifier()],
            )
            .await?;

        match query_results.next().await? {
            Some(data_row) => Ok(data_row.get::<i64>(0)?),
            None => Ok(0),
        }
    }

    /// Conteo de filas CHARGE para una petición (invariante de unicidad).
    pub async fn charge_row_count_for_request(
        &self,
        request_identifier: &str,
    ) -> Result<i64, DbError> {
        let database_connection = self.database_client.get_connection()?;

        let mut query_results = database_connection
            .query(
                "SELECT COUNT(*) FROM wallet_ledger
                 WHERE request_id = ?1 AND tx_type = 'CHARGE'",
                params![request_identifier],
            )
            .await?;

        match query_results.next().await? {
            Some(data_row) => Ok(data_row.get::<i64>(0)?),
            None => Ok(0),
        }
    }
}

async fn read_balance(
    financial_transaction: &Transaction,
    owner: &OwnerRef,
) -> Result<i64, DbError> {
    let mut query_results = financial_transaction
        .query(
            "SELECT balance_cents FROM wallets WHERE owner_type = ?1 AND owner_id = ?2",
            params![owner.variant_label(), owner.identifier()],
        )
        .await?;

    match query_results.next().await? {
        Some(data_row) => Ok(data_row.get::<i64>(0)?),
        None => Err(DbError::WalletNotFound),
    }
}

#[allow(clippy::too_many_arguments)]
async fn append_ledger_row(
    financial_transaction: &Transaction,
    owner: &OwnerRef,
    tx_type: LedgerTxType,
    amount_cents: i64,
    balance_after_cents: i64,
    request_identifier: Option<&str>,
    description: &str,
) -> Result<(), DbError> {
    financial_transaction
        .execute(
            "INSERT INTO wallet_ledger (
                id, owner_type, owner_id, tx_type, amount_cents,
                balance_after_cents, request_id, description, created_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                Uuid::new_v4().to_string(),
                owner.variant_label(),
                owner.identifier(),
                tx_type.as_label(),
                amount_cents,
                balance_after_cents,
                request_identifier,
                description,
                Utc::now().to_rfc3339(),
            ],
        )
        .await?;
    Ok(())
}

fn parse_tx_type(raw_label: &str) -> Result<LedgerTxType, DbError> {
    match raw_label {
        "CHARGE" => Ok(LedgerTxType::Charge),
        "TOPUP" => Ok(LedgerTxType::Topup),
        "REFUND" => Ok(LedgerTxType::Refund),
        "ADMIN_ADJUSTMENT" => Ok(LedgerTxType::AdminAdjustment),
        "CHARGEBACK" => Ok(LedgerTxType::Chargeback),
        other => Err(DbError::MappingError(format!("unknown tx_type '{}'", other))),
    }
}
