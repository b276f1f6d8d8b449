// [libs/domain/models/src/wallet.rs]
/*!
 * =================================================================
 * APARATO: WALLET & LEDGER MODELS (V4.1 - GATEWAY MASTER)
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: CONTRATOS DE BILLETERA PREPAGA Y LEDGER FIRMADO
 *
 * # Mathematical Proof (Ledger Reconciliation):
 * La suma de los montos firmados del ledger de un principal es igual
 * al balance vigente de su billetera cuando no hay cargos en vuelo.
 * El techo 2^53-1 mantiene toda aritmética representable sin pérdida
 * en cualquier cliente IEEE-754 probable.
 * =================================================================
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Techo duro del balance en centavos: máximo entero IEEE-754 exacto.
pub const MAX_WALLET_BALANCE_CENTS: i64 = 9_007_199_254_740_991;

/// Snapshot durable de la billetera de un principal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletSnapshot {
    /// Balance vigente en centavos enteros (invariante: >= 0).
    pub balance_cents: i64,
    /// Bandera de bloqueo por disputa.
    pub is_locked: bool,
    /// Razón del bloqueo vigente.
    pub lock_reason: Option<String>,
    /// Instante del bloqueo vigente.
    pub locked_at: Option<DateTime<Utc>>,
    /// Total histórico de recargas en centavos.
    pub total_topup_cents: i64,
    /// Total histórico de gasto en centavos.
    pub total_spent_cents: i64,
    /// Última reconciliación cache <- durable.
    pub last_reconciled_at: Option<DateTime<Utc>>,
}

/// Tipos de transacción admitidos por el ledger append-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LedgerTxType {
    Charge,
    Topup,
    Refund,
    AdminAdjustment,
    Chargeback,
}

impl LedgerTxType {
    /// Etiqueta estable persistida en la columna `tx_type`.
    pub fn as_label(&self) -> &'static str {
        match self {
            LedgerTxType::Charge => "CHARGE",
            LedgerTxType::Topup => "TOPUP",
            LedgerTxType::Refund => "REFUND",
            LedgerTxType::AdminAdjustment => "ADMIN_ADJUSTMENT",
            LedgerTxType::Chargeback => "CHARGEBACK",
        }
    }
}

/// Fila inmutable del ledger: monto firmado + balance posterior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Identificador unívoco de la fila (UUID v4).
    pub entry_identifier: String,
    /// Tipo de transacción.
    pub tx_type: LedgerTxType,
    /// Monto firmado en centavos (negativo para CHARGE).
    pub amount_cents: i64,
    /// Balance resultante tras aplicar el monto.
    pub balance_after_cents: i64,
    /// Correlación opcional con la petición que originó el movimiento.
    pub request_identifier: Option<String>,
    /// Descripción técnica para el rastro forense.
    pub description: String,
    /// Instante de cristalización en el Ledger Durable.
    pub created_at: DateTime<Utc>,
}
