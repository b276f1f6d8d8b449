// [libs/infra/db/src/errors.rs]
/*!
 * =================================================================
 * APARATO: DATABASE ERROR CATALOG (V4.0 - GATEWAY MASTER)
 * CLASIFICACIÓN: INFRASTRUCTURE CORE (ESTRATO L3)
 * RESPONSABILIDAD: CATALOGACIÓN SEMÁNTICA DE FALLOS DE PERSISTENCIA
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. BILLING AWARENESS: Distingue colapsos transaccionales financieros
 *    (que disparan rollback del estrato caliente) de fallos de consulta
 *    ordinarios.
 * 2. ZERO ABBREVIATIONS: Nomenclatura nominal absoluta.
 * =================================================================
 */

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    /// Error de enlace físico o de red con el cluster durable.
    #[error("[L3_DB_NET_FAULT]: DATABASE_UPLINK_SEVERED -> {0}")]
    ConnectionError(String),

    /// Error de sintaxis o ejecución devuelto por el motor libSQL.
    #[error("[L3_DB_QUERY_FAULT]: SQL_QUERY_REJECTED -> {0}")]
    QueryError(#[from] libsql::Error),

    /// Fallo en la transformación de tipos entre SQLite y el Dominio Rust.
    #[error("[L3_DB_MAPPING_FAULT]: DATA_MAPPING_VIOLATION -> {0}")]
    MappingError(String),

    /// Error al comprometer cambios en una secuencia multi-tabla.
    #[error("[L3_DB_FAULT]: TRANSACTION_COLLAPSE")]
    TransactionError,

    // --- ESTRATO FINANCIERO (BILLETERA Y LEDGER) ---

    /// La billetera solicitada no existe en el Ledger Durable.
    #[error("[L3_WALLET_FAULT]: WALLET_NOT_FOUND")]
    WalletNotFound,

    /// La recarga violaría el techo de balance representable.
    #[error("[L3_WALLET_FAULT]: BALANCE_CEILING_EXCEEDED")]
    BalanceCeilingExceeded,

    // --- ESTRATO DE COLA DE USO ---

    /// El trabajo de uso solicitado no existe o ya fue sellado.
    #[error("[L3_USAGE_FAULT]: JOB_NOT_FOUND")]
    JobNotFound,
}
