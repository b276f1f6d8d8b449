// [libs/infra/db/src/repositories/mod.rs]
/*!
 * =================================================================
 * APARATO: REPOSITORY ACCESS MATRIX (V4.0 - GATEWAY MASTER)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: ORQUESTACIÓN DE SUBSISTEMAS DE PERSISTENCIA
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. ACCESS SOVEREIGNTY: Centraliza la visibilidad de los repositorios
 *    tácticos para la inyección de dependencias en el AppState.
 * 2. NOMINAL PARITY: Un repositorio por agregado del dominio; ninguna
 *    consulta SQL vive fuera de esta matriz.
 * =================================================================
 */

// --- ESTRATO 1: ADMISIÓN (CLAVES, POLÍTICAS, CATÁLOGO) ---

/// Resolución de claves API por huella y sellado de uso.
pub mod api_key;
/// Derivación de política efectiva (suscripción + plan + billetera).
pub mod policy;
/// Catálogo de modelos LLM expuestos.
pub mod catalog;
/// Franjas de precio acotadas en el tiempo.
pub mod pricing;

// --- ESTRATO 2: FINANZAS (BILLETERA Y LEDGER) ---

/// Mutaciones durables de billetera con ledger append-only.
pub mod wallet;

// --- ESTRATO 3: TUBERÍA DE USO (EVENTOS Y AGREGADOS) ---

/// Eventos terminales únicos por request_id.
pub mod events;
/// Cola durable de lotes y agregación diaria idempotente.
pub mod usage;

pub use api_key::ApiKeyRepository;
pub use catalog::ModelCatalogRepository;
pub use events::RequestEventRepository;
pub use policy::PolicyRepository;
pub use pricing::PricingRepository;
pub use usage::UsageRepository;
pub use wallet::WalletRepository;

use chrono::{DateTime, NaiveDateTime, Utc};

/// Rehidrata una marca temporal persistida tanto en RFC-3339 como en el
/// formato de CURRENT_TIMESTAMP de SQLite.
pub(crate) fn parse_stored_timestamp(raw_timestamp: Option<String>) -> Option<DateTime<Utc>> {
    let raw_timestamp = raw_timestamp?;

    if let Ok(parsed) = DateTime::parse_from_rfc3339(&raw_timestamp) {
        return Some(parsed.with_timezone(&Utc));
    }

    NaiveDateTime::parse_from_str(&raw_timestamp, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}
