// [libs/infra/db/src/lib.rs]
/*!
 * =================================================================
 * APARATO: DURABLE STORE ADAPTER ROOT (V4.0 - GATEWAY MASTER)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: AUTORIDAD DE PERSISTENCIA DURABLE DEL GATEWAY
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. SOURCE OF TRUTH: Claves, políticas, billeteras, ledger y eventos
 *    viven aquí; el estrato caliente es réplica con pérdida para la
 *    billetera y derivado cacheado para el resto.
 * 2. SINGLE-ROW TRANSACTIONS: Toda mutación financiera es una
 *    transacción corta de fila única más su fila de ledger.
 * =================================================================
 */

/// Catálogo semántico de fallos de persistencia.
pub mod errors;
/// Cliente de conexión libSQL con ancla de memoria para tests.
pub mod client;
/// Gobernanza estructural del esquema (tablas e índices idempotentes).
pub mod schema;
/// Matriz de repositorios tácticos.
pub mod repositories;

pub use client::TursoClient;
pub use errors::DbError;
