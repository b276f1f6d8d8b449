// [libs/infra/hot-state/src/lib.rs]
/*!
 * =================================================================
 * APARATO: HOT-STATE ADAPTER ROOT (V4.0 - GATEWAY MASTER)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: AUTORIDAD DEL ESTRATO CALIENTE (REDIS)
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. SINGLE MUTATION DOCTRINE: Los contadores del estrato caliente
 *    solo mutan a través de los scripts nominados o de los INCRBY del
 *    ledger de billetera; ningún cliente los toca directamente.
 * 2. LOSSY REPLICA AWARENESS: Para billetera el estrato caliente es
 *    réplica con pérdida del Ledger Durable; para allowance, circuito
 *    y concurrencia es autoridad.
 * =================================================================
 */

/// Catálogo semántico de fallos del estrato caliente.
pub mod errors;
/// Cliente multiplexado auto-reconectante.
pub mod client;
/// Esquema canónico de claves particionado por principal.
pub mod keys;
/// Bóveda de scripts Lua: carga por SHA y fallback NOSCRIPT.
pub mod scripts;

pub use client::HotStateClient;
pub use errors::HotStateError;
pub use scripts::ScriptVault;
