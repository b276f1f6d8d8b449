// [libs/domain/models/src/lib.rs]
/*!
 * =================================================================
 * APARATO: DOMAIN MODELS ROOT (V4.0 - GATEWAY MASTER)
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: AUTORIDAD ÚNICA DEL ÁRBOL DE TIPOS DEL DOMINIO
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. SINGLE SOURCE OF TRUTH: Toda entidad que cruza un estrato (HTTP,
 *    Redis, libSQL) nace aquí. Los adaptadores solo transportan.
 * 2. CLOSED OWNER SUM: El principal de facturación es un sum type
 *    cerrado (User | Org); cada clave y scope SQL pivota sobre él
 *    mediante match explícito, nunca dispatch virtual.
 * 3. NOMINAL PURITY: Erradicación total de abreviaciones.
 * =================================================================
 */

/// Principal de facturación y fragmentos de clave del estrato caliente.
pub mod owner;
/// Credenciales API, contexto autenticado y registro de claves.
pub mod auth;
/// Política efectiva de admisión resuelta por suscripción.
pub mod policy;
/// Catálogo de modelos LLM y registros de precios.
pub mod catalog;
/// Billetera prepaga, ledger firmado y tipos de transacción.
pub mod wallet;
/// Eventos terminales de petición y agregados diarios de uso.
pub mod events;
/// Contratos de cable OpenAI-compatibles (chat, modelos, errores).
pub mod openai;
