// [apps/gateway/src/handlers/mod.rs]
/*!
 * =================================================================
 * APARATO: HANDLER MATRIX (V4.0 - GATEWAY MASTER)
 * CLASIFICACIÓN: API ADAPTER LAYER (ESTRATO L4)
 * RESPONSABILIDAD: ADAPTADORES DE ENTRADA PARA RÁFAGAS HTTP
 * =================================================================
 */

/// Pipeline completo de chat completions (unario y streaming).
pub mod chat;
/// Exposición del catálogo de modelos.
pub mod models;
