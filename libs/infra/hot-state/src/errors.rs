// [libs/infra/hot-state/src/errors.rs]
/*!
 * =================================================================
 * APARATO: HOT-STATE ERROR CATALOG (V4.0 - GATEWAY MASTER)
 * CLASIFICACIÓN: INFRASTRUCTURE CORE (ESTRATO L3)
 * RESPONSABILIDAD: CATALOGACIÓN SEMÁNTICA DE FALLOS DEL ESTRATO CALIENTE
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. FAIL-POLICY AWARENESS: Los consumidores deciden fail-open
 *    (rate limiter, allowance) o fail-closed (billetera) según el
 *    estrato; el catálogo solo clasifica, nunca decide.
 * 2. NOMINAL PURITY: Prefijos de estrato para el renderizado del
 *    rastro estructurado.
 * =================================================================
 */

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HotStateError {
    /// Error de enlace físico o de configuración con el cluster Redis.
    #[error("[L3_HOT_NET_FAULT]: HOT_STATE_UPLINK_SEVERED -> {0}")]
    ConnectionError(String),

    /// Fallo de comando devuelto por el servidor Redis.
    #[error("[L3_HOT_CMD_FAULT]: COMMAND_REJECTED -> {0}")]
    CommandError(#[from] redis::RedisError),

    /// El veredicto de un script no respeta la gramática esperada.
    #[error("[L3_HOT_DECODE_FAULT]: SCRIPT_VERDICT_MALFORMED -> {0}")]
    DecodeError(String),

    /// Script desconocido solicitado a la bóveda.
    #[error("[L3_HOT_SCRIPT_FAULT]: UNKNOWN_SCRIPT -> {0}")]
    UnknownScript(String),
}
