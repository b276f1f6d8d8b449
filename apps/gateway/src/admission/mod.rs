// [apps/gateway/src/admission/mod.rs]
/*!
 * =================================================================
 * APARATO: ADMISSION PIPELINE MATRIX (V4.0 - GATEWAY MASTER)
 * CLASIFICACIÓN: ADMISSION STRATUM (ESTRATO L4)
 * RESPONSABILIDAD: ORQUESTACIÓN DE LAS ETAPAS DE ADMISIÓN
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. FIXED PIPELINE: auth -> rate -> concurrency -> model -> pricing ->
 *    billing -> circuit -> proxy. Cada etapa aflora su propio error.
 * 2. STAGE SOVEREIGNTY: Una etapa por módulo; el handler solo
 *    encadena veredictos.
 * =================================================================
 */

/// Autenticación Bearer y resolución de política efectiva.
pub mod auth;
/// Ventanas fijas atómicas y slots concurrentes.
pub mod rate_limiter;
/// Resolución de catálogo y autorización de modelo.
pub mod model_access;
/// Precio por petición con cache de tres niveles.
pub mod pricing;
/// Decisión atómica allowance-or-wallet.
pub mod billing;
/// Orquestación durable + cache de la billetera.
pub mod wallet;
/// Reembolso TTFB-0 con techo diario.
pub mod refund;
/// Latch de salud por proveedor.
pub mod circuit;
/// Validación final y reescritura del cuerpo upstream.
pub mod dispatch;
