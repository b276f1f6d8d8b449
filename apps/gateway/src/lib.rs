// [apps/gateway/src/lib.rs]
/*!
 * =================================================================
 * APARATO: GATEWAY LIBRARY ROOT (V4.1 - SOVEREIGN AUTHORITY)
 * CLASIFICACIÓN: CRATE ROOT (ESTRATO L3)
 * RESPONSABILIDAD: DEFINICIÓN SUPREMA DEL ÁRBOL DE MÓDULOS
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. MODULE HIERARCHY HARDENING: Autoridad única de módulos para que
 *    'crate::' resuelva determinista en librería y binario.
 * 2. PUBLIC INTERFACE: Expone 'prelude' para la ignición mínima del
 *    Kernel desde 'main.rs' y para el Proving Grounds.
 * =================================================================
 */

// --- ESTRATO DE DATOS Y ESTADO (L1-APP) ---
/// Gestor del sistema nervioso central del gateway.
pub mod state;

// --- ESTRATO DE TRANSPORTE Y ACCIÓN ---
/// Adaptadores de entrada para ráfagas HTTP y SSE.
pub mod handlers;
/// Núcleo de mando y control para la ignición de servicios.
pub mod kernel;
/// El túnel de mando: definición de rutas y topología de red.
pub mod routes;

// --- ESTRATO DE SEGURIDAD Y ADMISIÓN ---
/// Taxonomía de fallos y renderizado OpenAI-compatible.
pub mod errors;
/// Guardianes perimetrales de contexto y autenticación.
pub mod middleware;
/// Etapas del pipeline de admisión y facturación.
pub mod admission;

// --- ESTRATO DE SERVICIOS DE FONDO ---
/// Daemons de la tubería asíncrona de uso.
pub mod services;

/**
 * PRELUDIO DEL GATEWAY
 *
 * Re-exportación estratégica de los componentes necesarios para la
 * ignición mínima del sistema. Reduce el acoplamiento en 'main.rs'.
 */
pub mod prelude {
    pub use crate::kernel::GatewayKernel;
    pub use crate::state::AppState;
}
