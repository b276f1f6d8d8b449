// [apps/gateway/src/services/mod.rs]
/*!
 * =================================================================
 * APARATO: BACKGROUND SERVICES MATRIX (V4.0 - GATEWAY MASTER)
 * CLASIFICACIÓN: BACKGROUND INFRASTRUCTURE (ESTRATO L4)
 * RESPONSABILIDAD: DAEMONS DE LA TUBERÍA ASÍNCRONA DE USO
 * =================================================================
 */

/// Buffer en RAM y daemon de volcado hacia la cola durable.
pub mod usage_buffer;
/// Consumidores de agregación y higiene de dead-letter.
pub mod usage_worker;

pub use usage_buffer::{spawn_flush_daemon, UsageBuffer};
pub use usage_worker::spawn_aggregation_workers;
