// [apps/gateway/src/main.rs]
/*!
 * =================================================================
 * APARATO: GATEWAY MAIN ENTRY POINT (V4.1 - GATEWAY MASTER)
 * CLASIFICACIÓN: APPLICATION SHELL (ESTRATO L3)
 * RESPONSABILIDAD: BOOTSTRAP DE INFRAESTRUCTURA E IGNICIÓN SEGURA
 *
 * # Mathematical Proof (Deterministic Ignition):
 * La bóveda de scripts se sella antes de la apertura del socket TCP,
 * previniendo estados de carrera donde una petición llegue sin los
 * scripts atómicos cristalizados en el estrato caliente.
 * =================================================================
 */

use omniway_gateway::prelude::*;

use dotenvy::dotenv;
use omniway_shared_heimdall::init_tracing;
use tracing::info;

/**
 * Punto de ignición supremo del binario del Gateway.
 */
fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. CARGA DE ENTORNO SOBERANO
    dotenv().ok();

    // 2. INICIALIZACIÓN DE OBSERVABILIDAD NEURAL (HEIMDALL)
    init_tracing("omniway_gateway");

    // 3. CONFIGURACIÓN DEL RUNTIME SOBERANO
    let runtime_gateway = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime_gateway.block_on(async {
        info!("🛰️  [GATEWAY]: Global ignition sequence starting...");

        // 4. ADQUISICIÓN DE COORDENADAS TÁCTICAS
        let database_connection_url = std::env::var("DATABASE_URL")
            .expect("CRITICAL_FAULT: DATABASE_URL not defined in runtime environment.");

        let database_access_token = std::env::var("TURSO_AUTH_TOKEN").ok();

        let hot_state_url = std::env::var("REDIS_URL")
            .expect("CRITICAL_FAULT: REDIS_URL not defined in runtime environment.");

        let listening_network_port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .unwrap_or(3000);

        // 5. CONSTRUCCIÓN DEL KERNEL SOBERANO (ESTRATO L1-APP)
        let kernel_instance = GatewayKernel::ignite(
            &database_connection_url,
            database_access_token,
            &hot_state_url,
            listening_network_port,
        )
        .await;

        // 6. IGNICIÓN DE OPERACIONES
        info!("🚀 [GATEWAY_ONLINE]: System fully operational on port {}.", listening_network_port);
        kernel_instance.launch_sovereign_operations().await;

        Ok(())
    })
}
