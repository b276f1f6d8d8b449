// [apps/gateway/src/kernel.rs]
/**
 * =================================================================
 * APARATO: GATEWAY SOVEREIGN KERNEL (V4.3 - GATEWAY MASTER)
 * CLASIFICACIÓN: COMPOSITION ROOT (ESTRATO L1-APP)
 * RESPONSABILIDAD: BOOTSTRAP DE INFRAESTRUCTURA E IGNICIÓN SEGURA
 *
 * VISION HIPER-HOLÍSTICA:
 * Actúa como la placa base donde se conectan todos los servicios:
 * Ledger Durable, estrato caliente con su bóveda de scripts, registro
 * de proveedores, daemons de la tubería de uso y el transporte Axum
 * con apagado controlado (drenaje final del buffer).
 * =================================================================
 */

use crate::routes::create_gateway_router;
use crate::services::{spawn_aggregation_workers, spawn_flush_daemon};
use crate::state::AppState;
use omniway_infra_db::TursoClient;
use omniway_infra_hotstate::{HotStateClient, ScriptVault};
use omniway_infra_provider::ProviderRegistry;
use std::env;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tracing::{error, info, instrument};

pub struct GatewayKernel {
    pub server_network_port: u16,
    pub application_shared_state: AppState,
}

impl GatewayKernel {
    /**
     * Ignición de los enlaces tácticos (durable + caliente) y del
     * estado neural. Los cuatro scripts críticos se sellan en el
     * servidor antes de aceptar tráfico.
     */
    #[instrument(skip(database_access_token))]
    pub async fn ignite(
        database_connection_url: &str,
        database_access_token: Option<String>,
        hot_state_url: &str,
        listening_port: u16,
    ) -> Self {
        let database_client = TursoClient::connect(database_connection_url, database_access_token)
            .await
            .expect("FATAL: Durable ledger link collapse. Ignition aborted.");

        let hot_state_client = HotStateClient::connect(hot_state_url)
            .await
            .expect("FATAL: Hot strata link collapse. Ignition aborted.");

        let script_vault = Arc::new(ScriptVault::new(hot_state_client.clone()));
        if let Err(preload_fault) = script_vault.preload().await {
            // La bóveda recarga por NOSCRIPT en caliente; la ignición
            // continúa degradada.
            error!("⚠️ [KERNEL]: Script preload degraded (lazy reload armed): {}", preload_fault);
        }

        let provider_registry = ProviderRegistry::from_environment();

        Self {
            server_network_port: listening_port,
            application_shared_state: AppState::new(
                database_client,
                hot_state_client,
                script_vault,
                provider_registry,
            ),
        }
    }

    /**
     * Lanza los daemons de fondo y el servidor HTTP principal.
     * El apagado controlado drena el buffer de uso antes de morir.
     */
    pub async fn launch_sovereign_operations(self) {
        let shared_application_state = self.application_shared_state.clone();

        // --- 1. TUBERÍA ASÍNCRONA DE USO ---
        // A. Volcado RAM -> cola durable (volumen o 5 s)
        spawn_flush_daemon(Arc::clone(&shared_application_state.usage_buffer)).await;
        // B. Consumidores de agregación (concurrencia 5) + higiene dead-letter
        spawn_aggregation_workers(Arc::clone(&shared_application_state.usage_repository)).await;

        // --- 2. IGNICIÓN DEL TRANSPORTE HTTP (AXUM) ---
        let gateway_router = create_gateway_router(shared_application_state.clone());

        let bind_address = SocketAddr::new(
            "0.0.0.0".parse::<IpAddr>().expect("static address"),
            self.server_network_port,
        );

        info!("🚀 [KERNEL_ONLINE]: Omniway Gateway listening at {}", bind_address);

        let tcp_listener = tokio::net::TcpListener::bind(bind_address)
            .await
            .expect("CRITICAL_FAULT: Failed to bind network port.");

        let serve_result = axum::serve(
            tcp_listener,
            gateway_router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await;

        if let Err(server_error) = serve_result {
            error!("💀 [KERNEL_COLLAPSE]: Runtime failure: {}", server_error);
            std::process::exit(1);
        }

        // --- 3. DRENAJE TERMINAL DE LA TUBERÍA DE USO ---
        shared_application_state.usage_buffer.drain_for_shutdown().await;
        info!("🛑 [KERNEL_OFFLINE]: Graceful shutdown sealed.");
    }
}

/// Señal de apagado controlado (Ctrl-C / SIGTERM del orquestador PaaS).
async fn shutdown_signal() {
    if let Err(signal_fault) = tokio::signal::ctrl_c().await {
        error!("⚠️ [KERNEL]: Shutdown signal listener collapsed: {}", signal_fault);
    }
    info!("🛬 [KERNEL]: Shutdown signal received. Draining...");
}
