// [apps/gateway/src/state/mod.rs]
/*!
 * =================================================================
 * APARATO: SOVEREIGN STATE ORCHESTRATOR (V4.2 - GATEWAY MASTER)
 * CLASIFICACIÓN: APPLICATION STATE (ESTRATO L1-APP)
 * RESPONSABILIDAD: COMPOSICIÓN DE REPOSITORIOS, MOTORES Y DAEMONS
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. COMPOSITION ROOT: Centraliza el rastro de los 6 repositorios,
 *    los 8 motores de admisión y la tubería de uso.
 * 2. NOMINAL PURITY: Uso de 'Arc<T>' para inmutabilidad compartida;
 *    ningún estado mutable fuera de los estratos caliente y durable
 *    salvo el buffer de uso.
 * =================================================================
 */

use crate::admission::auth::AuthService;
use crate::admission::billing::BillingEngine;
use crate::admission::circuit::CircuitBreakerService;
use crate::admission::model_access::ModelAccessService;
use crate::admission::pricing::PricingService;
use crate::admission::rate_limiter::RateLimiterService;
use crate::admission::refund::RefundEngine;
use crate::admission::wallet::WalletLedgerService;
use crate::services::UsageBuffer;
use omniway_infra_db::repositories::{
    ApiKeyRepository, ModelCatalogRepository, PolicyRepository, PricingRepository,
    UsageRepository, WalletRepository,
};
use omniway_infra_db::TursoClient;
use omniway_infra_hotstate::{HotStateClient, ScriptVault};
use omniway_infra_provider::{ProviderClient, ProviderRegistry};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/**
 * Contenedor de estado compartido (Thread-Safe) del gateway.
 * Actúa como la placa base donde se conectan todos los estratos.
 */
#[derive(Clone)]
pub struct AppState {
    /// Cliente del Ledger Durable (libSQL).
    pub database_client: TursoClient,
    /// Cliente del estrato caliente (Redis).
    pub hot_state: HotStateClient,

    // --- REPOSITORIOS TÁCTICOS (L3) ---
    pub api_key_repository: Arc<ApiKeyRepository>,
    pub policy_repository: Arc<PolicyRepository>,
    pub catalog_repository: Arc<ModelCatalogRepository>,
    pub pricing_repository: Arc<PricingRepository>,
    pub wallet_repository: Arc<WalletRepository>,
    pub usage_repository: Arc<UsageRepository>,

    // --- MOTORES DE ADMISIÓN (L4) ---
    pub auth_service: Arc<AuthService>,
    pub rate_limiter: Arc<RateLimiterService>,
    pub model_access: Arc<ModelAccessService>,
    pub pricing_service: Arc<PricingService>,
    pub billing_engine: Arc<BillingEngine>,
    pub wallet_ledger: Arc<WalletLedgerService>,
    pub refund_engine: Arc<RefundEngine>,
    pub circuit_breaker: Arc<CircuitBreakerService>,

    // --- ENLACE UPSTREAM (SELLADO AL ARRANQUE) ---
    pub provider_clients: Arc<HashMap<String, Arc<ProviderClient>>>,

    // --- TUBERÍA ASÍNCRONA DE USO ---
    pub usage_buffer: Arc<UsageBuffer>,
}

impl AppState {
    /**
     * Forja el Estado Maestro inyectando todas las dependencias.
     */
    pub fn new(
        database_client: TursoClient,
        hot_state: HotStateClient,
        script_vault: Arc<ScriptVault>,
        provider_registry: ProviderRegistry,
    ) -> Self {
        debug!("🧬 [APP_STATE]: Executing sovereign ignition sequence V4.2...");

        // Pre-hidratación de repositorios soberanos.
        let api_key_repository = Arc::new(ApiKeyRepository::new(database_client.clone()));
        let policy_repository = Arc::new(PolicyRepository::new(database_client.clone()));
        let catalog_repository = Arc::new(ModelCatalogRepository::new(database_client.clone()));
        let pricing_repository = Arc::new(PricingRepository::new(database_client.clone()));
        let wallet_repository = Arc::new(WalletRepository::new(database_client.clone()));
        let usage_repository = Arc::new(UsageRepository::new(database_client.clone()));

        // Motores de admisión.
        let auth_service = Arc::new(AuthService::new(
            hot_state.clone(),
            Arc::clone(&api_key_repository),
            Arc::clone(&policy_repository),
        ));
        let rate_limiter = Arc::new(RateLimiterService::new(Arc::clone(&script_vault)));
        let model_access = Arc::new(ModelAccessService::new(
            hot_state.clone(),
            Arc::clone(&catalog_repository),
        ));
        let pricing_service = Arc::new(PricingService::new(
            hot_state.clone(),
            Arc::clone(&pricing_repository),
        ));
        let wallet_ledger = Arc::new(WalletLedgerService::new(
            hot_state.clone(),
            Arc::clone(&wallet_repository),
        ));
        let billing_engine = Arc::new(BillingEngine::new(
            hot_state.clone(),
            Arc::clone(&script_vault),
            Arc::clone(&wallet_repository),
            Arc::clone(&wallet_ledger),
        ));
        let refund_engine = Arc::new(RefundEngine::new(
            hot_state.clone(),
            Arc::clone(&script_vault),
            Arc::clone(&wallet_repository),
        ));
        let circuit_breaker = Arc::new(CircuitBreakerService::new(hot_state.clone()));

        // Clientes upstream sellados (read-only tras la ignición).
        let mut provider_clients = HashMap::new();
        if provider_registry.is_empty() {
            warn!("⚠️ [APP_STATE]: Provider registry empty; dispatch will reject all traffic.");
        }
        for provider_config in provider_registry.configs() {
            match ProviderClient::new(provider_config.clone()) {
                Ok(client) => {
                    provider_clients
                        .insert(provider_config.provider_name.clone(), Arc::new(client));
                }
                Err(client_fault) => {
                    warn!(
                        "⚠️ [APP_STATE]: Uplink '{}' ignition failed: {}",
                        provider_config.provider_name, client_fault
                    );
                }
            }
        }

        let usage_buffer = Arc::new(UsageBuffer::new(Arc::clone(&usage_repository)));

        Self {
            database_client,
            hot_state,
            api_key_repository,
            policy_repository,
            catalog_repository,
            pricing_repository,
            wallet_repository,
            usage_repository,
            auth_service,
            rate_limiter,
            model_access,
            pricing_service,
            billing_engine,
            wallet_ledger,
            refund_engine,
            circuit_breaker,
            provider_clients: Arc::new(provider_clients),
            usage_buffer,
        }
    }

    /// Cliente upstream por nombre de proveedor del catálogo.
    pub fn provider_client(&self, provider_name: &str) -> Option<Arc<ProviderClient>> {
        self.provider_clients.get(provider_name).cloned()
    }
}
