// [libs/infra/provider-client/src/config.rs]
/*!
 * =================================================================
 * APARATO: PROVIDER CONFIG REGISTRY (V4.1 - GATEWAY MASTER)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: CONFIGURACIÓN INMUTABLE DE PROVEEDORES UPSTREAM
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. READ-ONLY AFTER IGNITION: El registro se hidrata del entorno una
 *    sola vez al arranque; ninguna petición lo muta.
 * 2. ENV CONVENTION: `PROVIDERS=openai,anthropic` enumera los nombres;
 *    cada proveedor aporta `{NAME}_BASE_URL` y `{NAME}_API_KEY` en
 *    mayúsculas, con timeouts opcionales.
 * =================================================================
 */

use crate::errors::ProviderError;
use std::collections::HashMap;
use tracing::{info, warn};

/// Timeout de conexión por defecto hacia el proveedor (segundos).
pub const DEFAULT_CONNECT_TIMEOUT_SECONDS: u64 = 5;
/// Timeout de lectura unaria por defecto (segundos).
pub const DEFAULT_READ_TIMEOUT_SECONDS: u64 = 120;
/// Duración máxima de un stream SSE por defecto (segundos).
pub const DEFAULT_STREAM_MAX_DURATION_SECONDS: u64 = 300;

/// Configuración sellada de un proveedor upstream.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub provider_name: String,
    pub base_url: String,
    pub api_key: String,
    pub connect_timeout_seconds: u64,
    pub read_timeout_seconds: u64,
    pub stream_max_duration_seconds: u64,
}

/// Registro inmutable de proveedores, indexado por nombre.
#[derive(Debug, Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<String, ProviderConfig>,
}

impl ProviderRegistry {
    /**
     * Hidrata el registro desde el espacio de nombres del proceso.
     *
     * # Logic:
     * `PROVIDERS` enumera los nombres separados por coma (por defecto
     * 'openai'). Un proveedor sin BASE_URL o API_KEY se omite con
     * warning; el gateway sigue operable para el resto del catálogo.
     */
    pub fn from_environment() -> Self {
        let declared_providers = std::env::var("PROVIDERS")
            .unwrap_or_else(|_| "openai".to_string());

        let mut providers = HashMap::new();

        for provider_name in declared_providers.split(',').map(str::trim).filter(|n| !n.is_empty()) {
            let env_prefix = provider_name.to_uppercase().replace('-', "_");

            let base_url = std::env::var(format!("{}_BASE_URL", env_prefix)).ok();
            let api_key = std::env::var(format!("{}_API_KEY", env_prefix)).ok();

            let (base_url, api_key) = match (base_url, api_key) {
                (Some(url), Some(key)) if !url.is_empty() && !key.is_empty() => (url, key),
                _ => {
                    warn!(
                        "⚠️ [PROVIDER_REGISTRY]: '{}' skipped (BASE_URL or API_KEY missing).",
                        provider_name
                    );
                    continue;
                }
            };

            let read_env_seconds = |suffix: &str, fallback: u64| -> u64 {
                std::env::var(format!("{}_{}", env_prefix, suffix))
                    .ok()
                    .and_then(|raw| raw.parse::<u64>().ok())
                    .unwrap_or(fallback)
            };

            providers.insert(
                provider_name.to_string(),
                ProviderConfig {
                    provider_name: provider_name.to_string(),
                    base_url: base_url.trim_end_matches('/').to_string(),
                    api_key,
                    connect_timeout_seconds: read_env_seconds(
                        "CONNECT_TIMEOUT_SECONDS",
                        DEFAULT_CONNECT_TIMEOUT_SECONDS,
                    ),
                    read_timeout_seconds: read_env_seconds(
                        "READ_TIMEOUT_SECONDS",
                        DEFAULT_READ_TIMEOUT_SECONDS,
                    ),
                    stream_max_duration_seconds: read_env_seconds(
                        "STREAM_MAX_DURATION_SECONDS",
                        DEFAULT_STREAM_MAX_DURATION_SECONDS,
                    ),
                },
            );
        }

        info!("🛰️ [PROVIDER_REGISTRY]: {} upstream providers sealed.", providers.len());
        Self { providers }
    }

    /// Construcción directa (Proving Grounds y aprovisionamiento).
    pub fn from_configs(configs: Vec<ProviderConfig>) -> Self {
        let providers = configs
            .into_iter()
            .map(|config| (config.provider_name.clone(), config))
            .collect();
        Self { providers }
    }

    /// Localiza la configuración de un proveedor por nombre.
    pub fn resolve(&self, provider_name: &str) -> Result<&ProviderConfig, ProviderError> {
        self.providers
            .get(provider_name)
            .ok_or_else(|| ProviderError::ConfigError(provider_name.to_string()))
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Recorrido de las configuraciones selladas.
    pub fn configs(&self) -> impl Iterator<Item = &ProviderConfig> {
        self.providers.values()
    }
}
