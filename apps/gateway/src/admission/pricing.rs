// [apps/gateway/src/admission/pricing.rs]
/*!
 * =================================================================
 * APARATO: PRICING RESOLVER (V4.2 - GATEWAY MASTER)
 * CLASIFICACIÓN: ADMISSION STRATUM (ESTRATO L4)
 * RESPONSABILIDAD: PRECIO POR PETICIÓN CON CACHE DE TRES NIVELES
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. THREE-TIER LADDER: Mapa local de proceso (5 min), estrato
 *    caliente (10 min), Ledger Durable. Cada acierto rehidrata los
 *    niveles superiores.
 * 2. SAFE DEFAULT: Modelos sin franja vigente facturan 1 centavo;
 *    un modelo mal preciado jamás bloquea la admisión.
 * =================================================================
 */

use chrono::Utc;
use omniway_domain_billing::{derive_request_price_cents, FALLBACK_PRICE_CENTS};
use omniway_infra_db::repositories::PricingRepository;
use omniway_infra_hotstate::{keys, HotStateClient};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

/// TTL del mapa local de proceso.
const LOCAL_CACHE_TTL: Duration = Duration::from_secs(300);
/// TTL de la clave caliente `pricing:{model}`.
const HOT_CACHE_TTL_SECONDS: u64 = 600;

pub struct PricingService {
    hot_state: HotStateClient,
    pricing_repository: Arc<PricingRepository>,
    local_price_cache: RwLock<HashMap<String, (i64, Instant)>>,
}

impl PricingService {
    pub fn new(hot_state: HotStateClient, pricing_repository: Arc<PricingRepository>) -> Self {
        Self {
            hot_state,
            pricing_repository,
            local_price_cache: RwLock::new(HashMap::new()),
        }
    }

    /**
     * Resuelve el precio sintético por petición en centavos.
     * Degradaciones de cualquier nivel caen al siguiente; una caída
     * total factura el default seguro.
     */
    #[instrument(skip(self))]
    pub async fn resolve_price_cents(&self, model_identifier: &str) -> i64 {
        // NIVEL 1: Mapa local del proceso.
        {
            let local_guard = self.local_price_cache.read().await;
            if let Some((cached_price, cached_at)) = local_guard.get(model_identifier) {
                if cached_at.elapsed() < LOCAL_CACHE_TTL {
                    return *cached_price;
                }
            }
        }

        // NIVEL 2: Estrato caliente.
        let hot_cache_key = keys::pricing_key(model_identifier);
        match self.hot_state.get_string(&hot_cache_key).await {
            Ok(Some(cached_price)) => {
                if let Ok(price_cents) = cached_price.parse::<i64>() {
                    self.refresh_local_cache(model_identifier, price_cents).await;
                    return price_cents;
                }
                let _ = self.hot_state.delete_key(&hot_cache_key).await;
            }
            Ok(None) => {}
            Err(hot_fault) => {
                warn!("⚠️ [PRICING_FAIL_OPEN]: Hot strata degraded: {}", hot_fault);
            }
        }

        // NIVEL 3: Ledger Durable (franja vigente).
        let price_cents = match self
            .pricing_repository
            .find_effective_price(model_identifier, Utc::now())
            .await
        {
            Ok(Some(pricing_record)) => derive_request_price_cents(
                pricing_record.input_price_cents_per_million,
                pricing_record.output_price_cents_per_million,
            ),
            Ok(None) => {
                debug!("💲 [PRICING]: No effective window for '{}'. Safe default.", model_identifier);
                FALLBACK_PRICE_CENTS
            }
            Err(durable_fault) => {
                warn!("⚠️ [PRICING_FAIL_OPEN]: Durable degraded, safe default: {}", durable_fault);
                FALLBACK_PRICE_CENTS
            }
        };

        if let Err(cache_fault) = self
            .hot_state
            .set_string_with_ttl(&hot_cache_key, &price_cents.to_string(), HOT_CACHE_TTL_SECONDS)
            .await
        {
            warn!("⚠️ [PRICING]: Hot cache write degraded: {}", cache_fault);
        }
        self.refresh_local_cache(model_identifier, price_cents).await;

        price_cents
    }

    async fn refresh_local_cache(&self, model_identifier: &str, price_cents: i64) {
        let mut local_guard = self.local_price_cache.write().await;
        local_guard.insert(model_identifier.to_string(), (price_cents, Instant::now()));
    }

    /// Invalidación por edición de precios: revienta ambos niveles.
    pub async fn invalidate_price_cache(&self, model_identifier: &str) {
        self.local_price_cache.write().await.remove(model_identifier);
        let _ = self.hot_state.delete_key(&keys::pricing_key(model_identifier)).await;
    }
}
