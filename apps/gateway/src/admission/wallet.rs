// [apps/gateway/src/admission/wallet.rs]
/*!
 * =================================================================
 * APARATO: WALLET LEDGER SERVICE (V4.3 - GATEWAY MASTER)
 * CLASIFICACIÓN: ADMISSION STRATUM (ESTRATO L4)
 * RESPONSABILIDAD: ORQUESTACIÓN DURABLE + CACHE DE LA BILLETERA
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. DURABLE FIRST, INCRBY AFTER: Toda mutación cristaliza primero en
 *    el Ledger Durable; el cache se nivela con INCRBY race-safe bajo
 *    cargos y recargas concurrentes.
 * 2. BOOTSTRAP EXCEPTION: El arranque en frío y la reconciliación son
 *    los únicos caminos que escriben el cache con SET absoluto.
 * =================================================================
 */

use crate::errors::GatewayError;
use omniway_domain_models::owner::OwnerRef;
use omniway_infra_db::repositories::WalletRepository;
use omniway_infra_hotstate::{keys, HotStateClient};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

pub struct WalletLedgerService {
    hot_state: HotStateClient,
    wallet_repository: Arc<WalletRepository>,
}

impl WalletLedgerService {
    pub fn new(hot_state: HotStateClient, wallet_repository: Arc<WalletRepository>) -> Self {
        Self { hot_state, wallet_repository }
    }

    /**
     * Recarga: transacción durable (techo incluido) y nivelación del
     * cache con INCRBY. Retorna el balance durable posterior.
     */
    #[instrument(skip(self), fields(owner = %owner))]
    pub async fn top_up(
        &self,
        owner: &OwnerRef,
        amount_cents: i64,
        payment_reference: &str,
    ) -> Result<i64, GatewayError> {
        let balance_after = self
            .wallet_repository
            .apply_topup(owner, amount_cents, payment_reference)
            .await
            .map_err(|durable_fault| GatewayError::Internal(durable_fault.to_string()))?;

        if let Err(cache_fault) =
            self.hot_state.increment_by(&keys::wallet_key(owner), amount_cents).await
        {
            warn!("⚠️ [WALLET_CACHE]: Top-up INCRBY degraded (reconcile will heal): {}", cache_fault);
        }

        Ok(balance_after)
    }

    /**
     * Bloqueo por disputa: banderas durables, bandera caliente y
     * purga de la política cacheada (transporta wallet_locked).
     */
    #[instrument(skip(self), fields(owner = %owner))]
    pub async fn lock(
        &self,
        owner: &OwnerRef,
        lock_reason: &str,
        dispute_identifier: Option<&str>,
    ) -> Result<(), GatewayError> {
        self.wallet_repository
            .set_lock(owner, lock_reason, dispute_identifier)
            .await
            .map_err(|durable_fault| GatewayError::Internal(durable_fault.to_string()))?;

        if let Err(cache_fault) =
            self.hot_state.set_string(&keys::wallet_lock_key(owner), "1").await
        {
            error!("❌ [WALLET_LOCK]: Hot flag write failed (billing may admit): {}", cache_fault);
        }
        let _ = self.hot_state.delete_key(&keys::policy_key(owner)).await;

        info!("🔒 [WALLET_LOCK]: {} locked. Reason: {}", owner, lock_reason);
        Ok(())
    }

    /// Desbloqueo: limpia banderas durables y calientes.
    #[instrument(skip(self), fields(owner = %owner))]
    pub async fn unlock(&self, owner: &OwnerRef, unlock_reason: &str) -> Result<(), GatewayError> {
        self.wallet_repository
            .clear_lock(owner, unlock_reason)
            .await
            .map_err(|durable_fault| GatewayError::Internal(durable_fault.to_string()))?;

        let _ = self.hot_state.delete_key(&keys::wallet_lock_key(owner)).await;
        let _ = self.hot_state.delete_key(&keys::policy_key(owner)).await;

        info!("🔓 [WALLET_UNLOCK]: {} released. Reason: {}", owner, unlock_reason);
        Ok(())
    }

    /// Compensación caliente tras colapso durable del cargo.
    pub async fn rollback_cache(&self, owner: &OwnerRef, amount_cents: i64) {
        if let Err(rollback_fault) =
            self.hot_state.increment_by(&keys::wallet_key(owner), amount_cents).await
        {
            error!(
                "🚨 [WALLET_ROLLBACK_CRITICAL]: Hot compensation of {} cents failed for {}: {}",
                amount_cents, owner, rollback_fault
            );
        }
    }

    /**
     * Reconciliación: sobreescribe el cache desde el balance durable
     * y sella last_reconciled_at.
     */
    #[instrument(skip(self), fields(owner = %owner))]
    pub async fn reconcile(&self, owner: &OwnerRef) -> Result<i64, GatewayError> {
        let snapshot = self
            .wallet_repository
            .fetch_snapshot(owner)
            .await
            .map_err(|durable_fault| GatewayError::Internal(durable_fault.to_string()))?;

        let (balance_cents, is_locked) = snapshot
            .map(|wallet| (wallet.balance_cents, wallet.is_locked))
            .unwrap_or((0, false));

        self.write_cache_absolute(owner, balance_cents, is_locked).await;

        self.wallet_repository
            .stamp_reconciliation(owner)
            .await
            .map_err(|durable_fault| GatewayError::Internal(durable_fault.to_string()))?;

        info!("⚖️ [WALLET_RECONCILE]: {} leveled at {} cents.", owner, balance_cents);
        Ok(balance_cents)
    }

    /**
     * Arranque en frío del cache: balance y bandera desde el Ledger
     * Durable. Único camino, junto a reconcile, con SET absoluto.
     */
    #[instrument(skip(self), fields(owner = %owner))]
    pub async fn bootstrap_cache(&self, owner: &OwnerRef) -> Result<(), GatewayError> {
        let snapshot = self
            .wallet_repository
            .fetch_snapshot(owner)
            .await
            .map_err(|durable_fault| GatewayError::Internal(durable_fault.to_string()))?;

        let (balance_cents, is_locked) = snapshot
            .map(|wallet| (wallet.balance_cents, wallet.is_locked))
            .unwrap_or((0, false));

        self.write_cache_absolute(owner, balance_cents, is_locked).await;
        Ok(())
    }

    async fn write_cache_absolute(&self, owner: &OwnerRef, balance_cents: i64, is_locked: bool) {
        if let Err(cache_fault) = self
            .hot_state
            .set_string(&keys::wallet_key(owner), &balance_cents.to_string())
            .await
        {
            warn!("⚠️ [WALLET_CACHE]: Absolute balance write degraded: {}", cache_fault);
        }

        let lock_key = keys::wallet_lock_key(owner);
        let lock_result = if is_locked {
            self.hot_state.set_string(&lock_key, "1").await
        } else {
            self.hot_state.delete_key(&lock_key).await
        };
        if let Err(cache_fault) = lock_result {
            warn!("⚠️ [WALLET_CACHE]: Lock flag sync degraded: {}", cache_fault);
        }
    }
}
