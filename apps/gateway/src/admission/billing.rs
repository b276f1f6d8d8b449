// [apps/gateway/src/admission/billing.rs]
/*!
 * =================================================================
 * APARATO: BILLING ENGINE (V4.5 - GATEWAY MASTER)
 * CLASIFICACIÓN: ADMISSION STRATUM (ESTRATO L4)
 * RESPONSABILIDAD: DECISIÓN ATÓMICA ALLOWANCE-OR-WALLET CON IDEMPOTENCIA
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. SINGLE ROUND-TRIP: El script caliente decide candado, replay,
 *    allowance, billetera gratuita, fondos insuficientes o débito en
 *    una sola ejecución atómica.
 * 2. DURABLE ECHO + ROLLBACK: Los éxitos wallet-source cristalizan
 *    sincrónicamente en el Ledger Durable; un colapso durable revierte
 *    el débito caliente y emite billing_unavailable.
 * 3. ASYMMETRIC FAIL POLICY: Sin billetera en juego la caída del
 *    estrato caliente admite (fail-open); con débito potencial,
 *    deniega (fail-closed).
 *
 * # Mathematical Proof (Charge Idempotency):
 * La clave idem:billing:{owner}:{request_id} se escribe en el mismo
 * script que muta el contador o el balance. Para un request_id dado,
 * a lo sumo una ejecución observa la clave ausente: a lo sumo un cargo.
 * =================================================================
 */

use crate::admission::wallet::WalletLedgerService;
use crate::errors::GatewayError;
use chrono::Utc;
use omniway_domain_billing::{
    seconds_until_utc_midnight, utc_day_stamp, BillingSource, ChargeCode, ChargeDecision,
    IDEMPOTENCY_TTL_SECONDS,
};
use omniway_domain_models::owner::OwnerRef;
use omniway_domain_models::policy::Policy;
use omniway_infra_db::repositories::WalletRepository;
use omniway_infra_hotstate::scripts::{verdict_elements, verdict_int, verdict_string, ScriptVerdict};
use omniway_infra_hotstate::{keys, HotStateClient, ScriptVault};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

pub struct BillingEngine {
    hot_state: HotStateClient,
    script_vault: Arc<ScriptVault>,
    wallet_repository: Arc<WalletRepository>,
    wallet_ledger: Arc<WalletLedgerService>,
}

impl BillingEngine {
    pub fn new(
        hot_state: HotStateClient,
        script_vault: Arc<ScriptVault>,
        wallet_repository: Arc<WalletRepository>,
        wallet_ledger: Arc<WalletLedgerService>,
    ) -> Self {
        Self { hot_state, script_vault, wallet_repository, wallet_ledger }
    }

    /**
     * Decisión de cargo para una petición.
     *
     * # Logic:
     * 1. Con billetera habilitada, garantiza el cache bootstrapeado.
     * 2. Ejecuta el script atómico (candado -> replay -> allowance ->
     *    billetera gratuita -> fondos -> débito).
     * 3. Eco durable sincrónico de los débitos wallet-source, con
     *    rollback caliente ante colapso.
     */
    #[instrument(skip(self, policy), fields(owner = %owner, request = request_identifier))]
    pub async fn charge(
        &self,
        owner: &OwnerRef,
        request_identifier: &str,
        model_identifier: &str,
        price_cents: i64,
        policy: &Policy,
    ) -> Result<ChargeDecision, GatewayError> {
        // Precio efectivo nulo con billetera deshabilitada por plan.
        let effective_price_cents = if policy.has_wallet_access { price_cents } else { 0 };

        if policy.has_wallet_access {
            self.ensure_wallet_cache(owner).await?;
        }

        let now = Utc::now();
        let script_keys = vec![
            keys::allowance_key(owner, &utc_day_stamp(now)),
            keys::wallet_key(owner),
            keys::billing_idempotency_key(owner, request_identifier),
            keys::wallet_lock_key(owner),
        ];
        let script_args = vec![
            policy.daily_allowance.to_string(),
            effective_price_cents.to_string(),
            IDEMPOTENCY_TTL_SECONDS.to_string(),
            seconds_until_utc_midnight(now).to_string(),
        ];

        let verdict = match self.script_vault.invoke("billing_charge", &script_keys, &script_args).await
        {
            Ok(verdict) => verdict,
            Err(hot_fault) if effective_price_cents == 0 => {
                // Sin débito posible: la caída del estrato caliente admite.
                warn!("⚠️ [BILLING_FAIL_OPEN]: Hot strata degraded, admitting free path: {}", hot_fault);
                return Ok(ChargeDecision {
                    code: ChargeCode::Charged,
                    source: BillingSource::Allowance,
                    charged_cents: 0,
                    allowance_remaining: policy.daily_allowance,
                    wallet_balance_cents: 0,
                });
            }
            Err(hot_fault) => {
                // Débito potencial: fail-closed.
                error!("❌ [BILLING_FAIL_CLOSED]: Hot strata down with wallet at stake: {}", hot_fault);
                return Err(GatewayError::BillingUnavailable);
            }
        };

        let decision = decode_charge_verdict(&verdict)?;

        match decision.code {
            ChargeCode::Denied => match decision.source {
                BillingSource::Locked => Err(GatewayError::WalletLocked),
                BillingSource::InsufficientWallet => Err(GatewayError::InsufficientWallet {
                    wallet_balance_cents: decision.wallet_balance_cents,
                    required_cents: decision.charged_cents,
                }),
                _ => Err(GatewayError::Internal("denied verdict with benign source".into())),
            },
            ChargeCode::Replayed => Ok(decision),
            ChargeCode::Charged => {
                if decision.source == BillingSource::Wallet {
                    self.echo_charge_to_durable(owner, request_identifier, model_identifier, &decision)
                        .await?;
                }
                Ok(decision)
            }
        }
    }

    /// Eco durable del débito; revierte el estrato caliente al fallar.
    async fn echo_charge_to_durable(
        &self,
        owner: &OwnerRef,
        request_identifier: &str,
        model_identifier: &str,
        decision: &ChargeDecision,
    ) -> Result<(), GatewayError> {
        let durable_echo = self
            .wallet_repository
            .apply_charge(owner, decision.charged_cents, request_identifier, model_identifier)
            .await;

        match durable_echo {
            Ok(durable_balance) => {
                info!(
                    "💳 [BILLING]: {} charged {} cents (durable balance {}).",
                    owner, decision.charged_cents, durable_balance
                );
                Ok(())
            }
            Err(durable_fault) => {
                error!(
                    "❌ [BILLING_DURABLE_COLLAPSE]: Charge echo failed for {}: {}. Rolling back hot debit.",
                    request_identifier, durable_fault
                );
                self.wallet_ledger.rollback_cache(owner, decision.charged_cents).await;
                // La decisión cacheada del débito revertido también se purga.
                let _ = self
                    .hot_state
                    .delete_key(&keys::billing_idempotency_key(owner, request_identifier))
                    .await;
                Err(GatewayError::BillingUnavailable)
            }
        }
    }

    /// Bootstrap perezoso del balance cacheado (arranque en frío).
    async fn ensure_wallet_cache(&self, owner: &OwnerRef) -> Result<(), GatewayError> {
        match self.hot_state.key_exists(&keys::wallet_key(owner)).await {
            Ok(true) => Ok(()),
            Ok(false) => self.wallet_ledger.bootstrap_cache(owner).await,
            Err(hot_fault) => {
                // El script decidirá; la falla real aflorará allí.
                warn!("⚠️ [BILLING]: Wallet cache probe degraded: {}", hot_fault);
                Ok(())
            }
        }
    }
}

fn decode_charge_verdict(verdict: &ScriptVerdict) -> Result<ChargeDecision, GatewayError> {
    let elements =
        verdict_elements(verdict).map_err(|fault| GatewayError::Internal(fault.to_string()))?;

    if elements.len() != 5 {
        return Err(GatewayError::Internal("billing verdict arity mismatch".into()));
    }

    let code = ChargeCode::from_wire(
        verdict_int(&elements[0]).map_err(|fault| GatewayError::Internal(fault.to_string()))?,
    )
    .ok_or_else(|| GatewayError::Internal("unknown charge code".into()))?;

    let source_label =
        verdict_string(&elements[1]).map_err(|fault| GatewayError::Internal(fault.to_string()))?;
    let source = BillingSource::from_label(&source_label)
        .ok_or_else(|| GatewayError::Internal(format!("unknown billing source '{}'", source_label)))?;

    let charged_cents =
        verdict_int(&elements[2]).map_err(|fault| GatewayError::Internal(fault.to_string()))?;
    let allowance_remaining =
        verdict_int(&elements[3]).map_err(|fault| GatewayError::Internal(fault.to_string()))?;
    let wallet_balance_cents = verdict_string(&elements[4])
        .map_err(|fault| GatewayError::Internal(fault.to_string()))?
        .parse::<i64>()
        .map_err(|_| GatewayError::Internal("non-numeric wallet balance".into()))?;

    Ok(ChargeDecision { code, source, charged_cents, allowance_remaining, wallet_balance_cents })
}
