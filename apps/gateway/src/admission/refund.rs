// [apps/gateway/src/admission/refund.rs]
/*!
 * =================================================================
 * APARATO: REFUND ENGINE (V4.3 - GATEWAY MASTER)
 * CLASIFICACIÓN: ADMISSION STRATUM (ESTRATO L4)
 * RESPONSABILIDAD: REEMBOLSO TTFB-0 CON TECHO DIARIO E IDEMPOTENCIA
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. WALLET-ONLY DOCTRINE: Solo los cargos wallet-source son
 *    reembolsables; el allowance consumido jamás se devuelve.
 * 2. COMPENSATING ROLLBACK: Un colapso durable tras el script revierte
 *    idempotencia, contador diario y balance caliente; si la propia
 *    compensación colapsa se emite rastro CRITICAL para intervención.
 *
 * # Mathematical Proof (Daily Cap):
 * El contador refund:{owner}:{day} solo se incrementa tras superar el
 * chequeo de techo dentro del mismo script; el día UTC jamás supera
 * DAILY_REFUND_CAP reembolsos aplicados.
 * =================================================================
 */

use crate::errors::GatewayError;
use chrono::Utc;
use omniway_domain_billing::{
    seconds_until_utc_midnight, utc_day_stamp, RefundOutcome, DAILY_REFUND_CAP,
    IDEMPOTENCY_TTL_SECONDS,
};
use omniway_domain_models::owner::OwnerRef;
use omniway_infra_db::repositories::WalletRepository;
use omniway_infra_hotstate::scripts::{verdict_int, ScriptVerdict};
use omniway_infra_hotstate::{keys, HotStateClient, ScriptVault};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

pub struct RefundEngine {
    hot_state: HotStateClient,
    script_vault: Arc<ScriptVault>,
    wallet_repository: Arc<WalletRepository>,
}

impl RefundEngine {
    pub fn new(
        hot_state: HotStateClient,
        script_vault: Arc<ScriptVault>,
        wallet_repository: Arc<WalletRepository>,
    ) -> Self {
        Self { hot_state, script_vault, wallet_repository }
    }

    /**
     * Reembolso terminal de una petición.
     *
     * # Logic:
     * 1. NO_CHARGE si no hubo débito de billetera o el monto es nulo.
     * 2. Script atómico: idempotencia -> techo diario -> acreditación.
     * 3. Eco durable (REFUND en el ledger); colapso => compensación
     *    caliente completa.
     */
    #[instrument(skip(self), fields(owner = %owner, request = request_identifier))]
    pub async fn refund(
        &self,
        owner: &OwnerRef,
        request_identifier: &str,
        amount_cents: i64,
        refund_reason: &str,
        was_wallet_charge: bool,
    ) -> RefundOutcome {
        if !was_wallet_charge || amount_cents <= 0 {
            return RefundOutcome::NoCharge;
        }

        let now = Utc::now();
        let day_stamp = utc_day_stamp(now);
        let script_keys = vec![
            keys::refund_idempotency_key(owner, request_identifier),
            keys::refund_count_key(owner, &day_stamp),
            keys::wallet_key(owner),
        ];
        let script_args = vec![
            amount_cents.to_string(),
            DAILY_REFUND_CAP.to_string(),
            seconds_until_utc_midnight(now).to_string(),
            IDEMPOTENCY_TTL_SECONDS.to_string(),
        ];

        let verdict = match self.script_vault.invoke("refund", &script_keys, &script_args).await {
            Ok(verdict) => verdict,
            Err(hot_fault) => {
                error!("❌ [REFUND]: Hot strata collapsed mid-refund: {}", hot_fault);
                return RefundOutcome::Error;
            }
        };

        let script_result = match decode_refund_verdict(&verdict) {
            Ok(result) => result,
            Err(decode_fault) => {
                error!("❌ [REFUND]: Verdict undecodable: {}", decode_fault);
                return RefundOutcome::Error;
            }
        };

        match script_result {
            -1 => RefundOutcome::AlreadyRefunded,
            -2 => RefundOutcome::DailyCapExceeded,
            hot_balance_after => {
                self.echo_refund_to_durable(
                    owner,
                    request_identifier,
                    amount_cents,
                    refund_reason,
                    &day_stamp,
                    hot_balance_after,
                )
                .await
            }
        }
    }

    /// Eco durable del reembolso; colapso => compensación caliente total.
    async fn echo_refund_to_durable(
        &self,
        owner: &OwnerRef,
        request_identifier: &str,
        amount_cents: i64,
        refund_reason: &str,
        day_stamp: &str,
        hot_balance_after: i64,
    ) -> RefundOutcome {
        match self
            .wallet_repository
            .apply_refund(owner, amount_cents, request_identifier, refund_reason)
            .await
        {
            Ok(_durable_balance) => {
                info!(
                    "↩️ [REFUND]: {} refunded {} cents for {} (hot balance {}).",
                    owner, amount_cents, request_identifier, hot_balance_after
                );
                RefundOutcome::Success { new_balance_cents: hot_balance_after }
            }
            Err(durable_fault) => {
                warn!(
                    "⚠️ [REFUND_DURABLE_COLLAPSE]: {} for {}. Compensating hot strata.",
                    durable_fault, request_identifier
                );
                self.compensate_hot_refund(owner, request_identifier, amount_cents, day_stamp).await;
                RefundOutcome::Error
            }
        }
    }

    /// Compensación caliente: idempotencia, contador diario y balance.
    async fn compensate_hot_refund(
        &self,
        owner: &OwnerRef,
        request_identifier: &str,
        amount_cents: i64,
        day_stamp: &str,
    ) {
        let mut compensation_failed = false;

        if self
            .hot_state
            .delete_key(&keys::refund_idempotency_key(owner, request_identifier))
            .await
            .is_err()
        {
            compensation_failed = true;
        }
        if self.hot_state.decrement(&keys::refund_count_key(owner, day_stamp)).await.is_err() {
            compensation_failed = true;
        }
        if self.hot_state.increment_by(&keys::wallet_key(owner), -amount_cents).await.is_err() {
            compensation_failed = true;
        }

        if compensation_failed {
            error!(
                "🚨 [REFUND_ROLLBACK_CRITICAL]: Hot compensation incomplete for {} ({} cents). \
                 Operator intervention required.",
                request_identifier, amount_cents
            );
        }
    }
}

fn decode_refund_verdict(verdict: &ScriptVerdict) -> Result<i64, GatewayError> {
    verdict_int(verdict).map_err(|fault| GatewayError::Internal(fault.to_string()))
}
