// [libs/infra/db/src/repositories/policy.rs]
/*!
 * =================================================================
 * APARATO: POLICY RESOLUTION REPOSITORY (V4.2 - GATEWAY MASTER)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: DERIVACIÓN DURABLE DE LA POLÍTICA EFECTIVA
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. TRIAD JOIN: Una sola consulta une suscripción + plan + banderas
 *    de billetera; la política jamás se almacena de vuelta.
 * 2. FREE FALLBACK DELEGATION: Ante suscripción ausente o no facturable
 *    retorna None; la síntesis de la política gratuita es del resolver.
 * =================================================================
 */

use crate::errors::DbError;
use crate::TursoClient;
use libsql::params;
use omniway_domain_models::owner::OwnerRef;
use omniway_domain_models::policy::{Policy, SubscriptionStatus};
use tracing::instrument;

pub struct PolicyRepository {
    database_client: TursoClient,
}

impl PolicyRepository {
    pub fn new(client: TursoClient) -> Self {
        Self { database_client: client }
    }

    /**
     * Resuelve la política del plan contratado para un principal.
     *
     * # Logic:
     * Retorna Some(policy) solo si existe suscripción en estado
     * facturable (ACTIVE | TRIALING | PAST_DUE); en cualquier otro
     * caso retorna None y el resolver sintetiza la política gratuita.
     */
    #[instrument(skip(self), fields(owner = %owner))]
    pub async fn resolve_plan_policy(&self, owner: &OwnerRef) -> Result<Option<Policy>, DbError> {
        let database_connection = self.database_client.get_connection()?;

        let mut query_results = database_connection
            .query(
                "SELECT
                    p.requests_per_minute, p.requests_per_hour, p.requests_per_day,
                    p.daily_allowance, p.max_concurrent_requests,
                    p.max_input_tokens, p.max_output_tokens, p.max_body_bytes,
                    p.has_streaming, p.has_priority, p.has_wallet_access,
                    p.allowed_models, s.status,
                    COALESCE(w.is_locked, 0)
                 FROM subscriptions s
                 JOIN plans p ON p.id = s.plan_id
                 LEFT JOIN wallets w
                    ON w.owner_type = s.owner_type AND w.owner_id = s.owner_id
                 WHERE s.owner_type = ?1 AND s.owner_id = ?2",
                params![owner.variant_label(), owner.identifier()],
            )
            .await?;

        let data_row = match query_results.next().await? {
            Some(row) => row,
            None => return Ok(None),
        };

        let subscription_status = parse_subscription_status(&data_row.get::<String>(12)?)?;
        if !subscription_status.grants_plan_policy() {
            return Ok(None);
        }

        let allowed_models_raw = data_row.get::<String>(11)?;
        let allowed_models =
            serde_json::from_str::<Vec<String>>(&allowed_models_raw).unwrap_or_default();

        Ok(Some(Policy {
            requests_per_minute: data_row.get::<i64>(0)?,
            requests_per_hour: data_row.get::<i64>(1)?,
            requests_per_day: data_row.get::<i64>(2)?,
            daily_allowance: data_row.get::<i64>(3)?,
            max_concurrent_requests: data_row.get::<i64>(4)?,
            max_input_tokens: data_row.get::<i64>(5)?,
            max_output_tokens: data_row.get::<i64>(6)?,
            max_body_bytes: data_row.get::<i64>(7)?,
            has_streaming: data_row.get::<i64>(8)? != 0,
            has_priority: data_row.get::<i64>(9)? != 0,
            has_wallet_access: data_row.get::<i64>(10)? != 0,
            allowed_models,
            subscription_status,
            wallet_locked: data_row.get::<i64>(13)? != 0,
        }))
    }

    /// Cristaliza un plan (aprovisionamiento y Proving Grounds).
    pub async fn register_plan(
        &self,
        plan_identifier: &str,
        plan_name: &str,
        policy_template: &Policy,
    ) -> Result<(), DbError> {
        let database_connection = self.database_client.get_connection()?;

        database_connection
            .execute(
                "INSERT OR REPLACE INTO plans (
                    id, name, requests_per_minute, requests_per_hour, requests_per_day,
                    daily_allowance, max_concurrent_requests, max_input_tokens,
                    max_output_tokens, max_body_bytes, has_streaming, has_priority,
                    has_wallet_access, allowed_models
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
                params![
                    plan_identifier,
                    plan_name,
                    policy_template.requests_per_minute,
                    policy_template.requests_per_hour,
                    policy_template.requests_per_day,
                    policy_template.daily_allowance,
                    policy_template.max_concurrent_requests,
                    policy_template.max_input_tokens,
                    policy_template.max_output_tokens,
                    policy_template.max_body_bytes,
                    policy_template.has_streaming as i64,
                    policy_template.has_priority as i64,
                    policy_template.has_wallet_access as i64,
                    serde_json::to_string(&policy_template.allowed_models)
                        .unwrap_or_else(|_| "[]".into()),
                ],
            )
            .await?;

        Ok(())
    }

    /// Vincula un principal con un plan bajo un estado de suscripción.
    pub async fn register_subscription(
        &self,
        subscription_identifier: &str,
        owner: &OwnerRef,
        plan_identifier: &str,
        status: SubscriptionStatus,
    ) -> Result<(), DbError> {
        let database_connection = self.database_client.get_connection()?;

        database_connection
            .execute(
                "INSERT OR REPLACE INTO subscriptions (id, owner_type, owner_id, plan_id, status)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    subscription_identifier,
                    owner.variant_label(),
                    owner.identifier(),
                    plan_identifier,
                    status_label(status),
                ],
            )
            .await?;

        Ok(())
    }
}

fn status_label(status: SubscriptionStatus) -> &'static str {
    match status {
        SubscriptionStatus::Active => "ACTIVE",
        SubscriptionStatus::Trialing => "TRIALING",
        SubscriptionStatus::PastDue => "PAST_DUE",
        SubscriptionStatus::Canceled => "CANCELED",
        SubscriptionStatus::Incomplete => "INCOMPLETE",
        SubscriptionStatus::Unpaid => "UNPAID",
    }
}

fn parse_subscription_status(raw_status: &str) -> Result<SubscriptionStatus, DbError> {
    match raw_status {
        "ACTIVE" => Ok(SubscriptionStatus::Active),
        "TRIALING" => Ok(SubscriptionStatus::Trialing),
        "PAST_DUE" => Ok(SubscriptionStatus::PastDue),
        "CANCELED" => Ok(SubscriptionStatus::Canceled),
        "INCOMPLETE" => Ok(SubscriptionStatus::Incomplete),
        "UNPAID" => Ok(SubscriptionStatus::Unpaid),
        other => Err(DbError::MappingError(format!("unknown subscription status '{}'", other))),
    }
}
