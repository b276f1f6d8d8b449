// [apps/gateway/src/admission/auth.rs]
/*!
 * =================================================================
 * APARATO: KEY & POLICY RESOLVER (V4.4 - GATEWAY MASTER)
 * CLASIFICACIÓN: SECURITY STRATUM (ESTRATO L4)
 * RESPONSABILIDAD: AUTENTICACIÓN BEARER Y DERIVACIÓN DE POLÍTICA
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. TWO-LEVEL CACHE: auth:key:{hash} y policy:{owner} viven 5 minutos
 *    en el estrato caliente; los fallos de lookup jamás se cachean.
 * 2. FAIL-OPEN ON HOT FAULTS: Una caída de Redis degrada al Ledger
 *    Durable con warning; la admisión no se convierte en acantilado.
 * 3. FIRE-AND-FORGET STAMPING: El sellado de uso de la clave se
 *    despacha fuera del camino crítico.
 * =================================================================
 */

use crate::errors::{AuthFailure, GatewayError};
use chrono::Utc;
use omniway_domain_models::auth::{ApiKeyKind, ApiKeyRecord, AuthContext, KeyLiveness};
use omniway_domain_models::owner::OwnerRef;
use omniway_domain_models::policy::Policy;
use omniway_infra_db::repositories::{ApiKeyRepository, PolicyRepository};
use omniway_infra_hotstate::{keys, HotStateClient};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// TTL de las entradas de autenticación y política (segundos).
const AUTH_CACHE_TTL_SECONDS: u64 = 300;
/// Prefijo sellado de todo secreto emitido por la plataforma.
const BEARER_SECRET_PREFIX: &str = "omni_";

/// Resolutor de credenciales y política efectiva.
pub struct AuthService {
    hot_state: HotStateClient,
    api_key_repository: Arc<ApiKeyRepository>,
    policy_repository: Arc<PolicyRepository>,
}

/**
 * Extrae el secreto del header Authorization.
 * Exige el esquema Bearer y el prefijo `omni_`.
 */
pub fn extract_bearer_secret(authorization_header: Option<&str>) -> Result<&str, GatewayError> {
    let header_content =
        authorization_header.ok_or(GatewayError::Auth(AuthFailure::InvalidFormat))?;

    let secret = header_content
        .strip_prefix("Bearer ")
        .ok_or(GatewayError::Auth(AuthFailure::InvalidFormat))?;

    if !secret.starts_with(BEARER_SECRET_PREFIX) {
        return Err(GatewayError::Auth(AuthFailure::InvalidFormat));
    }

    Ok(secret)
}

/// Huella SHA-256 hexadecimal del secreto (única forma persistida).
pub fn digest_secret(secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

impl AuthService {
    pub fn new(
        hot_state: HotStateClient,
        api_key_repository: Arc<ApiKeyRepository>,
        policy_repository: Arc<PolicyRepository>,
    ) -> Self {
        Self { hot_state, api_key_repository, policy_repository }
    }

    /**
     * Pipeline completo de autenticación: parse, huella, lookup con
     * cache, vitalidad, resolución de principal, allowlist de IP,
     * política efectiva y sellado de uso.
     */
    #[instrument(skip(self, authorization_header), fields(ip = client_ip))]
    pub async fn authenticate(
        &self,
        authorization_header: Option<&str>,
        client_ip: &str,
    ) -> Result<AuthContext, GatewayError> {
        let secret = extract_bearer_secret(authorization_header)?;
        let hashed_secret = digest_secret(secret);

        let key_record = self.resolve_key_record(&hashed_secret).await?;

        match key_record.liveness(Utc::now()) {
            KeyLiveness::Alive => {}
            KeyLiveness::Inactive => return Err(GatewayError::Auth(AuthFailure::Inactive)),
            KeyLiveness::Expired => return Err(GatewayError::Auth(AuthFailure::Expired)),
        }

        let owner = self.resolve_owner(&key_record).await?;

        if !key_record.allowed_ips.is_empty()
            && !key_record.allowed_ips.iter().any(|allowed| allowed == client_ip)
        {
            warn!("⛔ [AUTH]: IP {} outside key allowlist ({}).", client_ip, key_record.key_prefix);
            return Err(GatewayError::Auth(AuthFailure::IpNotAllowed));
        }

        let policy = self.resolve_policy(&owner).await?;

        // Sellado de uso fuera del camino crítico.
        let stamping_repository = Arc::clone(&self.api_key_repository);
        let stamped_key_identifier = key_record.api_key_identifier.clone();
        let stamped_client_ip = client_ip.to_string();
        tokio::spawn(async move {
            stamping_repository.stamp_key_usage(&stamped_key_identifier, &stamped_client_ip).await;
        });

        Ok(AuthContext {
            owner,
            api_key_identifier: key_record.api_key_identifier,
            key_prefix: key_record.key_prefix,
            scopes: key_record.scopes,
            key_allowed_models: key_record.allowed_models,
            key_allowed_ips: key_record.allowed_ips,
            policy,
        })
    }

    /// Lookup de la clave: estrato caliente primero, durable después.
    async fn resolve_key_record(&self, hashed_secret: &str) -> Result<ApiKeyRecord, GatewayError> {
        let cache_key = keys::auth_key(hashed_secret);

        match self.hot_state.get_string(&cache_key).await {
            Ok(Some(cached_record)) => {
                if let Ok(record) = serde_json::from_str::<ApiKeyRecord>(&cached_record) {
                    debug!("🔑 [AUTH]: Key resolved from hot strata ({}).", record.key_prefix);
                    return Ok(record);
                }
                // Entrada corrupta: se purga y se cae al Ledger Durable.
                let _ = self.hot_state.delete_key(&cache_key).await;
            }
            Ok(None) => {}
            Err(hot_fault) => {
                warn!("⚠️ [AUTH_FAIL_OPEN]: Hot strata degraded, falling to durable: {}", hot_fault);
            }
        }

        let record = self
            .api_key_repository
            .find_by_hashed_secret(hashed_secret)
            .await
            .map_err(|durable_fault| GatewayError::Internal(durable_fault.to_string()))?
            .ok_or(GatewayError::Auth(AuthFailure::Invalid))?;

        // Solo los éxitos se cachean; una huella desconocida nunca.
        if let Ok(serialized_record) = serde_json::to_string(&record) {
            if let Err(cache_fault) = self
                .hot_state
                .set_string_with_ttl(&cache_key, &serialized_record, AUTH_CACHE_TTL_SECONDS)
                .await
            {
                warn!("⚠️ [AUTH]: Key cache write degraded: {}", cache_fault);
            }
        }

        Ok(record)
    }

    /// Clave de usuario => (User, user_id); de proyecto => (Org, org matriz).
    async fn resolve_owner(&self, key_record: &ApiKeyRecord) -> Result<OwnerRef, GatewayError> {
        match key_record.key_kind {
            ApiKeyKind::User => key_record
                .user_identifier
                .clone()
                .map(OwnerRef::User)
                .ok_or(GatewayError::Auth(AuthFailure::Invalid)),
            ApiKeyKind::Project => {
                let project_identifier = key_record
                    .project_identifier
                    .clone()
                    .ok_or(GatewayError::Auth(AuthFailure::Invalid))?;

                let org_identifier = self
                    .api_key_repository
                    .resolve_project_org(&project_identifier)
                    .await
                    .map_err(|durable_fault| GatewayError::Internal(durable_fault.to_string()))?
                    .ok_or(GatewayError::Auth(AuthFailure::Invalid))?;

                Ok(OwnerRef::Org(org_identifier))
            }
        }
    }

    /**
     * Política efectiva con cache de 5 minutos. Ante suscripción
     * ausente o no facturable se sintetiza la política gratuita.
     */
    async fn resolve_policy(&self, owner: &OwnerRef) -> Result<Policy, GatewayError> {
        let cache_key = keys::policy_key(owner);

        match self.hot_state.get_string(&cache_key).await {
            Ok(Some(cached_policy)) => {
                if let Ok(policy) = serde_json::from_str::<Policy>(&cached_policy) {
                    return Ok(policy);
                }
                let _ = self.hot_state.delete_key(&cache_key).await;
            }
            Ok(None) => {}
            Err(hot_fault) => {
                warn!("⚠️ [POLICY_FAIL_OPEN]: Hot strata degraded: {}", hot_fault);
            }
        }

        let policy = self
            .policy_repository
            .resolve_plan_policy(owner)
            .await
            .map_err(|durable_fault| GatewayError::Internal(durable_fault.to_string()))?
            .unwrap_or_else(|| {
                debug!("🪙 [POLICY]: No billable subscription for {}. Free policy synthesized.", owner);
                Policy::default_free()
            });

        if let Ok(serialized_policy) = serde_json::to_string(&policy) {
            if let Err(cache_fault) = self
                .hot_state
                .set_string_with_ttl(&cache_key, &serialized_policy, AUTH_CACHE_TTL_SECONDS)
                .await
            {
                warn!("⚠️ [POLICY]: Policy cache write degraded: {}", cache_fault);
            }
        }

        Ok(policy)
    }

    /// Invalidación por revocación de clave.
    pub async fn invalidate_key_cache(&self, hashed_secret: &str) {
        let _ = self.hot_state.delete_key(&keys::auth_key(hashed_secret)).await;
    }

    /// Invalidación por cambio de plan, suscripción o bloqueo de billetera.
    pub async fn invalidate_policy_cache(&self, owner: &OwnerRef) {
        let _ = self.hot_state.delete_key(&keys::policy_key(owner)).await;
    }
}
