// [libs/infra/hot-state/src/keys.rs]
/*!
 * =================================================================
 * APARATO: HOT-STATE KEY SCHEMA (V4.1 - GATEWAY MASTER)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: ESQUEMA CANÓNICO DE CLAVES DEL ESTRATO CALIENTE
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. OWNER PARTITION: Toda clave por principal incorpora el fragmento
 *    cerrado `user|org : id`; jamás se concatena un id sin variante.
 * 2. SINGLE AUTHORITY: Los consumidores nunca formatean claves a mano;
 *    este módulo es la única gramática admitida.
 * =================================================================
 */

use omniway_domain_models::owner::OwnerRef;

/// Clave de cache de autenticación por huella SHA-256.
pub fn auth_key(hashed_secret: &str) -> String {
    format!("auth:key:{}", hashed_secret)
}

/// Clave de cache de política efectiva por principal.
pub fn policy_key(owner: &OwnerRef) -> String {
    format!("policy:{}", owner.key_fragment())
}

/// Clave de cache del catálogo por modelo.
pub fn catalog_key(model_identifier: &str) -> String {
    format!("catalog:model:{}", model_identifier)
}

/// Clave de cache de precio por modelo.
pub fn pricing_key(model_identifier: &str) -> String {
    format!("pricing:{}", model_identifier)
}

/// Contador de ventana fija: `rl:{owner}:{window}:{bucket}`.
pub fn rate_limit_key(owner: &OwnerRef, window_seconds: i64, bucket_index: i64) -> String {
    format!("rl:{}:{}:{}", owner.key_fragment(), window_seconds, bucket_index)
}

/// Contador de slots concurrentes por principal.
pub fn concurrency_key(owner: &OwnerRef) -> String {
    format!("concurrency:{}", owner.key_fragment())
}

/// Hash compañero request_id -> ts para depuración de slots.
pub fn concurrency_registry_key(owner: &OwnerRef) -> String {
    format!("concurrency:req:{}", owner.key_fragment())
}

/// Contador de allowance por (principal, día UTC).
pub fn allowance_key(owner: &OwnerRef, utc_day_stamp: &str) -> String {
    format!("allowance:{}:{}", owner.key_fragment(), utc_day_stamp)
}

/// Balance cacheado de la billetera (sin TTL; solo INCRBY o bootstrap).
pub fn wallet_key(owner: &OwnerRef) -> String {
    format!("wallet:{}", owner.key_fragment())
}

/// Bandera de bloqueo de la billetera.
pub fn wallet_lock_key(owner: &OwnerRef) -> String {
    format!("wallet:{}:locked", owner.key_fragment())
}

/// Clave de idempotencia de la decisión de cargo.
pub fn billing_idempotency_key(owner: &OwnerRef, request_identifier: &str) -> String {
    format!("idem:billing:{}:{}", owner.key_fragment(), request_identifier)
}

/// Clave de idempotencia del reembolso.
pub fn refund_idempotency_key(owner: &OwnerRef, request_identifier: &str) -> String {
    format!("idem:refund:{}:{}", owner.key_fragment(), request_identifier)
}

/// Contador diario de reembolsos por principal.
pub fn refund_count_key(owner: &OwnerRef, utc_day_stamp: &str) -> String {
    format!("refund:{}:{}", owner.key_fragment(), utc_day_stamp)
}

/// Blob JSON del circuito por proveedor.
pub fn circuit_key(provider_name: &str) -> String {
    format!("circuit:{}", provider_name)
}
