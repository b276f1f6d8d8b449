// [libs/infra/db/src/schema.rs]
/**
 * =================================================================
 * APARATO: GATEWAY DATABASE SCHEMA (V4.2 - ADMISSION STRATA)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: GOBERNANZA ESTRUCTURAL E IDEMPOTENCIA TOTAL
 *
 * VISION HIPER-HOLÍSTICA:
 * 1. ADMISSION ENTITIES: Claves API, planes, suscripciones y catálogo.
 * 2. FINANCIAL LEDGER: Billeteras con ledger append-only firmado.
 * 3. USAGE PIPELINE: Eventos únicos por request_id, agregados diarios
 *    y cola durable con dead-letter.
 * 4. PERFORMANCE: Índices de aceleración para el despacho masivo.
 * =================================================================
 */

use anyhow::{Context, Result};
use libsql::Connection;
use tracing::{debug, info};

/**
 * ESTRATO 1: SOLIDIFICACIÓN (Génesis de Tablas)
 * Define las entidades base del gateway de admisión y facturación.
 */
const GATEWAY_TABLES: &[(&str, &str)] = &[
    ("TABLE_API_KEYS", r#"
        CREATE TABLE IF NOT EXISTS api_keys (
            id TEXT PRIMARY KEY,
            key_kind TEXT NOT NULL CHECK (key_kind IN ('user', 'project')),
            user_id TEXT,
            project_id TEXT,
            hashed_secret TEXT NOT NULL UNIQUE,
            key_prefix TEXT NOT NULL,
            scopes TEXT NOT NULL DEFAULT '[]',
            allowed_models TEXT NOT NULL DEFAULT '[]',
            allowed_ips TEXT NOT NULL DEFAULT '[]',
            is_active INTEGER NOT NULL DEFAULT 1,
            expires_at DATETIME,
            revoked_at DATETIME,
            last_used_at DATETIME,
            last_used_ip TEXT,
            usage_count INTEGER NOT NULL DEFAULT 0,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        );
    "#),
    ("TABLE_PROJECTS", r#"
        CREATE TABLE IF NOT EXISTS projects (
            id TEXT PRIMARY KEY,
            org_id TEXT NOT NULL,
            name TEXT,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        );
    "#),
    ("TABLE_PLANS", r#"
        CREATE TABLE IF NOT EXISTS plans (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            requests_per_minute INTEGER NOT NULL,
            requests_per_hour INTEGER NOT NULL,
            requests_per_day INTEGER NOT NULL,
            daily_allowance INTEGER NOT NULL,
            max_concurrent_requests INTEGER NOT NULL,
            max_input_tokens INTEGER NOT NULL,
            max_output_tokens INTEGER NOT NULL,
            max_body_bytes INTEGER NOT NULL,
            has_streaming INTEGER NOT NULL DEFAULT 1,
            has_priority INTEGER NOT NULL DEFAULT 0,
            has_wallet_access INTEGER NOT NULL DEFAULT 0,
            allowed_models TEXT NOT NULL DEFAULT '[]'
        );
    "#),
    ("TABLE_SUBSCRIPTIONS", r#"
        CREATE TABLE IF NOT EXISTS subscriptions (
            id TEXT PRIMARY KEY,
            owner_type TEXT NOT NULL CHECK (owner_type IN ('user', 'org')),
            owner_id TEXT NOT NULL,
            plan_id TEXT NOT NULL,
            status TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
            UNIQUE(owner_type, owner_id)
        );
    "#),
    ("TABLE_WALLETS", r#"
        CREATE TABLE IF NOT EXISTS wallets (
            owner_type TEXT NOT NULL CHECK (owner_type IN ('user', 'org')),
            owner_id TEXT NOT NULL,
            balance_cents INTEGER NOT NULL DEFAULT 0,
            is_locked INTEGER NOT NULL DEFAULT 0,
            lock_reason TEXT,
            locked_at DATETIME,
            total_topup_cents INTEGER NOT NULL DEFAULT 0,
            total_spent_cents INTEGER NOT NULL DEFAULT 0,
            last_reconciled_at DATETIME,
            PRIMARY KEY (owner_type, owner_id)
        );
    "#),
    ("TABLE_WALLET_LEDGER", r#"
        CREATE TABLE IF NOT EXISTS wallet_ledger (
            id TEXT PRIMARY KEY,
            owner_type TEXT NOT NULL,
            owner_id TEXT NOT NULL,
            tx_type TEXT NOT NULL CHECK (tx_type IN
                ('CHARGE', 'TOPUP', 'REFUND', 'ADMIN_ADJUSTMENT', 'CHARGEBACK')),
            amount_cents INTEGER NOT NULL,
            balance_after_cents INTEGER NOT NULL,
            request_id TEXT,
            description TEXT NOT NULL DEFAULT '',
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        );
    "#),
    ("TABLE_MODELS", r#"
        CREATE TABLE IF NOT EXISTS models (
            model_id TEXT PRIMARY KEY,
            upstream_model_id TEXT NOT NULL,
            provider_name TEXT NOT NULL,
            supports_streaming INTEGER NOT NULL DEFAULT 1,
            supports_vision INTEGER NOT NULL DEFAULT 0,
            supports_tools INTEGER NOT NULL DEFAULT 0,
            supports_function_call INTEGER NOT NULL DEFAULT 0,
            supports_json_mode INTEGER NOT NULL DEFAULT 0,
            context_window_tokens INTEGER NOT NULL DEFAULT 0,
            max_output_tokens INTEGER NOT NULL DEFAULT 0,
            is_active INTEGER NOT NULL DEFAULT 1,
            is_deprecated INTEGER NOT NULL DEFAULT 0
        );
    "#),
    ("TABLE_PRICING", r#"
        CREATE TABLE IF NOT EXISTS pricing (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            model_id TEXT NOT NULL,
            input_price_cents_per_million INTEGER NOT NULL,
            output_price_cents_per_million INTEGER NOT NULL,
            effective_from DATETIME NOT NULL,
            effective_to DATETIME
        );
    "#),
    ("TABLE_REQUEST_EVENTS", r#"
        CREATE TABLE IF NOT EXISTS request_events (
            request_id TEXT PRIMARY KEY,
            owner_type TEXT NOT NULL,
            owner_id TEXT NOT NULL,
            api_key_id TEXT NOT NULL,
            model_id TEXT NOT NULL,
            provider_name TEXT NOT NULL,
            endpoint TEXT NOT NULL,
            status TEXT NOT NULL,
            status_code INTEGER NOT NULL,
            duration_ms INTEGER NOT NULL,
            ttfb_ms INTEGER,
            output_bytes INTEGER NOT NULL DEFAULT 0,
            prompt_tokens INTEGER NOT NULL DEFAULT 0,
            completion_tokens INTEGER NOT NULL DEFAULT 0,
            billing_source TEXT NOT NULL DEFAULT 'none',
            cost_cents INTEGER NOT NULL DEFAULT 0,
            is_streaming INTEGER NOT NULL DEFAULT 0,
            chunk_count INTEGER NOT NULL DEFAULT 0,
            client_ip TEXT NOT NULL DEFAULT '',
            user_agent TEXT NOT NULL DEFAULT '',
            created_at DATETIME NOT NULL
        );
    "#),
    ("TABLE_USAGE_DAILY", r#"
        CREATE TABLE IF NOT EXISTS usage_daily (
            owner_type TEXT NOT NULL,
            owner_id TEXT NOT NULL,
            usage_date TEXT NOT NULL,
            request_count INTEGER NOT NULL DEFAULT 0,
            success_count INTEGER NOT NULL DEFAULT 0,
            error_count INTEGER NOT NULL DEFAULT 0,
            input_tokens INTEGER NOT NULL DEFAULT 0,
            output_tokens INTEGER NOT NULL DEFAULT 0,
            cost_cents INTEGER NOT NULL DEFAULT 0,
            allowance_used INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (owner_type, owner_id, usage_date)
        );
    "#),
    ("TABLE_USAGE_JOBS", r#"
        CREATE TABLE IF NOT EXISTS usage_jobs (
            id TEXT PRIMARY KEY,
            payload_json TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending'
                CHECK (status IN ('pending', 'processing', 'done', 'dead')),
            attempts INTEGER NOT NULL DEFAULT 0,
            last_error TEXT,
            next_attempt_at DATETIME,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
            dead_lettered_at DATETIME
        );
    "#),
];

/**
 * ESTRATO 2: ACELERACIÓN (Índices de Despacho)
 */
const ACCELERATION_INDEXES: &[(&str, &str)] = &[
    ("IDX_LEDGER_OWNER", r#"
        CREATE INDEX IF NOT EXISTS idx_wallet_ledger_owner
        ON wallet_ledger (owner_type, owner_id, created_at);
    "#),
    ("IDX_LEDGER_REQUEST", r#"
        CREATE INDEX IF NOT EXISTS idx_wallet_ledger_request
        ON wallet_ledger (request_id, tx_type);
    "#),
    ("IDX_EVENTS_OWNER_DATE", r#"
        CREATE INDEX IF NOT EXISTS idx_request_events_owner
        ON request_events (owner_type, owner_id, created_at);
    "#),
    ("IDX_USAGE_JOBS_DISPATCH", r#"
        CREATE INDEX IF NOT EXISTS idx_usage_jobs_dispatch
        ON usage_jobs (status, next_attempt_at);
    "#),
    ("IDX_PRICING_WINDOW", r#"
        CREATE INDEX IF NOT EXISTS idx_pricing_window
        ON pricing (model_id, effective_from);
    "#),
];

/**
 * Sincronización estructural completa del Ledger Durable.
 * Idempotente: ejecutable en cada ignición sin efectos colaterales.
 */
pub async fn apply_gateway_schema(database_connection: &Connection) -> Result<()> {
    info!("🏗️ [SCHEMA_ENGINE]: Initiating structural synchronization V4.2...");

    solidify_base_strata(database_connection).await?;
    harden_access_layer(database_connection).await?;

    info!("✅ [SCHEMA_ENGINE]: Durable Ledger V4.2 level and certified.");
    Ok(())
}

async fn solidify_base_strata(db: &Connection) -> Result<()> {
    for (identifier, sql) in GATEWAY_TABLES {
        debug!("🏗️ [SCHEMA_ENGINE]: Solidifying {}...", identifier);
        db.execute(*sql, ())
            .await
            .with_context(|| format!("GENESIS_FAULT at {}", identifier))?;
    }
    Ok(())
}

async fn harden_access_layer(db: &Connection) -> Result<()> {
    for (identifier, sql) in ACCELERATION_INDEXES {
        debug!("🏗️ [SCHEMA_ENGINE]: Hardening {}...", identifier);
        db.execute(*sql, ())
            .await
            .with_context(|| format!("INDEX_FAULT at {}", identifier))?;
    }
    Ok(())
}
