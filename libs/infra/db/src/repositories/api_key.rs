// [libs/infra/db/src/repositories/api_key.rs]
/*!
 * =================================================================
 * APARATO: API KEY TACTICAL REPOSITORY (V4.1 - GATEWAY MASTER)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: RESOLUCIÓN DE CREDENCIALES POR HUELLA SHA-256
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. DIGEST-ONLY LOOKUP: La búsqueda pivota exclusivamente sobre la
 *    huella; el secreto en claro jamás toca este estrato.
 * 2. FIRE-AND-FORGET STAMPING: El sellado de uso es best-effort y
 *    nunca bloquea el pipeline de admisión.
 * =================================================================
 */

use crate::errors::DbError;
use crate::repositories::parse_stored_timestamp;
use crate::TursoClient;
use chrono::{DateTime, Utc};
use libsql::{params, Row};
use omniway_domain_models::auth::{ApiKeyKind, ApiKeyRecord};
use tracing::{debug, instrument, warn};

pub struct ApiKeyRepository {
    database_client: TursoClient,
}

const API_KEY_COLUMNS: &str = "
    id, key_kind, user_id, project_id, hashed_secret, key_prefix,
    scopes, allowed_models, allowed_ips, is_active, expires_at, revoked_at
";

impl ApiKeyRepository {
    pub fn new(client: TursoClient) -> Self {
        Self { database_client: client }
    }

    /**
     * Localiza una clave API por su huella SHA-256 hexadecimal.
     * Retorna None ante huella desconocida (el fallo no se cachea).
     */
    #[instrument(skip(self, hashed_secret))]
    pub async fn find_by_hashed_secret(
        &self,
        hashed_secret: &str,
    ) -> Result<Option<ApiKeyRecord>, DbError> {
        let database_connection = self.database_client.get_connection()?;

        let mut query_results = database_connection
            .query(
                &format!("SELECT {} FROM api_keys WHERE hashed_secret = ?1", API_KEY_COLUMNS),
                params![hashed_secret],
            )
            .await?;

        match query_results.next().await? {
            Some(data_row) => Ok(Some(map_row_to_api_key(&data_row)?)),
            None => Ok(None),
        }
    }

    /// Resuelve la organización matriz de un proyecto (clave de proyecto).
    pub async fn resolve_project_org(&self, project_identifier: &str) -> Result<Option<String>, DbError> {
        let database_connection = self.database_client.get_connection()?;

        let mut query_results = database_connection
            .query("SELECT org_id FROM projects WHERE id = ?1", params![project_identifier])
            .await?;

        match query_results.next().await? {
            Some(data_row) => Ok(Some(data_row.get::<String>(0)?)),
            None => Ok(None),
        }
    }

    /**
     * Sellado de uso best-effort: última actividad, IP y contador.
     * Las fallas se degradan a warning; jamás interrumpen la admisión.
     */
    #[instrument(skip(self))]
    pub async fn stamp_key_usage(&self, api_key_identifier: &str, client_ip: &str) {
        let stamp_result: Result<(), DbError> = async {
            let database_connection = self.database_client.get_connection()?;
            database_connection
                .execute(
                    "UPDATE api_keys
                     SET last_used_at = ?2, last_used_ip = ?3, usage_count = usage_count + 1
                     WHERE id = ?1",
                    params![api_key_identifier, Utc::now().to_rfc3339(), client_ip],
                )
                .await?;
            Ok(())
        }
        .await;

        match stamp_result {
            Ok(()) => debug!("🔑 [KEY_STAMP]: Usage sealed for key {}.", api_key_identifier),
            Err(stamp_fault) => {
                warn!("⚠️ [KEY_STAMP_FAULT]: Usage stamping degraded: {}", stamp_fault)
            }
        }
    }

    /// Cristaliza una clave API (aprovisionamiento y Proving Grounds).
    pub async fn register_key(&self, record: &ApiKeyRecord) -> Result<(), DbError> {
        let database_connection = self.database_client.get_connection()?;

        database_connection
            .execute(
                "INSERT INTO api_keys (
                    id, key_kind, user_id, project_id, hashed_secret, key_prefix,
                    scopes, allowed_models, allowed_ips, is_active, expires_at, revoked_at
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                params![
                    record.api_key_identifier.clone(),
                    kind_label(record.key_kind),
                    record.user_identifier.clone(),
                    record.project_identifier.clone(),
                    record.hashed_secret.clone(),
                    record.key_prefix.clone(),
                    serde_json::to_string(&record.scopes).unwrap_or_else(|_| "[]".into()),
                    serde_json::to_string(&record.allowed_models).unwrap_or_else(|_| "[]".into()),
                    serde_json::to_string(&record.allowed_ips).unwrap_or_else(|_| "[]".into()),
                    record.is_active as i64,
                    record.expires_at.map(|ts| ts.to_rfc3339()),
                    record.revoked_at.map(|ts| ts.to_rfc3339()),
                ],
            )
            .await?;

        Ok(())
    }

    /// Vincula un proyecto con su organización matriz.
    pub async fn register_project(&self, project_identifier: &str, org_identifier: &str) -> Result<(), DbError> {
        let database_connection = self.database_client.get_connection()?;
        database_connection
            .execute(
                "INSERT OR REPLACE INTO projects (id, org_id) VALUES (?1, ?2)",
                params![project_identifier, org_identifier],
            )
            .await?;
        Ok(())
    }
}

fn kind_label(kind: ApiKeyKind) -> &'static str {
    match kind {
        ApiKeyKind::User => "user",
        ApiKeyKind::Project => "project",
    }
}

fn map_row_to_api_key(data_row: &Row) -> Result<ApiKeyRecord, DbError> {
    let kind_raw = data_row.get::<String>(1)?;
    let key_kind = match kind_raw.as_str() {
        "user" => ApiKeyKind::User,
        "project" => ApiKeyKind::Project,
        other => {
            return Err(DbError::MappingError(format!("unknown key_kind '{}'", other)));
        }
    };

    let parse_string_set = |raw_json: String| -> Vec<String> {
        serde_json::from_str::<Vec<String>>(&raw_json).unwrap_or_default()
    };

    Ok(ApiKeyRecord {
        api_key_identifier: data_row.get::<String>(0)?,
        key_kind,
        user_identifier: data_row.get::<Option<String>>(2)?,
        project_identifier: data_row.get::<Option<String>>(3)?,
        hashed_secret: data_row.get::<String>(4)?,
        key_prefix: data_row.get::<String>(5)?,
        scopes: parse_string_set(data_row.get::<String>(6)?),
        allowed_models: parse_string_set(data_row.get::<String>(7)?),
        allowed_ips: parse_string_set(data_row.get::<String>(8)?),
        is_active: data_row.get::<i64>(9)? != 0,
        expires_at: parse_timestamp_column(data_row, 10)?,
        revoked_at: parse_timestamp_column(data_row, 11)?,
    })
}

fn parse_timestamp_column(data_row: &Row, index: i32) -> Result<Option<DateTime<Utc>>, DbError> {
    Ok(parse_stored_timestamp(data_row.get::<Option<String>>(index)?))
}
