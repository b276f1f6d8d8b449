// [libs/infra/db/src/repositories/catalog.rs]
/*!
 * =================================================================
 * APARATO: MODEL CATALOG REPOSITORY (V4.0 - GATEWAY MASTER)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: CATÁLOGO DURABLE DE MODELOS LLM EXPUESTOS
 * =================================================================
 */

use crate::errors::DbError;
use crate::TursoClient;
use libsql::{params, Row};
use omniway_domain_models::catalog::ModelRecord;
use tracing::instrument;

pub struct ModelCatalogRepository {
    database_client: TursoClient,
}

const MODEL_COLUMNS: &str = "
    model_id, upstream_model_id, provider_name, supports_streaming,
    supports_vision, supports_tools, supports_function_call, supports_json_mode,
    context_window_tokens, max_output_tokens, is_active, is_deprecated
";

impl ModelCatalogRepository {
    pub fn new(client: TursoClient) -> Self {
        Self { database_client: client }
    }

    /// Localiza un modelo del catálogo por su identificador público.
    #[instrument(skip(self))]
    pub async fn find_model(&self, model_identifier: &str) -> Result<Option<ModelRecord>, DbError> {
        let database_connection = self.database_client.get_connection()?;

        let mut query_results = database_connection
            .query(
                &format!("SELECT {} FROM models WHERE model_id = ?1", MODEL_COLUMNS),
                params![model_identifier],
            )
            .await?;

        match query_results.next().await? {
            Some(data_row) => Ok(Some(map_row_to_model(&data_row)?)),
            None => Ok(None),
        }
    }

    /// Inventario de modelos activos para `GET /v1/models`.
    pub async fn list_active_models(&self) -> Result<Vec<ModelRecord>, DbError> {
        let database_connection = self.database_client.get_connection()?;

        let mut query_results = database_connection
            .query(
                &format!(
                    "SELECT {} FROM models WHERE is_active = 1 ORDER BY model_id",
                    MODEL_COLUMNS
                ),
                (),
            )
            .await?;

        let mut models_collection = Vec::new();
        while let Some(data_row) = query_results.next().await? {
            models_collection.push(map_row_to_model(&data_row)?);
        }

        Ok(models_collection)
    }

    /// Cristaliza un modelo (aprovisionamiento y Proving Grounds).
    pub async fn register_model(&self, record: &ModelRecord) -> Result<(), DbError> {
        let database_connection = self.database_client.get_connection()?;

        database_connection
            .execute(
                "INSERT OR REPLACE INTO models (
                    model_id, upstream_model_id, provider_name, supports_streaming,
                    supports_vision, supports_tools, supports_function_call,
                    supports_json_mode, context_window_tokens, max_output_tokens,
                    is_active, is_deprecated
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                params![
                    record.model_identifier.clone(),
                    record.upstream_model_identifier.clone(),
                    record.provider_name.clone(),
                    record.supports_streaming as i64,
                    record.supports_vision as i64,
                    record.supports_tools as i64,
                    record.supports_function_call as i64,
                    record.supports_json_mode as i64,
                    record.context_window_tokens,
                    record.max_output_tokens,
                    record.is_active as i64,
                    record.is_deprecated as i64,
                ],
            )
            .await?;

        Ok(())
    }
}

fn map_row_to_model(data_row: &Row) -> Result<ModelRecord, DbError> {
    Ok(ModelRecord {
        model_identifier: data_row.get::<String>(0)?,
        upstream_model_identifier: data_row.get::<String>(1)?,
        provider_name: data_row.get::<String>(2)?,
        supports_streaming: data_row.get::<i64>(3)? != 0,
        supports_vision: data_row.get::<i64>(4)? != 0,
        supports_tools: data_row.get::<i64>(5)? != 0,
        supports_function_call: data_row.get::<i64>(6)? != 0,
        supports_json_mode: data_row.get::<i64>(7)? != 0,
        context_window_tokens: data_row.get::<i64>(8)?,
        max_output_tokens: data_row.get::<i64>(9)?,
        is_active: data_row.get::<i64>(10)? != 0,
        is_deprecated: data_row.get::<i64>(11)? != 0,
    })
}
