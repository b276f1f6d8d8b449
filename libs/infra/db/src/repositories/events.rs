// [libs/infra/db/src/repositories/events.rs]
/*!
 * =================================================================
 * APARATO: REQUEST EVENT REPOSITORY (V4.2 - GATEWAY MASTER)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: PERSISTENCIA DEDUPLICADA DE EVENTOS TERMINALES
 *
 * # Mathematical Proof (At-Least-Once Safety):
 * request_id es PRIMARY KEY; INSERT OR IGNORE convierte la re-entrega
 * de un lote en un no-op por fila. La tubería de uso puede reintentar
 * sin duplicar jamás un evento.
 * =================================================================
 */

use crate::errors::DbError;
use crate::TursoClient;
use libsql::{params, Transaction};
use omniway_domain_models::events::RequestEvent;
use tracing::instrument;

pub struct RequestEventRepository {
    database_client: TursoClient,
}

const INSERT_EVENT_SQL: &str = "
    INSERT OR IGNORE INTO request_events (
        request_id, owner_type, owner_id, api_key_id, model_id, provider_name,
        endpoint, status, status_code, duration_ms, ttfb_ms, output_bytes,
        prompt_tokens, completion_tokens, billing_source, cost_cents,
        is_streaming, chunk_count, client_ip, user_agent, created_at
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14,
              ?15, ?16, ?17, ?18, ?19, ?20, ?21)
";

/// Inserta un evento dentro de una transacción abierta.
/// Retorna true si la fila es nueva (no duplicada).
pub(crate) async fn insert_event_in_transaction(
    open_transaction: &Transaction,
    event: &RequestEvent,
) -> Result<bool, DbError> {
    let affected_rows = open_transaction
        .execute(
            INSERT_EVENT_SQL,
            params![
                event.request_identifier.clone(),
                event.owner.variant_label(),
                event.owner.identifier(),
                event.api_key_identifier.clone(),
                event.model_identifier.clone(),
                event.provider_name.clone(),
                event.endpoint.clone(),
                event.status.as_label(),
                event.status_code as i64,
                event.duration_milliseconds,
                event.time_to_first_byte_milliseconds,
                event.output_bytes,
                event.prompt_tokens,
                event.completion_tokens,
                event.billing_source.as_label(),
                event.cost_cents,
                event.is_streaming as i64,
                event.chunk_count,
                event.client_ip.clone(),
                event.user_agent.clone(),
                event.created_at.to_rfc3339(),
            ],
        )
        .await?;
    Ok(affected_rows == 1)
}

impl RequestEventRepository {
    pub fn new(client: TursoClient) -> Self {
        Self { database_client: client }
    }

    /// Inserta un evento fuera de lote. Retorna true si la fila es nueva.
    #[instrument(skip(self, event), fields(request = %event.request_identifier))]
    pub async fn insert_event(&self, event: &RequestEvent) -> Result<bool, DbError> {
        let database_connection = self.database_client.get_connection()?;
        let event_transaction = database_connection
            .transaction()
            .await
            .map_err(|_| DbError::TransactionError)?;

        let inserted = insert_event_in_transaction(&event_transaction, event).await?;
        event_transaction.commit().await.map_err(|_| DbError::TransactionError)?;
        Ok(inserted)
    }

    /// Existencia de un evento por request_id.
    pub async fn event_exists(&self, request_identifier: &str) -> Result<bool, DbError> {
        let database_connection = self.database_client.get_connection()?;

        let mut query_results = database_connection
            .query(
                "SELECT 1 FROM request_events WHERE request_id = ?1",
                params![request_identifier],
            )
            .await?;

        Ok(query_results.next().await?.is_some())
    }

    /// Conteo total de eventos de un principal (Proving Grounds).
    pub async fn count_events_for_owner(
        &self,
        owner_type: &str,
        owner_identifier: &str,
    ) -> Result<i64, DbError> {
        let database_connection = self.database_client.get_connection()?;

        let mut query_results = database_connection
            .query(
                "SELECT COUNT(*) FROM request_events WHERE owner_type = ?1 AND owner_id = ?2",
                params![owner_type, owner_identifier],
            )
            .await?;

        match query_results.next().await? {
            Some(data_row) => Ok(data_row.get::<i64>(0)?),
            None => Ok(0),
        }
    }
}
