// [libs/infra/db/src/repositories/pricing.rs]
/*!
 * =================================================================
 * APARATO: PRICING WINDOW REPOSITORY (V4.0 - GATEWAY MASTER)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: FRANJAS DE PRECIO ACOTADAS EN EL TIEMPO
 *
 * # Mathematical Proof (Effective Window Selection):
 * La fila vigente satisface effective_from <= now < effective_to
 * (o effective_to nulo = franja abierta). Ante solapamiento, gana la
 * franja de inicio más reciente: ORDER BY effective_from DESC LIMIT 1.
 * =================================================================
 */

use crate::errors::DbError;
use crate::repositories::parse_stored_timestamp;
use crate::TursoClient;
use chrono::{DateTime, Utc};
use libsql::params;
use omniway_domain_models::catalog::PricingRecord;
use tracing::instrument;

pub struct PricingRepository {
    database_client: TursoClient,
}

impl PricingRepository {
    pub fn new(client: TursoClient) -> Self {
        Self { database_client: client }
    }

    /// Localiza la franja de precio vigente de un modelo en `now`.
    #[instrument(skip(self))]
    pub async fn find_effective_price(
        &self,
        model_identifier: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<PricingRecord>, DbError> {
        let database_connection = self.database_client.get_connection()?;
        let now_stamp = now.to_rfc3339();

        let mut query_results = database_connection
            .query(
                "SELECT model_id, input_price_cents_per_million,
                        output_price_cents_per_million, effective_from, effective_to
                 FROM pricing
                 WHERE model_id = ?1
                   AND effective_from <= ?2
                   AND (effective_to IS NULL OR effective_to > ?2)
                 ORDER BY effective_from DESC
                 LIMIT 1",
                params![model_identifier, now_stamp],
            )
            .await?;

        let data_row = match query_results.next().await? {
            Some(row) => row,
            None => return Ok(None),
        };

        let effective_from = parse_stored_timestamp(Some(data_row.get::<String>(3)?))
            .ok_or_else(|| DbError::MappingError("unparseable effective_from".into()))?;

        Ok(Some(PricingRecord {
            model_identifier: data_row.get::<String>(0)?,
            input_price_cents_per_million: data_row.get::<i64>(1)?,
            output_price_cents_per_million: data_row.get::<i64>(2)?,
            effective_from,
            effective_to: parse_stored_timestamp(data_row.get::<Option<String>>(4)?),
        }))
    }

    /// Cristaliza una franja de precio (aprovisionamiento y Proving Grounds).
    pub async fn register_price(&self, record: &PricingRecord) -> Result<(), DbError> {
        let database_connection = self.database_client.get_connection()?;

        database_connection
            .execute(
                "INSERT INTO pricing (
                    model_id, input_price_cents_per_million,
                    output_price_cents_per_million, effective_from, effective_to
                 ) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    record.model_identifier.clone(),
                    record.input_price_cents_per_million,
                    record.output_price_cents_per_million,
                    record.effective_from.to_rfc3339(),
                    record.effective_to.map(|ts| ts.to_rfc3339()),
                ],
            )
            .await?;

        Ok(())
    }
}
