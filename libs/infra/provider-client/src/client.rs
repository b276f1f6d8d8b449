// [libs/infra/provider-client/src/client.rs]
/*!
 * =================================================================
 * APARATO: PROVIDER UPLINK CLIENT (V4.2 - GATEWAY MASTER)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: DESPACHO HTTP UNARIO Y APERTURA DE STREAMS SSE
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. DEADLINE SOVEREIGNTY: El intercambio unario completo (headers +
 *    cuerpo) vive bajo el read_timeout del proveedor; el stream solo
 *    paga el connect_timeout aquí y su deadline total en el relevo.
 * 2. REJECTION PASSTHROUGH: Los cuerpos de error upstream se parsean
 *    con la forma {error:{message,type,code}} y conservan su detalle.
 * =================================================================
 */

use crate::config::ProviderConfig;
use crate::errors::ProviderError;
use omniway_domain_models::openai::ChatUsage;
use reqwest::header::ACCEPT;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Resultado de un intercambio unario 2xx con el proveedor.
#[derive(Debug)]
pub struct UnaryExchange {
    /// Cuerpo JSON completo del proveedor (passthrough al cliente).
    pub body: Value,
    /// Bloque de uso extraído del cuerpo.
    pub usage: ChatUsage,
    /// Estatus HTTP upstream (2xx).
    pub upstream_status: u16,
    /// Longitud del cuerpo crudo en bytes (métrica de salida).
    pub body_length_bytes: usize,
}

/// Cliente endurecido hacia un proveedor upstream concreto.
pub struct ProviderClient {
    http_client: reqwest::Client,
    provider_config: ProviderConfig,
}

impl ProviderClient {
    pub fn new(provider_config: ProviderConfig) -> Result<Self, ProviderError> {
        let http_client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(provider_config.connect_timeout_seconds))
            .tcp_keepalive(Some(Duration::from_secs(60)))
            .user_agent("Omniway-Gateway-Uplink/4.2")
            .build()?;

        Ok(Self { http_client, provider_config })
    }

    pub fn provider_name(&self) -> &str {
        &self.provider_config.provider_name
    }

    pub fn stream_max_duration(&self) -> Duration {
        Duration::from_secs(self.provider_config.stream_max_duration_seconds)
    }

    fn completions_endpoint(&self) -> String {
        format!("{}/v1/chat/completions", self.provider_config.base_url)
    }

    /**
     * Despacho unario: POST del cuerpo reescrito, bajo read_timeout.
     * Un no-2xx se eleva como rechazo con el detalle del proveedor.
     */
    #[instrument(skip(self, request_body), fields(provider = %self.provider_config.provider_name))]
    pub async fn execute_unary(
        &self,
        request_body: &Value,
        request_identifier: &str,
    ) -> Result<UnaryExchange, ProviderError> {
        let read_timeout_seconds = self.provider_config.read_timeout_seconds;

        let exchange_result = tokio::time::timeout(
            Duration::from_secs(read_timeout_seconds),
            async {
                let network_response = self
                    .http_client
                    .post(self.completions_endpoint())
                    .bearer_auth(&self.provider_config.api_key)
                    .header("X-Request-ID", request_identifier)
                    .json(request_body)
                    .send()
                    .await?;

                let upstream_status = network_response.status().as_u16();
                let raw_body = network_response.text().await?;
                Ok::<(u16, String), ProviderError>((upstream_status, raw_body))
            },
        )
        .await
        .map_err(|_| ProviderError::ReadTimeout(read_timeout_seconds))?;

        let (upstream_status, raw_body) = exchange_result?;

        if !(200..300).contains(&upstream_status) {
            return Err(parse_upstream_rejection(upstream_status, &raw_body));
        }

        let body: Value = serde_json::from_str(&raw_body)
            .map_err(|decode_fault| ProviderError::DecodeError(decode_fault.to_string()))?;

        let usage = body
            .get("usage")
            .cloned()
            .and_then(|usage_block| serde_json::from_value::<ChatUsage>(usage_block).ok())
            .unwrap_or_default();

        debug!("✅ [UPLINK]: Unary exchange sealed with HTTP {}.", upstream_status);
        Ok(UnaryExchange { body, usage, upstream_status, body_length_bytes: raw_body.len() })
    }

    /**
     * Apertura de stream SSE: retorna la respuesta upstream lista para
     * el relevo. Un no-2xx antes del primer byte se eleva como rechazo.
     */
    #[instrument(skip(self, request_body), fields(provider = %self.provider_config.provider_name))]
    pub async fn open_stream(
        &self,
        request_body: &Value,
        request_identifier: &str,
    ) -> Result<reqwest::Response, ProviderError> {
        let network_response = self
            .http_client
            .post(self.completions_endpoint())
            .bearer_auth(&self.provider_config.api_key)
            .header("X-Request-ID", request_identifier)
            .header(ACCEPT, "text/event-stream")
            .json(request_body)
            .send()
            .await?;

        let upstream_status = network_response.status().as_u16();
        if !(200..300).contains(&upstream_status) {
            let raw_body = network_response.text().await.unwrap_or_default();
            warn!("🚫 [UPLINK]: Stream rejected pre-byte with HTTP {}.", upstream_status);
            return Err(parse_upstream_rejection(upstream_status, &raw_body));
        }

        Ok(network_response)
    }
}

/// Parsea el cuerpo de rechazo del proveedor conservando su detalle.
fn parse_upstream_rejection(upstream_status: u16, raw_body: &str) -> ProviderError {
    let parsed_detail = serde_json::from_str::<Value>(raw_body).ok();

    let extract_field = |field_name: &str| -> Option<String> {
        parsed_detail
            .as_ref()?
            .get("error")?
            .get(field_name)?
            .as_str()
            .map(str::to_string)
    };

    ProviderError::UpstreamRejection {
        status: upstream_status,
        message: extract_field("message")
            .unwrap_or_else(|| format!("upstream provider returned HTTP {}", upstream_status)),
        error_type: extract_field("type"),
        error_code: extract_field("code"),
    }
}
