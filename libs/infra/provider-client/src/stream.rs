// [libs/infra/provider-client/src/stream.rs]
/*!
 * =================================================================
 * APARATO: SSE STREAM RELAY (V4.3 - GATEWAY MASTER)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: RELEVO BYTE-A-BYTE CON MÉTRICAS Y ESTATUS TERMINAL
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. TERMINAL DETERMINISM: Cada stream concluye en exactamente uno de
 *    {COMPLETED, CLIENT_ABORT, UPSTREAM_ERROR, TIMEOUT, ERROR}; la
 *    elegibilidad de reembolso (TTFB nulo) deriva de este veredicto.
 * 2. BACKPRESSURE NATIVE: El canal mpsc acotado propaga la presión del
 *    cliente lento hacia la lectura upstream sin buffering ilimitado.
 *
 * # Mathematical Proof (Refund Eligibility):
 * ttfb es Some sii al menos un byte upstream llegó. Un veredicto
 * TIMEOUT/UPSTREAM_ERROR/ERROR con ttfb None implica que el cliente
 * no recibió valor alguno: condición exacta del reembolso TTFB-0.
 * =================================================================
 */

use crate::sse::SseAccumulator;
use bytes::Bytes;
use omniway_domain_models::openai::ChatUsage;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, instrument, warn};

/// Veredicto terminal de un relevo SSE.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamTerminal {
    Completed,
    ClientAbort,
    UpstreamError,
    Timeout,
    Error,
}

impl StreamTerminal {
    pub fn as_label(&self) -> &'static str {
        match self {
            StreamTerminal::Completed => "COMPLETED",
            StreamTerminal::ClientAbort => "CLIENT_ABORT",
            StreamTerminal::UpstreamError => "UPSTREAM_ERROR",
            StreamTerminal::Timeout => "TIMEOUT",
            StreamTerminal::Error => "ERROR",
        }
    }
}

/// Métricas y veredicto recolectados durante el relevo.
#[derive(Debug)]
pub struct StreamOutcome {
    pub terminal: StreamTerminal,
    /// Milisegundos hasta el primer byte upstream; None = nunca llegó.
    pub ttfb_milliseconds: Option<i64>,
    /// Payloads SSE parseados con éxito.
    pub chunk_count: i64,
    /// Bytes totales reenviados al cliente.
    pub output_bytes: i64,
    /// Bloque de uso del chunk final, si el proveedor lo incluye.
    pub usage: Option<ChatUsage>,
    /// Estatus HTTP upstream observado.
    pub upstream_status: Option<u16>,
}

impl StreamOutcome {
    /// Condición de reembolso TTFB-0: ningún byte y veredicto fallido.
    pub fn is_refund_eligible(&self) -> bool {
        self.ttfb_milliseconds.is_none()
            && !matches!(
                self.terminal,
                StreamTerminal::Completed | StreamTerminal::ClientAbort
            )
    }
}

/**
 * Bombea el cuerpo upstream hacia el cliente hasta el veredicto terminal.
 *
 * # Logic:
 * - Deadline duro de duración total del stream (select contra la lectura).
 * - Primer byte sella el TTFB; cada chunk alimenta el acumulador SSE y
 *   se reenvía intacto.
 * - Receptor caído = CLIENT_ABORT (la lectura upstream se cancela al
 *   soltar la respuesta).
 * - Error de lectura upstream = UPSTREAM_ERROR.
 */
#[instrument(skip(upstream_response, client_byte_sender), fields(deadline_s = max_duration.as_secs()))]
pub async fn relay_sse_stream(
    mut upstream_response: reqwest::Response,
    client_byte_sender: mpsc::Sender<Bytes>,
    max_duration: Duration,
) -> StreamOutcome {
    let dispatch_instant = Instant::now();
    let hard_deadline = tokio::time::sleep(max_duration);
    tokio::pin!(hard_deadline);

    let upstream_status = Some(upstream_response.status().as_u16());
    let mut accumulator = SseAccumulator::new();
    let mut ttfb_milliseconds: Option<i64> = None;
    let mut output_bytes: i64 = 0;

    let terminal = loop {
        tokio::select! {
            _ = &mut hard_deadline => {
                warn!("⏱️ [STREAM_RELAY]: Hard duration deadline fired. Aborting upstream read.");
                break StreamTerminal::Timeout;
            }
            chunk_read = upstream_response.chunk() => match chunk_read {
                Ok(Some(chunk)) => {
                    if ttfb_milliseconds.is_none() {
                        ttfb_milliseconds =
                            Some(dispatch_instant.elapsed().as_millis() as i64);
                    }
                    output_bytes += chunk.len() as i64;
                    accumulator.ingest(&chunk);

                    if client_byte_sender.send(chunk).await.is_err() {
                        debug!("🔌 [STREAM_RELAY]: Client receiver dropped. Cancelling upstream.");
                        break StreamTerminal::ClientAbort;
                    }
                }
                Ok(None) => {
                    if !accumulator.saw_completion {
                        warn!("🧩 [STREAM_RELAY]: Upstream closed without completion marker.");
                    }
                    break StreamTerminal::Completed;
                }
                Err(read_fault) => {
                    warn!("❌ [STREAM_RELAY]: Upstream read collapsed mid-flight: {}", read_fault);
                    break StreamTerminal::UpstreamError;
                }
            }
        }
    };

    StreamOutcome {
        terminal,
        ttfb_milliseconds,
        chunk_count: accumulator.chunk_count,
        output_bytes,
        usage: accumulator.usage,
        upstream_status,
    }
}
