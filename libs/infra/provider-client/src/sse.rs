// [libs/infra/provider-client/src/sse.rs]
/*!
 * =================================================================
 * APARATO: SSE FRAME ACCUMULATOR (V4.2 - GATEWAY MASTER)
 * CLASIFICACIÓN: INFRASTRUCTURE CORE (ESTRATO L3)
 * RESPONSABILIDAD: PARSEO INCREMENTAL DE TRAMAS text/event-stream
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. PARTIAL LINE DOCTRINE: Los chunks TCP cortan líneas en puntos
 *    arbitrarios; la última línea incompleta persiste en el buffer
 *    entre ingestas hasta recibir su '\n'.
 * 2. METRICS SIDE-CHANNEL: El acumulador cuenta payloads JSON válidos,
 *    captura el bloque 'usage' final y detecta la completitud sin
 *    alterar jamás los bytes reenviados.
 *
 * # Mathematical Proof (Chunk Invariance):
 * Para toda partición P de la trama en chunks, el estado final del
 * acumulador es idéntico: el buffer de línea parcial hace el parseo
 * independiente de la fragmentación del transporte.
 * =================================================================
 */

use omniway_domain_models::openai::ChatUsage;
use tracing::debug;

/// Acumulador incremental de tramas SSE.
#[derive(Debug, Default)]
pub struct SseAccumulator {
    /// Línea incompleta pendiente entre chunks.
    partial_line_buffer: String,
    /// Payloads `data: {...}` parseados con éxito.
    pub chunk_count: i64,
    /// Bloque de uso capturado del chunk final (si el proveedor lo emite).
    pub usage: Option<ChatUsage>,
    /// Completitud observada (`data: [DONE]` o finish_reason presente).
    pub saw_completion: bool,
    /// Líneas `data:` con JSON malformado (se loguean, no cuentan).
    pub malformed_payloads: i64,
}

impl SseAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /**
     * Ingesta un chunk crudo del transporte.
     *
     * # Logic:
     * Divide por '\n' conservando la última línea parcial. Por línea
     * completa: ignora vacías y comentarios ':'; `data: [DONE]` marca
     * completitud; `data: {...}` parsea JSON, incrementa chunk_count,
     * captura usage y detecta finish_reason.
     */
    pub fn ingest(&mut self, raw_chunk: &[u8]) {
        self.partial_line_buffer.push_str(&String::from_utf8_lossy(raw_chunk));

        while let Some(newline_position) = self.partial_line_buffer.find('\n') {
            let complete_line: String =
                self.partial_line_buffer.drain(..=newline_position).collect();
            self.process_line(complete_line.trim_end_matches(['\n', '\r']));
        }
    }

    fn process_line(&mut self, line: &str) {
        let trimmed_line = line.trim();

        // Líneas vacías (separadores de evento) y comentarios keep-alive.
        if trimmed_line.is_empty() || trimmed_line.starts_with(':') {
            return;
        }

        let Some(data_payload) = trimmed_line.strip_prefix("data:") else {
            return;
        };
        let data_payload = data_payload.trim_start();

        if data_payload == "[DONE]" {
            self.saw_completion = true;
            return;
        }

        match serde_json::from_str::<serde_json::Value>(data_payload) {
            Ok(parsed_payload) => {
                self.chunk_count += 1;

                if let Some(usage_block) = parsed_payload.get("usage") {
                    if !usage_block.is_null() {
                        if let Ok(parsed_usage) =
                            serde_json::from_value::<ChatUsage>(usage_block.clone())
                        {
                            self.usage = Some(parsed_usage);
                        }
                    }
                }

                let finish_reason_present = parsed_payload
                    .get("choices")
                    .and_then(|choices| choices.as_array())
                    .map(|choices| {
                        choices.iter().any(|choice| {
                            choice
                                .get("finish_reason")
                                .map(|reason| !reason.is_null())
                                .unwrap_or(false)
                        })
                    })
                    .unwrap_or(false);

                if finish_reason_present {
                    self.saw_completion = true;
                }
            }
            Err(parse_fault) => {
                self.malformed_payloads += 1;
                debug!("🧩 [SSE_PARSER]: Malformed data payload ignored: {}", parse_fault);
            }
        }
    }
}
