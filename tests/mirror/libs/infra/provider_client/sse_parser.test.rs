// [tests/mirror/libs/infra/provider_client/sse_parser.test.rs]
/**
 * =================================================================
 * APARATO: SSE PARSER TEST (V4.0)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L3-MIRROR
 * RESPONSABILIDAD: CERTIFICACIÓN DE FRAMING PARCIAL Y MÉTRICAS SSE
 * =================================================================
 */

use omniway_infra_provider::sse::SseAccumulator;

#[test]
fn certify_chunk_invariance_under_fragmentation() {
    println!("\n🧩 [PROVING_GROUNDS]: Auditing SSE partial-line strata...");

    let full_frame = "data: {\"id\":\"c1\",\"choices\":[{\"delta\":{\"content\":\"ho\"},\"finish_reason\":null}]}\n\ndata: {\"id\":\"c2\",\"choices\":[{\"delta\":{\"content\":\"la\"},\"finish_reason\":\"stop\"}],\"usage\":{\"prompt_tokens\":3,\"completion_tokens\":2,\"total_tokens\":5}}\n\ndata: [DONE]\n\n";

    // 1. INGESTA ÍNTEGRA: referencia de verdad.
    let mut whole_accumulator = SseAccumulator::new();
    whole_accumulator.ingest(full_frame.as_bytes());

    assert_eq!(whole_accumulator.chunk_count, 2);
    assert!(whole_accumulator.saw_completion);
    let captured_usage = whole_accumulator.usage.expect("usage block lost");
    assert_eq!(captured_usage.prompt_tokens, 3);
    assert_eq!(captured_usage.total_tokens, 5);

    // 2. INGESTA FRAGMENTADA: cortes arbitrarios de 7 bytes.
    let mut fragmented_accumulator = SseAccumulator::new();
    for fragment in full_frame.as_bytes().chunks(7) {
        fragmented_accumulator.ingest(fragment);
    }

    assert_eq!(fragmented_accumulator.chunk_count, whole_accumulator.chunk_count,
        "FRAGMENT_FAULT: Parsing depends on transport chunking.");
    assert_eq!(fragmented_accumulator.saw_completion, whole_accumulator.saw_completion);
    assert_eq!(
        fragmented_accumulator.usage.map(|usage| usage.total_tokens),
        Some(5)
    );

    println!("   ✅ [SUCCESS]: Chunk invariance certified bit-perfect.");
}

#[test]
fn certify_comment_and_empty_line_discipline() {
    let mut accumulator = SseAccumulator::new();
    accumulator.ingest(b": keep-alive ping\n\n\n: another comment\n");

    assert_eq!(accumulator.chunk_count, 0);
    assert!(!accumulator.saw_completion);
    assert_eq!(accumulator.malformed_payloads, 0);
}

#[test]
fn certify_malformed_payload_accounting() {
    let mut accumulator = SseAccumulator::new();
    accumulator.ingest(b"data: {broken json]\n");
    accumulator.ingest(b"data: {\"choices\":[{\"finish_reason\":null}]}\n");

    // El payload roto se cuenta aparte y no infla chunk_count.
    assert_eq!(accumulator.chunk_count, 1);
    assert_eq!(accumulator.malformed_payloads, 1);
    assert!(!accumulator.saw_completion);
}

#[test]
fn certify_done_marker_without_finish_reason() {
    let mut accumulator = SseAccumulator::new();
    accumulator.ingest(b"data: {\"choices\":[{\"delta\":{},\"finish_reason\":null}]}\n");
    assert!(!accumulator.saw_completion);

    accumulator.ingest(b"data: [DONE]\n");
    assert!(accumulator.saw_completion);
}

#[test]
fn certify_crlf_tolerance() {
    let mut accumulator = SseAccumulator::new();
    accumulator.ingest(b"data: {\"choices\":[{\"finish_reason\":\"stop\"}]}\r\n\r\n");

    assert_eq!(accumulator.chunk_count, 1);
    assert!(accumulator.saw_completion);
}
