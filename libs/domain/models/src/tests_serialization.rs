// [libs/domain/models/src/tests_serialization.rs]
/**
 * =================================================================
 * APARATO: DOMAIN SERIALIZATION TEST (V4.0 - INTEGRATION LEVEL)
 * CLASIFICACIÓN: TRINITY EVIDENCE (ESTRATO L2-MODELS)
 * RESPONSABILIDAD: CERTIFICACIÓN DE PARIDAD JSON DE CONTRATOS DE CABLE
 *
 * # Mathematical Proof (Passthrough Fidelity):
 * El gateway solo inspecciona un subconjunto del cuerpo de chat. Los
 * campos aplanados deben sobrevivir el ciclo completo
 * Struct -> JSON -> Struct sin pérdida, o el proveedor upstream
 * recibiría una petición semánticamente distinta a la del cliente.
 * =================================================================
 */

#[cfg(test)]
mod tests {
    use omniway_domain_models::openai::{ChatCompletionRequest, ErrorDetail, ErrorEnvelope};
    use omniway_domain_models::owner::OwnerRef;
    use serde_json::json;

    /**
     * CERTIFICACIÓN: Roundtrip del cuerpo de chat con campos desconocidos.
     */
    #[test]
    fn certify_chat_request_passthrough_roundtrip() {
        println!("\n🧪 [PROVING_GROUNDS]: Validating passthrough parity in chat strata...");

        let inbound_payload = json!({
            "model": "gpt-4o",
            "stream": true,
            "max_tokens": 256,
            "temperature": 0.2,
            "top_p": 0.9,
            "messages": [
                { "role": "user", "content": "hola", "name": "ops" }
            ]
        });

        let parsed_request: ChatCompletionRequest =
            serde_json::from_value(inbound_payload).expect("CRITICAL_FAULT: Parse collapsed.");

        assert!(parsed_request.wants_streaming());
        assert_eq!(parsed_request.max_tokens, Some(256));
        assert_eq!(
            parsed_request.passthrough.get("temperature"),
            Some(&json!(0.2)),
            "DATA_MISMATCH: Unknown field lost in flight."
        );
        assert_eq!(
            parsed_request.messages[0].passthrough.get("name"),
            Some(&json!("ops")),
            "DATA_MISMATCH: Message-level passthrough lost."
        );

        // Re-serialización: los campos aplanados vuelven al nivel raíz.
        let reserialized = serde_json::to_value(&parsed_request).unwrap();
        assert_eq!(reserialized["temperature"], json!(0.2));
        assert_eq!(reserialized["messages"][0]["name"], json!("ops"));

        println!("   ✅ [SUCCESS]: Passthrough parity certified bit-perfect.");
    }

    /**
     * CERTIFICACIÓN: Estimador de tokens de entrada (ceil(len/4)).
     */
    #[test]
    fn certify_input_token_estimation() {
        let request: ChatCompletionRequest = serde_json::from_value(json!({
            "model": "gpt-3.5-turbo",
            "messages": [
                { "role": "user", "content": "abcdefgh" },
                { "role": "user", "content": "x" }
            ]
        }))
        .unwrap();

        // 9 bytes de contenido -> ceil(9/4) = 3 tokens estimados.
        assert_eq!(request.estimate_input_tokens(), 3);
    }

    /**
     * CERTIFICACIÓN: Forma canónica del cuerpo de error del gateway.
     */
    #[test]
    fn certify_error_envelope_shape() {
        let envelope = ErrorEnvelope {
            error: ErrorDetail {
                message: "Rate limit exceeded".to_string(),
                error_type: "rate_limit_error".to_string(),
                code: "rate_limit_exceeded".to_string(),
                param: Some("minute".to_string()),
            },
            request_id: "req_123".to_string(),
        };

        let wire_form = serde_json::to_value(&envelope).unwrap();
        assert_eq!(wire_form["error"]["type"], json!("rate_limit_error"));
        assert_eq!(wire_form["error"]["param"], json!("minute"));
        assert_eq!(wire_form["request_id"], json!("req_123"));

        // El param ausente desaparece del cable, no viaja como null.
        let bare_envelope = ErrorEnvelope {
            error: ErrorDetail {
                message: "Invalid API key".to_string(),
                error_type: "authentication_error".to_string(),
                code: "invalid_api_key".to_string(),
                param: None,
            },
            request_id: "req_456".to_string(),
        };
        let bare_wire = serde_json::to_value(&bare_envelope).unwrap();
        assert!(bare_wire["error"].get("param").is_none());
    }

    /**
     * CERTIFICACIÓN: El principal serializa con discriminante etiquetado.
     */
    #[test]
    fn certify_owner_tagged_serialization() {
        let principal = OwnerRef::Org("org_7".to_string());
        let wire_form = serde_json::to_value(&principal).unwrap();

        assert_eq!(wire_form["owner_type"], json!("org"));
        assert_eq!(wire_form["owner_id"], json!("org_7"));

        let rehydrated: OwnerRef = serde_json::from_value(wire_form).unwrap();
        assert_eq!(rehydrated, principal);
    }
}
