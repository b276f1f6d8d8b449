// [tests/mirror/libs/infra/provider_client/provider_registry.test.rs]
/**
 * =================================================================
 * APARATO: PROVIDER REGISTRY TEST (V4.0)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L3-MIRROR
 * RESPONSABILIDAD: CERTIFICACIÓN DE HIDRATACIÓN DESDE EL ENTORNO
 * =================================================================
 */

use omniway_infra_provider::config::{
    ProviderConfig, ProviderRegistry, DEFAULT_CONNECT_TIMEOUT_SECONDS,
    DEFAULT_READ_TIMEOUT_SECONDS, DEFAULT_STREAM_MAX_DURATION_SECONDS,
};

/// Mutación del entorno del proceso: un solo test secuencial.
#[test]
fn certify_environment_hydration_and_fallbacks() {
    println!("\n🛰️ [PROVING_GROUNDS]: Auditing provider registry hydration...");

    std::env::set_var("PROVIDERS", "openai, anthropic, ghostprov");
    std::env::set_var("OPENAI_BASE_URL", "https://api.openai.com/");
    std::env::set_var("OPENAI_API_KEY", "sk-test-alpha");
    std::env::set_var("OPENAI_READ_TIMEOUT_SECONDS", "45");
    std::env::set_var("ANTHROPIC_BASE_URL", "https://api.anthropic.com");
    std::env::set_var("ANTHROPIC_API_KEY", "sk-test-beta");
    // ghostprov queda sin credenciales a propósito.
    std::env::remove_var("GHOSTPROV_BASE_URL");
    std::env::remove_var("GHOSTPROV_API_KEY");

    let registry = ProviderRegistry::from_environment();

    // 1. PROVEEDOR COMPLETO: URL normalizada y override de timeout.
    let openai_config = registry.resolve("openai").expect("openai vanished");
    assert_eq!(openai_config.base_url, "https://api.openai.com");
    assert_eq!(openai_config.read_timeout_seconds, 45);
    assert_eq!(openai_config.connect_timeout_seconds, DEFAULT_CONNECT_TIMEOUT_SECONDS);
    assert_eq!(
        openai_config.stream_max_duration_seconds,
        DEFAULT_STREAM_MAX_DURATION_SECONDS
    );

    // 2. PROVEEDOR SIN OVERRIDES: defaults sellados.
    let anthropic_config = registry.resolve("anthropic").expect("anthropic vanished");
    assert_eq!(anthropic_config.read_timeout_seconds, DEFAULT_READ_TIMEOUT_SECONDS);

    // 3. PROVEEDOR SIN CREDENCIALES: omitido sin colapsar la ignición.
    assert!(registry.resolve("ghostprov").is_err());

    println!("   ✅ [SUCCESS]: Registry hydration certified bit-perfect.");
}

#[test]
fn certify_direct_construction_for_proving_grounds() {
    let registry = ProviderRegistry::from_configs(vec![ProviderConfig {
        provider_name: "stub".to_string(),
        base_url: "http://127.0.0.1:9999".to_string(),
        api_key: "sk-stub".to_string(),
        connect_timeout_seconds: 1,
        read_timeout_seconds: 2,
        stream_max_duration_seconds: 3,
    }]);

    assert!(!registry.is_empty());
    assert_eq!(registry.resolve("stub").unwrap().read_timeout_seconds, 2);
    assert!(registry.resolve("missing").is_err());
}
