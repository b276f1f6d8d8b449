// [tests/mirror/libs/infra/db/pricing_windows.test.rs]
/**
 * =================================================================
 * APARATO: PRICING WINDOWS TEST (V4.0)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L3-MIRROR
 * RESPONSABILIDAD: CERTIFICACIÓN DE SELECCIÓN DE FRANJAS VIGENTES
 * =================================================================
 */

use chrono::{TimeZone, Utc};
use omniway_domain_models::catalog::PricingRecord;
use omniway_infra_db::repositories::PricingRepository;
use omniway_infra_db::TursoClient;

#[tokio::test]
async fn certify_effective_window_selection() {
    println!("\n💲 [PROVING_GROUNDS]: Auditing pricing window strata...");

    let client = TursoClient::connect("file:pricing_window_test?mode=memory&cache=shared", None)
        .await
        .unwrap();
    let repository = PricingRepository::new(client.clone());

    // Franja histórica cerrada: enero.
    repository
        .register_price(&PricingRecord {
            model_identifier: "gpt-4o".to_string(),
            input_price_cents_per_million: 1000,
            output_price_cents_per_million: 2000,
            effective_from: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
            effective_to: Some(Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap()),
        })
        .await
        .unwrap();

    // Franja vigente abierta: desde febrero.
    repository
        .register_price(&PricingRecord {
            model_identifier: "gpt-4o".to_string(),
            input_price_cents_per_million: 3000,
            output_price_cents_per_million: 6000,
            effective_from: Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap(),
            effective_to: None,
        })
        .await
        .unwrap();

    // En enero gana la franja cerrada.
    let january_probe = Utc.with_ymd_and_hms(2026, 1, 15, 12, 0, 0).unwrap();
    let january_price =
        repository.find_effective_price("gpt-4o", january_probe).await.unwrap().unwrap();
    assert_eq!(january_price.input_price_cents_per_million, 1000);

    // En marzo gana la franja abierta más reciente.
    let march_probe = Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap();
    let march_price =
        repository.find_effective_price("gpt-4o", march_probe).await.unwrap().unwrap();
    assert_eq!(march_price.input_price_cents_per_million, 3000);
    assert!(march_price.effective_to.is_none());

    // Modelo sin franja: None (el resolver aplica el default seguro).
    assert!(repository
        .find_effective_price("model_ghost", march_probe)
        .await
        .unwrap()
        .is_none());

    println!("   ✅ [SUCCESS]: Window selection certified bit-perfect.");
}

#[tokio::test]
async fn certify_boundary_instants() {
    let client = TursoClient::connect("file:pricing_boundary_test?mode=memory&cache=shared", None)
        .await
        .unwrap();
    let repository = PricingRepository::new(client.clone());

    let window_start = Utc.with_ymd_and_hms(2026, 5, 1, 0, 0, 0).unwrap();
    let window_end = Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap();

    repository
        .register_price(&PricingRecord {
            model_identifier: "claude-3-haiku".to_string(),
            input_price_cents_per_million: 25,
            output_price_cents_per_million: 125,
            effective_from: window_start,
            effective_to: Some(window_end),
        })
        .await
        .unwrap();

    // Inclusivo en el inicio, exclusivo en el fin.
    assert!(repository
        .find_effective_price("claude-3-haiku", window_start)
        .await
        .unwrap()
        .is_some());
    assert!(repository
        .find_effective_price("claude-3-haiku", window_end)
        .await
        .unwrap()
        .is_none());
}
