// [libs/domain/billing/src/lib.rs]
/*!
 * =================================================================
 * APARATO: BILLING CORE GRAMMAR (V4.2 - GATEWAY MASTER)
 * CLASIFICACIÓN: DOMAIN LOGIC (ESTRATO L2)
 * RESPONSABILIDAD: GOBERNANZA FINANCIERA Y GRAMÁTICA DE DECISIONES
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. ENCODED DECISION PARITY: La decisión atómica del script caliente
 *    viaja codificada como 'source:charged:remaining:balance'; este
 *    aparato es la única autoridad de encode/parse de esa gramática.
 * 2. DETERMINISTIC PRICING: El precio sintético por petición deriva
 *    de los precios por millón con avg_tokens sellado en 1000.
 * 3. UTC DAY ARITHMETIC: Toda ventana diaria (allowance, refund cap)
 *    expira exactamente a medianoche UTC.
 *
 * # Mathematical Proof (Per-Request Price):
 * price = ceil(max(1, (input + output) / 1e6 * 1000)). Con precios en
 * centavos por millón de tokens, la expresión colapsa a
 * max(1, ceil((input + output) / 1000)), computable en enteros puros
 * sin deriva IEEE-754.
 * =================================================================
 */

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Tokens promedio por petición sellados para el precio sintético.
pub const AVERAGE_TOKENS_PER_REQUEST: i64 = 1000;
/// Precio seguro por defecto ante modelos sin franja de precio vigente.
pub const FALLBACK_PRICE_CENTS: i64 = 1;
/// Techo diario de reembolsos por principal.
pub const DAILY_REFUND_CAP: i64 = 10;
/// TTL de las claves de idempotencia (cargo y reembolso).
pub const IDEMPOTENCY_TTL_SECONDS: i64 = 86_400;

/// Fuente de la decisión de cargo emitida por el script atómico.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingSource {
    /// Consumió una petición gratuita del allowance diario.
    Allowance,
    /// Débito de la billetera prepaga.
    Wallet,
    /// Denegado: balance inferior al precio.
    InsufficientWallet,
    /// Denegado: billetera bloqueada por disputa.
    Locked,
}

impl BillingSource {
    /// Etiqueta estable de la gramática codificada.
    pub fn as_label(&self) -> &'static str {
        match self {
            BillingSource::Allowance => "allowance",
            BillingSource::Wallet => "wallet",
            BillingSource::InsufficientWallet => "insufficient_wallet",
            BillingSource::Locked => "locked",
        }
    }

    /// Rehidratación desde la etiqueta del script caliente.
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "allowance" => Some(BillingSource::Allowance),
            "wallet" => Some(BillingSource::Wallet),
            "insufficient_wallet" => Some(BillingSource::InsufficientWallet),
            "locked" => Some(BillingSource::Locked),
            _ => None,
        }
    }
}

/// Veredicto numérico del script de cargo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChargeCode {
    /// Cargo denegado sin mutación de estado.
    Denied,
    /// Cargo aplicado en esta invocación.
    Charged,
    /// Replay idempotente de una decisión previa.
    Replayed,
}

impl ChargeCode {
    pub fn from_wire(code: i64) -> Option<Self> {
        match code {
            0 => Some(ChargeCode::Denied),
            1 => Some(ChargeCode::Charged),
            2 => Some(ChargeCode::Replayed),
            _ => None,
        }
    }
}

/// Decisión completa del motor de facturación para una petición.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargeDecision {
    pub code: ChargeCode,
    pub source: BillingSource,
    pub charged_cents: i64,
    pub allowance_remaining: i64,
    pub wallet_balance_cents: i64,
}

impl ChargeDecision {
    /**
     * Codifica la decisión en la gramática del estrato caliente:
     * `source:charged:remaining:balance`. Es exactamente la forma que
     * el script Lua cachea bajo la clave de idempotencia.
     */
    pub fn encode(&self) -> String {
        format!(
            "{}:{}:{}:{}",
            self.source.as_label(),
            self.charged_cents,
            self.allowance_remaining,
            self.wallet_balance_cents
        )
    }

    /// Rehidrata una decisión replay (`code=2`) desde su forma codificada.
    pub fn parse_replay(encoded: &str) -> Option<Self> {
        let mut segments = encoded.splitn(4, ':');
        let source = BillingSource::from_label(segments.next()?)?;
        let charged_cents = segments.next()?.parse::<i64>().ok()?;
        let allowance_remaining = segments.next()?.parse::<i64>().ok()?;
        let wallet_balance_cents = segments.next()?.parse::<i64>().ok()?;

        Some(ChargeDecision {
            code: ChargeCode::Replayed,
            source,
            charged_cents,
            allowance_remaining,
            wallet_balance_cents,
        })
    }
}

/// Resultado terminal del motor de reembolsos.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RefundOutcome {
    /// Reembolso aplicado; transporta el balance caliente resultante.
    Success { new_balance_cents: i64 },
    /// El request_id ya fue reembolsado (idempotencia).
    AlreadyRefunded,
    /// Techo diario de reembolsos alcanzado sin mutación.
    DailyCapExceeded,
    /// No hubo cargo de billetera que reembolsar.
    NoCharge,
    /// Falla de infraestructura durante el reembolso.
    Error,
}

/**
 * Deriva el precio sintético por petición en centavos.
 *
 * # Logic:
 * Con precios de entrada y salida expresados en centavos por millón de
 * tokens y el promedio sellado de 1000 tokens por petición, el precio
 * es la división techo de la suma entre 1000, nunca inferior a 1.
 */
pub fn derive_request_price_cents(
    input_price_cents_per_million: i64,
    output_price_cents_per_million: i64,
) -> i64 {
    let combined_price = input_price_cents_per_million.saturating_add(output_price_cents_per_million);
    let ceiled = (combined_price + AVERAGE_TOKENS_PER_REQUEST - 1) / AVERAGE_TOKENS_PER_REQUEST;
    ceiled.max(1)
}

/// Segundos restantes hasta la próxima medianoche UTC (mínimo 1).
pub fn seconds_until_utc_midnight(now: DateTime<Utc>) -> i64 {
    let next_midnight = (now + Duration::days(1))
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .expect("midnight is always representable")
        .and_utc();

    (next_midnight - now).num_seconds().max(1)
}

/// Sello compacto del día UTC (`YYYYMMDD`) usado por las claves diarias.
pub fn utc_day_stamp(now: DateTime<Utc>) -> String {
    now.format("%Y%m%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn certify_price_derivation_floor_and_ceiling() {
        // Modelo gratuito o mal preciado: nunca por debajo de 1 centavo.
        assert_eq!(derive_request_price_cents(0, 0), 1);
        // 1500 + 2000 centavos/1M -> ceil(3500/1000) = 4.
        assert_eq!(derive_request_price_cents(1500, 2000), 4);
        // Frontera exacta: 3000/1000 = 3 sin redondeo.
        assert_eq!(derive_request_price_cents(1000, 2000), 3);
    }

    #[test]
    fn certify_decision_encode_parse_roundtrip() {
        let decision = ChargeDecision {
            code: ChargeCode::Charged,
            source: BillingSource::Wallet,
            charged_cents: 3,
            allowance_remaining: 0,
            wallet_balance_cents: 497,
        };

        let encoded = decision.encode();
        assert_eq!(encoded, "wallet:3:0:497");

        let replayed = ChargeDecision::parse_replay(&encoded).unwrap();
        assert_eq!(replayed.code, ChargeCode::Replayed);
        assert_eq!(replayed.source, BillingSource::Wallet);
        assert_eq!(replayed.wallet_balance_cents, 497);
    }

    #[test]
    fn certify_midnight_arithmetic() {
        let late_evening = Utc.with_ymd_and_hms(2026, 3, 14, 23, 59, 30).unwrap();
        assert_eq!(seconds_until_utc_midnight(late_evening), 30);

        let exact_midnight = Utc.with_ymd_and_hms(2026, 3, 14, 0, 0, 0).unwrap();
        assert_eq!(seconds_until_utc_midnight(exact_midnight), 86_400);

        assert_eq!(utc_day_stamp(late_evening), "20260314");
    }
}
