// [libs/infra/hot-state/src/scripts.rs]
/*!
 * =================================================================
 * APARATO: SOVEREIGN SCRIPT VAULT (V4.3 - GATEWAY MASTER)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: CUSTODIA Y EJECUCIÓN ATÓMICA DE SCRIPTS LUA
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. CONTENT-HASH LOADING: Cada script se registra vía SCRIPT LOAD y
 *    se invoca por SHA; ante NOSCRIPT (failover del cluster) la bóveda
 *    recarga y reintenta con el texto inline.
 * 2. IMMUTABLE TEXT DOCTRINE: El texto de los scripts es autoritativo
 *    y sellado; jamás se refactoriza en cadenas de round-trips.
 *
 * # Mathematical Proof (Atomic Decisions):
 * El motor de scripting de Redis es mono-hilo: cada script observa y
 * muta su conjunto de claves sin intercalado posible. La decisión de
 * cargo, la ventana de límite y el reembolso son por tanto atómicos
 * por construcción del servidor.
 * =================================================================
 */

use crate::client::HotStateClient;
use crate::errors::HotStateError;
use redis::Value;

/// Forma cruda del veredicto de un script, re-exportada para que los
/// consumidores decodifiquen sin acoplarse al driver.
pub use redis::Value as ScriptVerdict;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

/// Decisión atómica allowance-or-wallet con idempotencia y candado.
///
/// KEYS: [1] allowance usado, [2] balance de billetera, [3] idempotencia,
///       [4] bandera de bloqueo.
/// ARGV: [1] allowance diario, [2] precio en centavos, [3] TTL idempotencia,
///       [4] TTL hasta medianoche UTC.
/// Retorna {code, source, charged, remaining, balance_string}.
pub const BILLING_CHARGE_SCRIPT: &str = r#"
local daily_allowance = tonumber(ARGV[1])
local price_cents = tonumber(ARGV[2])
local wallet_balance = tonumber(redis.call('GET', KEYS[2]) or '0')

if redis.call('GET', KEYS[4]) == '1' then
  return {0, 'locked', 0, daily_allowance, tostring(wallet_balance)}
end

local cached_decision = redis.call('GET', KEYS[3])
if cached_decision then
  local source, charged, remaining, balance =
    string.match(cached_decision, '^([^:]+):([^:]+):([^:]+):([^:]+)$')
  return {2, source, tonumber(charged), tonumber(remaining), balance}
end

local allowance_used = tonumber(redis.call('GET', KEYS[1]) or '0')
if daily_allowance > 0 and allowance_used < daily_allowance then
  local consumed = redis.call('INCR', KEYS[1])
  if consumed == 1 then
    redis.call('EXPIRE', KEYS[1], tonumber(ARGV[4]))
  end
  local remaining = daily_allowance - consumed
  redis.call('SET', KEYS[3], 'allowance:0:' .. remaining .. ':' .. tostring(wallet_balance),
    'EX', tonumber(ARGV[3]))
  return {1, 'allowance', 0, remaining, tostring(wallet_balance)}
end

if price_cents <= 0 then
  redis.call('SET', KEYS[3], 'allowance:0:0:' .. tostring(wallet_balance),
    'EX', tonumber(ARGV[3]))
  return {1, 'allowance', 0, 0, tostring(wallet_balance)}
end

if wallet_balance < price_cents then
  return {0, 'insufficient_wallet', price_cents, 0, tostring(wallet_balance)}
end

local new_balance = redis.call('INCRBY', KEYS[2], -price_cents)
redis.call('SET', KEYS[3], 'wallet:' .. price_cents .. ':0:' .. tostring(new_balance),
  'EX', tonumber(ARGV[3]))
return {1, 'wallet', price_cents, 0, tostring(new_balance)}
"#;

/// Enforcement de las tres ventanas fijas sin incremento en denegación.
///
/// KEYS: [1] minuto, [2] hora, [3] día.
/// ARGV: [1..3] límites, [4..6] TTLs residuales de cada ventana.
/// Retorna {allowed, limited_by, minute_rem, hour_rem, day_rem}.
pub const RATE_LIMIT_SCRIPT: &str = r#"
local minute_limit = tonumber(ARGV[1])
local hour_limit = tonumber(ARGV[2])
local day_limit = tonumber(ARGV[3])
local minute_count = tonumber(redis.call('GET', KEYS[1]) or '0')
local hour_count = tonumber(redis.call('GET', KEYS[2]) or '0')
local day_count = tonumber(redis.call('GET', KEYS[3]) or '0')

if minute_count >= minute_limit then
  return {0, 'minute', 0, math.max(0, hour_limit - hour_count), math.max(0, day_limit - day_count)}
end
if hour_count >= hour_limit then
  return {0, 'hour', math.max(0, minute_limit - minute_count), 0, math.max(0, day_limit - day_count)}
end
if day_count >= day_limit then
  return {0, 'day', math.max(0, minute_limit - minute_count), math.max(0, hour_limit - hour_count), 0}
end

local new_minute = redis.call('INCR', KEYS[1])
if new_minute == 1 then redis.call('EXPIRE', KEYS[1], tonumber(ARGV[4])) end
local new_hour = redis.call('INCR', KEYS[2])
if new_hour == 1 then redis.call('EXPIRE', KEYS[2], tonumber(ARGV[5])) end
local new_day = redis.call('INCR', KEYS[3])
if new_day == 1 then redis.call('EXPIRE', KEYS[3], tonumber(ARGV[6])) end

return {1, 'none', minute_limit - new_minute, hour_limit - new_hour, day_limit - new_day}
"#;

/// Contabilidad de slots concurrentes con TTL de seguridad.
///
/// KEYS: [1] contador, [2] hash request_id -> ts.
/// ARGV: [1] operación ('acquire'|'release'), [2] máximo, [3] request_id,
///       [4] TTL de seguridad, [5] timestamp.
/// Retorna {granted, current}.
pub const CONCURRENCY_SCRIPT: &str = r#"
if ARGV[1] == 'acquire' then
  local active_slots = tonumber(redis.call('GET', KEYS[1]) or '0')
  if active_slots >= tonumber(ARGV[2]) then
    return {0, active_slots}
  end
  local new_count = redis.call('INCR', KEYS[1])
  if new_count == 1 then
    redis.call('EXPIRE', KEYS[1], tonumber(ARGV[4]))
  end
  redis.call('HSET', KEYS[2], ARGV[3], ARGV[5])
  redis.call('EXPIRE', KEYS[2], tonumber(ARGV[4]))
  return {1, new_count}
end

local active_slots = tonumber(redis.call('GET', KEYS[1]) or '0')
if active_slots > 0 then
  active_slots = redis.call('DECR', KEYS[1])
end
redis.call('HDEL', KEYS[2], ARGV[3])
return {1, active_slots}
"#;

/// Reembolso atómico con techo diario e idempotencia.
///
/// KEYS: [1] idempotencia, [2] contador diario, [3] balance.
/// ARGV: [1] monto, [2] techo diario, [3] TTL del contador,
///       [4] TTL idempotencia.
/// Retorna -1 (ya reembolsado), -2 (techo alcanzado) o el balance nuevo.
pub const REFUND_SCRIPT: &str = r#"
if redis.call('EXISTS', KEYS[1]) == 1 then
  return -1
end
if tonumber(redis.call('GET', KEYS[2]) or '0') >= tonumber(ARGV[2]) then
  return -2
end
redis.call('SET', KEYS[1], '1', 'EX', tonumber(ARGV[4]))
local refunds_today = redis.call('INCR', KEYS[2])
if refunds_today == 1 then
  redis.call('EXPIRE', KEYS[2], tonumber(ARGV[3]))
end
return redis.call('INCRBY', KEYS[3], tonumber(ARGV[1]))
"#;

/// Registro nominal (nombre -> texto) de la bóveda.
const SCRIPT_REGISTRY: &[(&str, &str)] = &[
    ("billing_charge", BILLING_CHARGE_SCRIPT),
    ("rate_limit", RATE_LIMIT_SCRIPT),
    ("concurrency", CONCURRENCY_SCRIPT),
    ("refund", REFUND_SCRIPT),
];

/// Bóveda de scripts: SHAs perezosos, recargables ante NOSCRIPT.
pub struct ScriptVault {
    hot_state_client: HotStateClient,
    loaded_script_digests: RwLock<HashMap<&'static str, String>>,
}

impl ScriptVault {
    pub fn new(hot_state_client: HotStateClient) -> Self {
        Self {
            hot_state_client,
            loaded_script_digests: RwLock::new(HashMap::new()),
        }
    }

    /// Registra los cuatro scripts críticos en el servidor vía SCRIPT LOAD.
    #[instrument(skip(self))]
    pub async fn preload(&self) -> Result<(), HotStateError> {
        for (script_name, script_text) in SCRIPT_REGISTRY {
            let digest = self.load_script(script_text).await?;
            debug!("📜 [SCRIPT_VAULT]: '{}' sealed under SHA {}.", script_name, digest);
            self.loaded_script_digests.write().await.insert(script_name, digest);
        }
        info!("📜 [SCRIPT_VAULT]: {} atomic scripts crystallized on the hot strata.", SCRIPT_REGISTRY.len());
        Ok(())
    }

    async fn load_script(&self, script_text: &str) -> Result<String, HotStateError> {
        let mut connection = self.hot_state_client.multiplexer();
        let digest: String = redis::cmd("SCRIPT")
            .arg("LOAD")
            .arg(script_text)
            .query_async(&mut connection)
            .await?;
        Ok(digest)
    }

    fn script_text(script_name: &str) -> Result<&'static str, HotStateError> {
        SCRIPT_REGISTRY
            .iter()
            .find(|(name, _)| *name == script_name)
            .map(|(_, text)| *text)
            .ok_or_else(|| HotStateError::UnknownScript(script_name.to_string()))
    }

    /**
     * Invoca un script por SHA con fallback inline ante NOSCRIPT.
     *
     * # Logic:
     * 1. EVALSHA con el digest cacheado (cargándolo si falta).
     * 2. Ante NOSCRIPT (caché de scripts purgada en el servidor),
     *    re-carga el texto, sella el nuevo SHA y reintenta inline.
     */
    #[instrument(skip(self, keys, args), fields(script = script_name))]
    pub async fn invoke(
        &self,
        script_name: &'static str,
        keys: &[String],
        args: &[String],
    ) -> Result<Value, HotStateError> {
        let script_text = Self::script_text(script_name)?;

        let digest = {
            let digest_guard = self.loaded_script_digests.read().await;
            digest_guard.get(script_name).cloned()
        };

        let digest = match digest {
            Some(known_digest) => known_digest,
            None => {
                let fresh_digest = self.load_script(script_text).await?;
                self.loaded_script_digests.write().await.insert(script_name, fresh_digest.clone());
                fresh_digest
            }
        };

        let mut connection = self.hot_state_client.multiplexer();

        let sha_invocation = redis::cmd("EVALSHA")
            .arg(&digest)
            .arg(keys.len())
            .arg(keys)
            .arg(args)
            .query_async::<_, Value>(&mut connection)
            .await;

        match sha_invocation {
            Ok(verdict) => Ok(verdict),
            Err(command_fault) if command_fault.kind() == redis::ErrorKind::NoScriptError => {
                warn!("📜 [SCRIPT_VAULT]: NOSCRIPT for '{}'. Re-sealing and retrying inline.", script_name);

                let fresh_digest = self.load_script(script_text).await?;
                self.loaded_script_digests.write().await.insert(script_name, fresh_digest);

                let inline_verdict = redis::cmd("EVAL")
                    .arg(script_text)
                    .arg(keys.len())
                    .arg(keys)
                    .arg(args)
                    .query_async::<_, Value>(&mut connection)
                    .await?;
                Ok(inline_verdict)
            }
            Err(command_fault) => Err(HotStateError::CommandError(command_fault)),
        }
    }
}

// --- DECODIFICADORES DE VEREDICTOS LUA ---

/// Extrae un entero de un elemento del veredicto.
pub fn verdict_int(element: &Value) -> Result<i64, HotStateError> {
    match element {
        Value::Int(numeric_value) => Ok(*numeric_value),
        Value::Data(raw_bytes) => String::from_utf8_lossy(raw_bytes)
            .parse::<i64>()
            .map_err(|_| HotStateError::DecodeError("non-numeric bulk element".into())),
        other_shape => Err(HotStateError::DecodeError(format!(
            "expected integer element, got {:?}",
            other_shape
        ))),
    }
}

/// Extrae una cadena de un elemento del veredicto.
pub fn verdict_string(element: &Value) -> Result<String, HotStateError> {
    match element {
        Value::Data(raw_bytes) => Ok(String::from_utf8_lossy(raw_bytes).into_owned()),
        Value::Status(status_text) => Ok(status_text.clone()),
        Value::Int(numeric_value) => Ok(numeric_value.to_string()),
        other_shape => Err(HotStateError::DecodeError(format!(
            "expected string element, got {:?}",
            other_shape
        ))),
    }
}

/// Interpreta el veredicto como arreglo de elementos.
pub fn verdict_elements(verdict: &Value) -> Result<&[Value], HotStateError> {
    match verdict {
        Value::Bulk(elements) => Ok(elements),
        other_shape => Err(HotStateError::DecodeError(format!(
            "expected array verdict, got {:?}",
            other_shape
        ))),
    }
}
