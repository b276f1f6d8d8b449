// [libs/infra/hot-state/src/client.rs]
/*!
 * =================================================================
 * APARATO: HOT-STATE CONNECTION CLIENT (V4.1 - GATEWAY MASTER)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: GESTIÓN DEL ENLACE MULTIPLEXADO CON REDIS
 *
 * # Mathematical Proof (Single-Threaded Serialization):
 * Todo script invocado a través de este cliente se ejecuta en el motor
 * de scripting mono-hilo del servidor; la atomicidad por principal es
 * una propiedad del servidor, no de este adaptador.
 * =================================================================
 */

use crate::errors::HotStateError;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::{error, info, instrument};

/// Cliente del estrato caliente. Clonable; todas las copias comparten
/// el mismo multiplexor auto-reconectante.
#[derive(Clone)]
pub struct HotStateClient {
    connection_multiplexer: ConnectionManager,
}

impl HotStateClient {
    #[instrument(skip(hot_state_url))]
    pub async fn connect(hot_state_url: &str) -> Result<Self, HotStateError> {
        if hot_state_url.is_empty() {
            return Err(HotStateError::ConnectionError(
                "CRITICAL_FAULT: REDIS_URL_UNDEFINED".into(),
            ));
        }

        info!("🔌 [HOT_STATE]: Initiating multiplexed link synchronization...");

        let redis_client = redis::Client::open(hot_state_url)
            .map_err(|open_fault| HotStateError::ConnectionError(open_fault.to_string()))?;

        let connection_multiplexer = ConnectionManager::new(redis_client)
            .await
            .map_err(|handshake_fault| {
                error!("⚠️ [HOT_STATE_FAULT]: Multiplexer ignition failed: {}", handshake_fault);
                HotStateError::ConnectionError(handshake_fault.to_string())
            })?;

        Ok(Self { connection_multiplexer })
    }

    /// Copia del multiplexor para invocaciones crudas (scripts).
    pub fn multiplexer(&self) -> ConnectionManager {
        self.connection_multiplexer.clone()
    }

    // --- OPERACIONES PRIMITIVAS DEL ESTRATO CALIENTE ---

    pub async fn get_string(&self, key: &str) -> Result<Option<String>, HotStateError> {
        let mut connection = self.multiplexer();
        Ok(connection.get(key).await?)
    }

    pub async fn set_string(&self, key: &str, value: &str) -> Result<(), HotStateError> {
        let mut connection = self.multiplexer();
        connection.set::<_, _, ()>(key, value).await?;
        Ok(())
    }

    pub async fn set_string_with_ttl(
        &self,
        key: &str,
        value: &str,
        ttl_seconds: u64,
    ) -> Result<(), HotStateError> {
        let mut connection = self.multiplexer();
        connection.set_ex::<_, _, ()>(key, value, ttl_seconds).await?;
        Ok(())
    }

    pub async fn delete_key(&self, key: &str) -> Result<(), HotStateError> {
        let mut connection = self.multiplexer();
        connection.del::<_, ()>(key).await?;
        Ok(())
    }

    pub async fn key_exists(&self, key: &str) -> Result<bool, HotStateError> {
        let mut connection = self.multiplexer();
        Ok(connection.exists(key).await?)
    }

    /// Mutación race-safe del balance cacheado. Única vía de escritura
    /// concurrente sobre `wallet:{...}` fuera del bootstrap.
    pub async fn increment_by(&self, key: &str, delta: i64) -> Result<i64, HotStateError> {
        let mut connection = self.multiplexer();
        Ok(connection.incr(key, delta).await?)
    }

    pub async fn decrement(&self, key: &str) -> Result<i64, HotStateError> {
        let mut connection = self.multiplexer();
        Ok(connection.decr(key, 1).await?)
    }
}
