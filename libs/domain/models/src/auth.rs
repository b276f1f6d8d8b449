// [libs/domain/models/src/auth.rs]
/*!
 * =================================================================
 * APARATO: API KEY & AUTH CONTEXT MODELS (V4.1 - GATEWAY MASTER)
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: CONTRATOS DE CREDENCIALES Y CONTEXTO AUTENTICADO
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. DIGEST-ONLY SECRETS: El secreto en claro jamás se modela; solo
 *    su huella SHA-256 y el prefijo visible para UI/logs.
 * 2. CACHE PARITY: 'ApiKeyRecord' serializa bit-perfecto hacia el
 *    estrato caliente (auth:key:{hash}) y se rehidrata sin pérdida.
 * =================================================================
 */

use crate::owner::OwnerRef;
use crate::policy::Policy;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Variante de propiedad de una clave API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiKeyKind {
    /// Propiedad directa de un usuario.
    User,
    /// Propiedad de un proyecto; el principal efectivo es la organización matriz.
    Project,
}

/// Registro persistido de una clave API. El secreto en claro solo existe
/// en el instante de creación; aquí vive únicamente su digest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKeyRecord {
    /// Identificador unívoco de la clave (UUID v4).
    pub api_key_identifier: String,
    /// Variante de propiedad (usuario directo o proyecto).
    pub key_kind: ApiKeyKind,
    /// Usuario propietario (claves de usuario).
    pub user_identifier: Option<String>,
    /// Proyecto propietario (claves de proyecto).
    pub project_identifier: Option<String>,
    /// Huella SHA-256 hexadecimal del secreto.
    pub hashed_secret: String,
    /// Prefijo visible (primeros 12 caracteres) para UI y logs.
    pub key_prefix: String,
    /// Conjunto de scopes otorgados.
    pub scopes: Vec<String>,
    /// Allowlist opcional de modelos; vacía = sin restricción de clave.
    pub allowed_models: Vec<String>,
    /// Allowlist opcional de IPs de origen; vacía = sin restricción.
    pub allowed_ips: Vec<String>,
    /// Bandera de activación administrativa.
    pub is_active: bool,
    /// Expiración opcional de la clave.
    pub expires_at: Option<DateTime<Utc>>,
    /// Marca de revocación; presente = clave muerta.
    pub revoked_at: Option<DateTime<Utc>>,
}

impl ApiKeyRecord {
    /// Evalúa la vitalidad de la clave contra el reloj inyectado.
    pub fn liveness(&self, now: DateTime<Utc>) -> KeyLiveness {
        if self.revoked_at.is_some() || !self.is_active {
            return KeyLiveness::Inactive;
        }
        if let Some(expiry_timestamp) = self.expires_at {
            if expiry_timestamp < now {
                return KeyLiveness::Expired;
            }
        }
        KeyLiveness::Alive
    }
}

/// Veredicto de vitalidad de una clave API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyLiveness {
    Alive,
    Inactive,
    Expired,
}

/// Contexto autenticado que atraviesa el pipeline de admisión completo.
/// Se forja una sola vez en el guard perimetral y viaja por extensión.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthContext {
    /// Principal de facturación resuelto (usuario o org del proyecto).
    pub owner: OwnerRef,
    /// Identificador de la clave API autenticada.
    pub api_key_identifier: String,
    /// Prefijo visible de la clave para el rastro estructurado.
    pub key_prefix: String,
    /// Scopes otorgados por la clave.
    pub scopes: Vec<String>,
    /// Allowlist de modelos a nivel de clave (vacía = sin restricción).
    pub key_allowed_models: Vec<String>,
    /// Allowlist de IPs a nivel de clave (vacía = sin restricción).
    pub key_allowed_ips: Vec<String>,
    /// Política efectiva resuelta del plan del principal.
    pub policy: Policy,
}
