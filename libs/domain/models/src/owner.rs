// [libs/domain/models/src/owner.rs]
/*!
 * =================================================================
 * APARATO: OWNER PRINCIPAL MODEL (V4.0 - GATEWAY MASTER)
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: IDENTIDAD CERRADA DEL PRINCIPAL DE FACTURACIÓN
 *
 * # Mathematical Proof (Key Space Partition):
 * Cada cuota, billetera y contador del sistema se indexa por el par
 * (variante, id). Al ser 'OwnerRef' un sum type cerrado, el espacio
 * de claves del estrato caliente queda particionado sin colisiones
 * posibles entre usuarios y organizaciones.
 * =================================================================
 */

use serde::{Deserialize, Serialize};
use std::fmt;

/// Principal de facturación: todo contador, billetera y política
/// del sistema pertenece exactamente a una de estas variantes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "owner_type", content = "owner_id", rename_all = "snake_case")]
pub enum OwnerRef {
    /// Clave de usuario individual.
    User(String),
    /// Clave de proyecto resuelta a su organización matriz.
    Org(String),
}

impl OwnerRef {
    /// Etiqueta de variante usada por el esquema de claves calientes y
    /// por los scopes SQL (`user` | `org`).
    pub fn variant_label(&self) -> &'static str {
        match self {
            OwnerRef::User(_) => "user",
            OwnerRef::Org(_) => "org",
        }
    }

    /// Identificador crudo del principal.
    pub fn identifier(&self) -> &str {
        match self {
            OwnerRef::User(owner_identifier) => owner_identifier,
            OwnerRef::Org(owner_identifier) => owner_identifier,
        }
    }

    /**
     * Fragmento canónico `variante:id` inyectado en toda clave del
     * estrato caliente (`rl:user:u1:...`, `wallet:org:o9`, ...).
     */
    pub fn key_fragment(&self) -> String {
        format!("{}:{}", self.variant_label(), self.identifier())
    }
}

impl fmt::Display for OwnerRef {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.key_fragment())
    }
}

#[cfg(test)]
mod tests {
    use super::OwnerRef;

    #[test]
    fn certify_key_fragment_partition() {
        let user_principal = OwnerRef::User("u1".to_string());
        let org_principal = OwnerRef::Org("u1".to_string());

        // Mismo id crudo, fragmentos disjuntos: la partición del espacio
        // de claves es estructural, no convencional.
        assert_eq!(user_principal.key_fragment(), "user:u1");
        assert_eq!(org_principal.key_fragment(), "org:u1");
        assert_ne!(user_principal, org_principal);
    }
}
