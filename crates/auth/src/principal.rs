use serde::{Deserialize, Serialize};

use reqtrack_core::UserId;

use crate::{JwtClaims, Role};

/// A fully resolved principal for authorization decisions.
///
/// Construction is decoupled from storage and transport: the API layer builds
/// one from validated token claims, tests build them directly. The guard in
/// [`crate::authorize`] never probes for attributes at runtime; a principal
/// always exposes its identity, role set and superuser flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: UserId,
    pub roles: Vec<Role>,
    pub superuser: bool,
}

impl Principal {
    pub fn new(user_id: UserId, roles: Vec<Role>, superuser: bool) -> Self {
        Self {
            user_id,
            roles,
            superuser,
        }
    }

    pub fn has_role(&self, name: &str) -> bool {
        self.roles.iter().any(|r| r.as_str() == name)
    }
}

impl From<&JwtClaims> for Principal {
    fn from(claims: &JwtClaims) -> Self {
        Self {
            user_id: claims.sub,
            roles: claims.roles.clone(),
            superuser: claims.superuser,
        }
    }
}
