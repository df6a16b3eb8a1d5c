use reqtrack_auth::{Principal, Role};
use reqtrack_core::UserId;

/// Principal context for a request (authenticated identity + roles).
///
/// Built by the auth middleware from validated access-token claims and
/// attached as a request extension; handlers receive it as a typed, required
/// parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    user_id: UserId,
    roles: Vec<Role>,
    superuser: bool,
}

impl PrincipalContext {
    pub fn new(user_id: UserId, roles: Vec<Role>, superuser: bool) -> Self {
        Self {
            user_id,
            roles,
            superuser,
        }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn roles(&self) -> &[Role] {
        &self.roles
    }

    pub fn superuser(&self) -> bool {
        self.superuser
    }

    pub fn has_role(&self, name: &str) -> bool {
        self.roles.iter().any(|r| r.as_str() == name)
    }

    pub fn to_principal(&self) -> Principal {
        Principal::new(self.user_id, self.roles.to_vec(), self.superuser)
    }
}
