use thiserror::Error;

use crate::{Permission, PermissionCatalog, Principal, Role};

/// What an operation demands of its caller: a named role or a named
/// permission. Every mutating operation names exactly which of these gates it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessRequirement {
    Role(Role),
    Permission(Permission),
}

impl AccessRequirement {
    pub fn role(name: impl Into<std::borrow::Cow<'static, str>>) -> Self {
        Self::Role(Role::new(name))
    }

    pub fn permission(name: impl Into<std::borrow::Cow<'static, str>>) -> Self {
        Self::Permission(Permission::new(name))
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: role '{0}' required")]
    MissingRole(String),

    #[error("forbidden: missing permission '{0}'")]
    MissingPermission(String),
}

/// Command-side authorization contract (checked at the command boundary).
///
/// Implement this on commands that require permissions. The API layer
/// enforces these requirements before dispatching; domain aggregates stay
/// auth-agnostic except for identity checks that depend on aggregate state.
pub trait CommandAuthorization {
    fn required_permissions(&self) -> &[Permission];
}

/// Authorize a principal against a role or permission requirement.
///
/// - No IO
/// - No panics
/// - No business logic (pure policy check over principal + catalog)
///
/// A superuser passes every check. A role check passes iff the principal's
/// role set contains the named role. A permission check passes iff some held
/// role's expanded permission set (per the catalog) contains the permission.
/// Callers must fail the surrounding operation when this returns an error,
/// never silently skip it.
pub fn authorize(
    principal: &Principal,
    catalog: &PermissionCatalog,
    requirement: &AccessRequirement,
) -> Result<(), AuthzError> {
    if principal.superuser {
        return Ok(());
    }

    match requirement {
        AccessRequirement::Role(role) => {
            if principal.has_role(role.as_str()) {
                Ok(())
            } else {
                Err(AuthzError::MissingRole(role.as_str().to_string()))
            }
        }
        AccessRequirement::Permission(permission) => {
            let held = principal
                .roles
                .iter()
                .any(|role| catalog.role_permissions(role).contains(permission));
            if held {
                Ok(())
            } else {
                Err(AuthzError::MissingPermission(permission.as_str().to_string()))
            }
        }
    }
}
