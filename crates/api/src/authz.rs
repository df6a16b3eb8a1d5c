//! API-side authorization guard for commands.
//!
//! This enforces authorization at the command boundary (before dispatch),
//! while keeping domain aggregates and infra auth-agnostic. Identity checks
//! that depend on aggregate state (activation, posting changes) live in the
//! aggregate itself.

use reqtrack_auth::{
    AccessRequirement, AuthzError, CommandAuthorization, PermissionCatalog, authorize,
};

use crate::context::PrincipalContext;

/// Check a role/permission requirement in the current request context.
pub fn require(
    catalog: &PermissionCatalog,
    principal: &PrincipalContext,
    requirement: &AccessRequirement,
) -> Result<(), AuthzError> {
    authorize(&principal.to_principal(), catalog, requirement)
}

/// Check authorization for a command in the current request context.
///
/// This is intended to be called **before** dispatching a command.
pub fn authorize_command<C: CommandAuthorization>(
    catalog: &PermissionCatalog,
    principal: &PrincipalContext,
    command: &C,
) -> Result<(), AuthzError> {
    let actor = principal.to_principal();
    for perm in command.required_permissions() {
        authorize(&actor, catalog, &AccessRequirement::Permission(perm.clone()))?;
    }
    Ok(())
}
