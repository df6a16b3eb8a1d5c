//! Permission catalog: the full set of known permissions plus per-role grant
//! patterns, with wildcard expansion.
//!
//! The catalog is explicit configuration, built once at process start and
//! passed by reference into the authorization guard. It is never mutated
//! after load. Expansion of `resource.*` / `*` patterns is a pure function
//! over (catalog, pattern list) and is recomputed at check time rather than
//! cached on the role.

use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use thiserror::Error;

use crate::{Permission, Role};

/// Well-known role names seeded into the default catalog.
pub mod role_names {
    pub const SUPER_ADMIN: &str = "super_admin";
    pub const ADMIN: &str = "admin";
    pub const HIRING_MANAGER: &str = "hiring_manager";
    pub const APPROVER: &str = "approver";
    pub const RECRUITER: &str = "recruiter";
    pub const INTERVIEWER: &str = "interviewer";
    pub const VIEWER: &str = "viewer";
}

/// A permission definition in the catalog.
#[derive(Debug, Clone, Serialize)]
pub struct PermissionDefinition {
    pub name: Cow<'static, str>,
    pub resource: Cow<'static, str>,
    pub action: Cow<'static, str>,
    pub description: Cow<'static, str>,
}

/// A role definition: display metadata plus its raw grant pattern list.
///
/// Patterns are either exact permission names, `resource.*`, or the bare `*`.
#[derive(Debug, Clone, Serialize)]
pub struct RoleDefinition {
    pub name: Cow<'static, str>,
    pub display_name: Cow<'static, str>,
    pub description: Cow<'static, str>,
    pub grants: Vec<Cow<'static, str>>,
}

/// Catalog construction error.
///
/// Referencing an unknown permission or resource in a role's grant list is a
/// configuration error, reported when the catalog is built (seed/setup time),
/// never at request time.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("role '{role}' grants unknown permission '{pattern}'")]
    UnknownPermission { role: String, pattern: String },

    #[error("role '{role}' grants wildcard '{pattern}' over unknown resource '{resource}'")]
    UnknownResource {
        role: String,
        pattern: String,
        resource: String,
    },

    #[error("duplicate permission definition '{0}'")]
    DuplicatePermission(String),

    #[error("duplicate role definition '{0}'")]
    DuplicateRole(String),
}

/// Immutable role/permission configuration.
#[derive(Debug, Clone)]
pub struct PermissionCatalog {
    permissions: BTreeMap<String, PermissionDefinition>,
    roles: BTreeMap<String, RoleDefinition>,
}

impl PermissionCatalog {
    /// Build a catalog, validating every role grant pattern against the
    /// permission set.
    pub fn new(
        permissions: Vec<PermissionDefinition>,
        roles: Vec<RoleDefinition>,
    ) -> Result<Self, CatalogError> {
        let mut perm_map = BTreeMap::new();
        for def in permissions {
            let name = def.name.to_string();
            if perm_map.insert(name.clone(), def).is_some() {
                return Err(CatalogError::DuplicatePermission(name));
            }
        }

        let mut role_map: BTreeMap<String, RoleDefinition> = BTreeMap::new();
        for role in roles {
            for pattern in &role.grants {
                validate_pattern(&perm_map, role.name.as_ref(), pattern.as_ref())?;
            }
            let name = role.name.to_string();
            if role_map.insert(name.clone(), role).is_some() {
                return Err(CatalogError::DuplicateRole(name));
            }
        }

        Ok(Self {
            permissions: perm_map,
            roles: role_map,
        })
    }

    /// All concrete permissions in the catalog.
    pub fn permissions(&self) -> impl Iterator<Item = &PermissionDefinition> {
        self.permissions.values()
    }

    /// All role definitions in the catalog.
    pub fn roles(&self) -> impl Iterator<Item = &RoleDefinition> {
        self.roles.values()
    }

    pub fn role(&self, name: &str) -> Option<&RoleDefinition> {
        self.roles.get(name)
    }

    /// Expand a list of grant patterns into a de-duplicated concrete
    /// permission set.
    ///
    /// Pure and deterministic: `*` resolves to every catalog permission,
    /// `resource.*` to every action on that resource, and exact names to
    /// themselves. Patterns that survived catalog construction always resolve.
    pub fn expand_patterns<'a, I>(&self, patterns: I) -> BTreeSet<Permission>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut expanded = BTreeSet::new();
        for pattern in patterns {
            if pattern == "*" {
                expanded.extend(
                    self.permissions
                        .keys()
                        .map(|name| Permission::new(name.clone())),
                );
            } else if let Some(resource) = pattern.strip_suffix(".*") {
                expanded.extend(
                    self.permissions
                        .values()
                        .filter(|def| def.resource == resource)
                        .map(|def| Permission::new(def.name.to_string())),
                );
            } else if self.permissions.contains_key(pattern) {
                expanded.insert(Permission::new(pattern.to_string()));
            }
        }
        expanded
    }

    /// Effective permission set of a role (recomputed from raw patterns).
    ///
    /// Unknown roles resolve to the empty set: a role that exists only in a
    /// token but not in the catalog grants nothing.
    pub fn role_permissions(&self, role: &Role) -> BTreeSet<Permission> {
        match self.roles.get(role.as_str()) {
            Some(def) => self.expand_patterns(def.grants.iter().map(|p| p.as_ref())),
            None => BTreeSet::new(),
        }
    }
}

fn validate_pattern(
    permissions: &BTreeMap<String, PermissionDefinition>,
    role: &str,
    pattern: &str,
) -> Result<(), CatalogError> {
    if pattern == "*" {
        return Ok(());
    }
    if let Some(resource) = pattern.strip_suffix(".*") {
        if permissions.values().any(|def| def.resource == resource) {
            return Ok(());
        }
        return Err(CatalogError::UnknownResource {
            role: role.to_string(),
            pattern: pattern.to_string(),
            resource: resource.to_string(),
        });
    }
    if permissions.contains_key(pattern) {
        return Ok(());
    }
    Err(CatalogError::UnknownPermission {
        role: role.to_string(),
        pattern: pattern.to_string(),
    })
}

macro_rules! perm {
    ($resource:literal, $action:literal, $desc:literal) => {
        PermissionDefinition {
            name: Cow::Borrowed(concat!($resource, ".", $action)),
            resource: Cow::Borrowed($resource),
            action: Cow::Borrowed($action),
            description: Cow::Borrowed($desc),
        }
    };
}

fn grants(patterns: &[&'static str]) -> Vec<Cow<'static, str>> {
    patterns.iter().map(|p| Cow::Borrowed(*p)).collect()
}

/// The catalog shipped with the service.
///
/// This is static seed configuration; deployments that manage roles
/// externally build their own catalog through [`PermissionCatalog::new`].
pub fn default_catalog() -> Result<PermissionCatalog, CatalogError> {
    let permissions = vec![
        perm!("requirement", "create", "Create new job requirements"),
        perm!("requirement", "read", "View job requirements"),
        perm!("requirement", "update", "Update job requirements"),
        perm!("requirement", "delete", "Delete job requirements"),
        perm!("requirement", "approve", "Approve job requirements"),
        perm!("requirement", "assign", "Assign requirements to recruiters"),
        perm!("candidate", "create", "Add new candidates"),
        perm!("candidate", "read", "View candidate information"),
        perm!("candidate", "update", "Update candidate information"),
        perm!("candidate", "delete", "Delete candidates"),
        perm!("interview", "create", "Schedule interviews"),
        perm!("interview", "read", "View interview details"),
        perm!("interview", "update", "Update interview details"),
        perm!("interview", "delete", "Delete interviews"),
        perm!("interview", "feedback", "Provide interview feedback"),
        perm!("job_posting", "create", "Create job postings"),
        perm!("job_posting", "read", "View job postings"),
        perm!("job_posting", "update", "Update job postings"),
        perm!("job_posting", "delete", "Delete job postings"),
        perm!("job_posting", "publish", "Publish job postings"),
        perm!("user", "create", "Create new users"),
        perm!("user", "read", "View user information"),
        perm!("user", "update", "Update user information"),
        perm!("user", "delete", "Delete users"),
        perm!("user", "assign_role", "Assign roles to users"),
        perm!("report", "read", "View reports and analytics"),
        perm!("report", "export", "Export reports"),
        perm!("settings", "read", "View system settings"),
        perm!("settings", "update", "Update system settings"),
    ];

    let roles = vec![
        RoleDefinition {
            name: Cow::Borrowed(role_names::SUPER_ADMIN),
            display_name: Cow::Borrowed("Super Administrator"),
            description: Cow::Borrowed("Full system access with all permissions"),
            grants: grants(&["*"]),
        },
        RoleDefinition {
            name: Cow::Borrowed(role_names::ADMIN),
            display_name: Cow::Borrowed("Administrator"),
            description: Cow::Borrowed("Administrative access to manage system and users"),
            grants: grants(&[
                "requirement.*",
                "candidate.*",
                "interview.*",
                "job_posting.*",
                "user.create",
                "user.read",
                "user.update",
                "user.delete",
                "user.assign_role",
                "report.read",
                "report.export",
                "settings.read",
                "settings.update",
            ]),
        },
        RoleDefinition {
            name: Cow::Borrowed(role_names::HIRING_MANAGER),
            display_name: Cow::Borrowed("Hiring Manager"),
            description: Cow::Borrowed(
                "Creates and manages job requirements for their department",
            ),
            grants: grants(&[
                "requirement.create",
                "requirement.read",
                "requirement.update",
                "requirement.delete",
                "requirement.assign",
                "candidate.read",
                "interview.read",
                "job_posting.read",
                "report.read",
            ]),
        },
        RoleDefinition {
            name: Cow::Borrowed(role_names::APPROVER),
            display_name: Cow::Borrowed("Approver"),
            description: Cow::Borrowed("Approves or rejects job requirements"),
            grants: grants(&[
                "requirement.read",
                "requirement.approve",
                "candidate.read",
                "interview.read",
                "report.read",
            ]),
        },
        RoleDefinition {
            name: Cow::Borrowed(role_names::RECRUITER),
            display_name: Cow::Borrowed("Recruiter"),
            description: Cow::Borrowed("Manages candidates and recruitment process"),
            grants: grants(&[
                "requirement.read",
                "requirement.update",
                "candidate.*",
                "interview.create",
                "interview.read",
                "interview.update",
                "interview.delete",
                "job_posting.*",
                "report.read",
            ]),
        },
        RoleDefinition {
            name: Cow::Borrowed(role_names::INTERVIEWER),
            display_name: Cow::Borrowed("Interviewer"),
            description: Cow::Borrowed("Conducts interviews and provides feedback"),
            grants: grants(&[
                "requirement.read",
                "candidate.read",
                "interview.read",
                "interview.feedback",
                "report.read",
            ]),
        },
        RoleDefinition {
            name: Cow::Borrowed(role_names::VIEWER),
            display_name: Cow::Borrowed("Viewer"),
            description: Cow::Borrowed("Read-only access to view requirements and candidates"),
            grants: grants(&[
                "requirement.read",
                "candidate.read",
                "interview.read",
                "job_posting.read",
                "report.read",
            ]),
        },
    ];

    PermissionCatalog::new(permissions, roles)
}
