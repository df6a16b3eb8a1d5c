//! `reqtrack-auth` — pure authentication/authorization boundary.
//!
//! This crate is intentionally decoupled from HTTP and storage: the permission
//! catalog is explicit configuration loaded once at startup, the guard is a
//! pure predicate over (principal, catalog), and token/password handling sits
//! behind small traits.

pub mod authorize;
pub mod catalog;
pub mod claims;
pub mod jwt;
pub mod password;
pub mod permissions;
pub mod principal;
pub mod roles;
pub mod user;

pub use authorize::{AccessRequirement, AuthzError, CommandAuthorization, authorize};
pub use catalog::{CatalogError, PermissionCatalog, role_names};
pub use claims::{JwtClaims, TokenType, TokenValidationError, validate_claims};
pub use jwt::{Hs256JwtCodec, JwtValidator, TokenIssueError};
pub use password::{Argon2PasswordHasher, PasswordHashError, PasswordHasher};
pub use permissions::Permission;
pub use principal::Principal;
pub use roles::Role;
pub use user::{User, UserCommand, UserEvent, UserStatus};
