use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use reqtrack_core::UserId;

use crate::Role;

/// Whether a token grants API access or only the right to mint a new
/// access token.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

/// JWT claims model (transport-agnostic).
///
/// This is the minimal set of claims the service expects once a token has
/// been decoded/verified. Timestamps are serialized as numeric `iat`/`exp`
/// seconds so standard JWT tooling understands them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject / user identifier.
    pub sub: UserId,

    /// RBAC roles granted to the subject.
    pub roles: Vec<Role>,

    /// Superuser flag: bypasses all role/permission checks.
    #[serde(default)]
    pub superuser: bool,

    /// Access vs refresh token.
    #[serde(rename = "type")]
    pub token_type: TokenType,

    /// Issued-at timestamp.
    #[serde(rename = "iat", with = "chrono::serde::ts_seconds")]
    pub issued_at: DateTime<Utc>,

    /// Expiration timestamp.
    #[serde(rename = "exp", with = "chrono::serde::ts_seconds")]
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (issued_at is in the future)")]
    NotYetValid,

    #[error("invalid token time window (expires_at <= issued_at)")]
    InvalidTimeWindow,

    #[error("wrong token type (expected {expected:?}, found {found:?})")]
    WrongTokenType {
        expected: TokenType,
        found: TokenType,
    },

    #[error("malformed token: {0}")]
    Malformed(String),
}

/// Deterministically validate JWT claims.
///
/// Note: this validates the *claims* only. Signature verification/decoding is
/// the job of a [`crate::JwtValidator`] implementation.
pub fn validate_claims(claims: &JwtClaims, now: DateTime<Utc>) -> Result<(), TokenValidationError> {
    if claims.expires_at <= claims.issued_at {
        return Err(TokenValidationError::InvalidTimeWindow);
    }
    if now < claims.issued_at {
        return Err(TokenValidationError::NotYetValid);
    }
    if now >= claims.expires_at {
        return Err(TokenValidationError::Expired);
    }
    Ok(())
}

impl JwtClaims {
    /// Require the token to be of a specific type (e.g. access-only routes
    /// must refuse refresh tokens).
    pub fn expect_type(&self, expected: TokenType) -> Result<(), TokenValidationError> {
        if self.token_type == expected {
            Ok(())
        } else {
            Err(TokenValidationError::WrongTokenType {
                expected,
                found: self.token_type,
            })
        }
    }
}
