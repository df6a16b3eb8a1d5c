//! HS256 token issue/validation behind a small trait.
//!
//! Signature handling lives here so the claims model in [`crate::claims`]
//! stays pure. The API middleware holds an `Arc<dyn JwtValidator>`.

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;

use crate::claims::{JwtClaims, TokenValidationError, validate_claims};

#[derive(Debug, Error)]
pub enum TokenIssueError {
    #[error("failed to encode token: {0}")]
    Encode(String),
}

/// Validates a signed token string into claims.
pub trait JwtValidator: Send + Sync {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, TokenValidationError>;
}

/// HS256 symmetric-key codec: issues and validates tokens with one secret.
pub struct Hs256JwtCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl Hs256JwtCodec {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_ref()),
            decoding: DecodingKey::from_secret(secret.as_ref()),
        }
    }

    pub fn issue(&self, claims: &JwtClaims) -> Result<String, TokenIssueError> {
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| TokenIssueError::Encode(e.to_string()))
    }
}

impl JwtValidator for Hs256JwtCodec {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, TokenValidationError> {
        // Expiry is checked by `validate_claims` against the caller's clock,
        // so the library-level exp check is disabled.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;

        let data = jsonwebtoken::decode::<JwtClaims>(token, &self.decoding, &validation)
            .map_err(|e| TokenValidationError::Malformed(e.to_string()))?;

        validate_claims(&data.claims, now)?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claims::TokenType;
    use crate::roles::Role;
    use chrono::Duration;
    use reqtrack_core::UserId;

    fn access_claims(now: DateTime<Utc>) -> JwtClaims {
        JwtClaims {
            sub: UserId::new(),
            roles: vec![Role::new("hiring_manager")],
            superuser: false,
            token_type: TokenType::Access,
            issued_at: now,
            expires_at: now + Duration::minutes(30),
        }
    }

    #[test]
    fn issue_then_validate_round_trips_claims() {
        let codec = Hs256JwtCodec::new("test-secret");
        let now = Utc::now();
        let claims = access_claims(now);

        let token = codec.issue(&claims).unwrap();
        let decoded = codec.validate(&token, now + Duration::minutes(1)).unwrap();

        assert_eq!(decoded.sub, claims.sub);
        assert_eq!(decoded.roles, claims.roles);
        assert_eq!(decoded.token_type, TokenType::Access);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let codec = Hs256JwtCodec::new("test-secret");
        let other = Hs256JwtCodec::new("other-secret");
        let now = Utc::now();

        let token = codec.issue(&access_claims(now)).unwrap();
        assert!(matches!(
            other.validate(&token, now),
            Err(TokenValidationError::Malformed(_))
        ));
    }

    #[test]
    fn expired_token_is_rejected() {
        let codec = Hs256JwtCodec::new("test-secret");
        let now = Utc::now();

        let token = codec.issue(&access_claims(now)).unwrap();
        assert_eq!(
            codec.validate(&token, now + Duration::hours(1)),
            Err(TokenValidationError::Expired)
        );
    }

    #[test]
    fn garbage_token_is_malformed() {
        let codec = Hs256JwtCodec::new("test-secret");
        assert!(matches!(
            codec.validate("not-a-token", Utc::now()),
            Err(TokenValidationError::Malformed(_))
        ));
    }
}
