use std::sync::Arc;

use axum::{
    Json, Router,
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::{Duration, Utc};

use reqtrack_auth::{JwtClaims, Role, TokenType};
use reqtrack_infra::projections::users::UserReadModel;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::PrincipalContext;

const ACCESS_TOKEN_TTL_MINUTES: i64 = 30;
const REFRESH_TOKEN_TTL_DAYS: i64 = 7;

/// Unauthenticated routes: token issuance.
pub fn public_router() -> Router {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
}

/// Routes behind the auth middleware.
pub fn protected_router() -> Router {
    Router::new().route("/auth/me", get(me))
}

fn claims_for(user: &UserReadModel, token_type: TokenType, ttl: Duration) -> JwtClaims {
    let now = Utc::now();
    JwtClaims {
        sub: user.user_id,
        roles: user.roles.iter().map(|r| Role::new(r.clone())).collect(),
        superuser: user.superuser,
        token_type,
        issued_at: now,
        expires_at: now + ttl,
    }
}

fn token_pair_response(services: &AppServices, user: &UserReadModel) -> axum::response::Response {
    let access = claims_for(
        user,
        TokenType::Access,
        Duration::minutes(ACCESS_TOKEN_TTL_MINUTES),
    );
    let refresh = claims_for(user, TokenType::Refresh, Duration::days(REFRESH_TOKEN_TTL_DAYS));

    let (access_token, refresh_token) =
        match (services.jwt().issue(&access), services.jwt().issue(&refresh)) {
            (Ok(a), Ok(r)) => (a, r),
            _ => {
                return errors::json_error(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "token_issue_failed",
                    "failed to issue tokens",
                );
            }
        };

    (
        StatusCode::OK,
        Json(serde_json::json!({
            "access_token": access_token,
            "refresh_token": refresh_token,
            "token_type": "bearer",
        })),
    )
        .into_response()
}

pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::LoginRequest>,
) -> axum::response::Response {
    // One error shape for unknown email and wrong password: no account
    // enumeration through the login endpoint.
    let invalid = || {
        errors::json_error(
            StatusCode::UNAUTHORIZED,
            "invalid_credentials",
            "invalid email or password",
        )
    };

    let Some(user) = services.users().find_by_email(&body.email) else {
        return invalid();
    };

    match services.passwords().verify(&body.password, &user.password_hash) {
        Ok(true) => {}
        Ok(false) => return invalid(),
        Err(e) => {
            tracing::error!(error = %e, "password verification failed");
            return errors::json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "credential_error",
                "credential verification failed",
            );
        }
    }

    if !user.is_active() {
        return errors::json_error(
            StatusCode::FORBIDDEN,
            "account_inactive",
            "user account is inactive",
        );
    }

    token_pair_response(&services, &user)
}

pub async fn refresh(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::RefreshRequest>,
) -> axum::response::Response {
    let claims = match services.jwt_validator().validate(&body.refresh_token, Utc::now()) {
        Ok(claims) => claims,
        Err(_) => {
            return errors::json_error(
                StatusCode::UNAUTHORIZED,
                "invalid_token",
                "invalid refresh token",
            );
        }
    };

    if claims.expect_type(TokenType::Refresh).is_err() {
        return errors::json_error(
            StatusCode::UNAUTHORIZED,
            "invalid_token",
            "not a refresh token",
        );
    }

    // Roles are re-read from the directory so revocations take effect on the
    // next refresh, not at token expiry.
    let Some(user) = services.users().get(&claims.sub) else {
        return errors::json_error(StatusCode::UNAUTHORIZED, "invalid_token", "unknown subject");
    };

    if !user.is_active() {
        return errors::json_error(
            StatusCode::FORBIDDEN,
            "account_inactive",
            "user account is inactive",
        );
    }

    token_pair_response(&services, &user)
}

pub async fn me(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    match services.users().get(&principal.user_id()) {
        Some(user) => (StatusCode::OK, Json(dto::user_to_json(&user))).into_response(),
        None => errors::json_error(StatusCode::NOT_FOUND, "not_found", "user not found"),
    }
}
