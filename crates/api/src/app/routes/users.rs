use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Utc;

use reqtrack_auth::user::{AssignRole, CreateUser};
use reqtrack_auth::{AccessRequirement, Permission, Role, UserCommand};
use reqtrack_core::UserId;

use crate::app::routes::common::CmdAuth;
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::PrincipalContext;

const PASSWORD_MIN_LENGTH: usize = 8;

pub fn router() -> Router {
    Router::new()
        .route("/users", post(create_user).get(list_users))
        .route("/users/:id/roles", post(assign_role))
}

pub async fn create_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::CreateUserRequest>,
) -> axum::response::Response {
    if body.password.chars().count() < PASSWORD_MIN_LENGTH {
        return errors::json_error(
            StatusCode::BAD_REQUEST,
            "validation_error",
            format!("password must be at least {PASSWORD_MIN_LENGTH} characters long"),
        );
    }

    // Only a superuser may mint another superuser.
    if body.superuser && !principal.superuser() {
        return errors::json_error(
            StatusCode::FORBIDDEN,
            "forbidden",
            "only a superuser can create superusers",
        );
    }

    for role in &body.roles {
        if services.catalog().role(role).is_none() {
            return errors::json_error(
                StatusCode::BAD_REQUEST,
                "unknown_role",
                format!("role '{role}' is not defined"),
            );
        }
    }

    if services.users().find_by_email(&body.email).is_some() {
        return errors::json_error(
            StatusCode::CONFLICT,
            "conflict",
            "a user with this email already exists",
        );
    }

    let password_hash = match services.passwords().hash(&body.password) {
        Ok(hash) => hash,
        Err(e) => {
            tracing::error!(error = %e, "password hashing failed");
            return errors::json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "credential_error",
                "failed to hash password",
            );
        }
    };

    let user_id = UserId::new();
    let cmd = UserCommand::Create(CreateUser {
        user_id,
        email: body.email,
        display_name: body.display_name,
        password_hash,
        initial_roles: body.roles.iter().map(|r| Role::new(r.clone())).collect(),
        superuser: body.superuser,
        occurred_at: Utc::now(),
    });

    let cmd_auth = CmdAuth {
        inner: cmd,
        required: vec![Permission::new("user.create")],
    };
    if let Err(e) = crate::authz::authorize_command(services.catalog(), &principal, &cmd_auth) {
        return errors::json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string());
    }

    match services.dispatch_user(user_id, cmd_auth.inner) {
        Ok(_) => (
            StatusCode::CREATED,
            Json(serde_json::json!({ "id": user_id.to_string() })),
        )
            .into_response(),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

pub async fn list_users(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    if let Err(e) = crate::authz::require(
        services.catalog(),
        &principal,
        &AccessRequirement::permission("user.read"),
    ) {
        return errors::json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string());
    }

    let items = services
        .users()
        .list()
        .iter()
        .map(dto::user_to_json)
        .collect::<Vec<_>>();
    (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
}

pub async fn assign_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::AssignRoleRequest>,
) -> axum::response::Response {
    let user_id: UserId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid user id"),
    };

    if services.catalog().role(&body.role).is_none() {
        return errors::json_error(
            StatusCode::BAD_REQUEST,
            "unknown_role",
            format!("role '{}' is not defined", body.role),
        );
    }

    let cmd = UserCommand::AssignRole(AssignRole {
        user_id,
        role: Role::new(body.role),
        actor_roles: principal.roles().to_vec(),
        actor_superuser: principal.superuser(),
        occurred_at: Utc::now(),
    });

    let cmd_auth = CmdAuth {
        inner: cmd,
        required: vec![Permission::new("user.assign_role")],
    };
    if let Err(e) = crate::authz::authorize_command(services.catalog(), &principal, &cmd_auth) {
        return errors::json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string());
    }

    match services.dispatch_user(user_id, cmd_auth.inner) {
        Ok(_) => (
            StatusCode::OK,
            Json(serde_json::json!({ "id": user_id.to_string() })),
        )
            .into_response(),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}
