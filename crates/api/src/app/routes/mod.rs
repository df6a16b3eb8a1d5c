use axum::Router;

pub mod approvals;
pub mod auth;
pub mod common;
pub mod requirements;
pub mod system;
pub mod users;

/// Protected route tree (auth middleware is layered on by `app::build_app`).
pub fn router() -> Router {
    Router::new()
        .merge(requirements::router())
        .merge(approvals::router())
        .merge(users::router())
        .merge(auth::protected_router())
}
