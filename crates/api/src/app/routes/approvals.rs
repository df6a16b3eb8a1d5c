use std::sync::Arc;

use axum::{Json, Router, extract::Extension, http::StatusCode, response::IntoResponse, routing::get};

use crate::app::services::AppServices;
use crate::app::dto;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new().route("/approvals/pending", get(pending_approvals))
}

/// The caller's pending-approvals inbox, most recent first.
///
/// Any authenticated user may ask; a user who is never designated as an
/// approver simply gets an empty list.
pub async fn pending_approvals(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    let items = services
        .approvals()
        .pending_for_approver(principal.user_id())
        .iter()
        .map(dto::approval_to_json)
        .collect::<Vec<_>>();

    (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
}
