//! Request/response DTOs and JSON mapping helpers.
//!
//! Requirement create/update bodies deserialize straight into the domain's
//! `RequirementProfile`/`ProfilePatch`; the mappers below shape read models
//! into the flat JSON the frontend expects (password hashes never leave the
//! directory).

use serde::Deserialize;
use serde_json::{Value, json};

use reqtrack_infra::projections::approvals::ApprovalReadModel;
use reqtrack_infra::projections::requirements::RequirementReadModel;
use reqtrack_infra::projections::users::UserReadModel;
use reqtrack_requisitions::{PostingStatus, RequirementStatus};

// ─────────────────────────────────────────────────────────────────────────────
// Requests
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub display_name: String,
    pub password: String,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub superuser: bool,
}

#[derive(Debug, Deserialize)]
pub struct AssignRoleRequest {
    pub role: String,
}

/// Approval comments are optional.
#[derive(Debug, Deserialize)]
pub struct ApproveRequest {
    #[serde(default)]
    pub comments: Option<String>,
}

/// Rejection comments are required (length is validated in the domain).
#[derive(Debug, Deserialize)]
pub struct RejectRequest {
    pub comments: String,
}

#[derive(Debug, Deserialize)]
pub struct PostingStatusRequest {
    pub status: PostingStatus,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub skip: usize,
    pub limit: Option<usize>,
    pub status: Option<RequirementStatus>,
    pub search: Option<String>,
}

impl ListQuery {
    pub fn limit(&self) -> usize {
        self.limit.unwrap_or(50).clamp(1, 100)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Responses
// ─────────────────────────────────────────────────────────────────────────────

pub fn requirement_to_json(model: &RequirementReadModel) -> Value {
    let mut body = serde_json::to_value(&model.profile).unwrap_or_else(|_| json!({}));
    if let Some(obj) = body.as_object_mut() {
        obj.insert("id".into(), json!(model.requirement_id.to_string()));
        obj.insert(
            "requirement_number".into(),
            json!(model.requirement_number),
        );
        obj.insert("status".into(), json!(model.status));
        obj.insert("created_by".into(), json!(model.created_by.to_string()));
        obj.insert(
            "hiring_manager_id".into(),
            json!(model.hiring_manager_id.to_string()),
        );
        obj.insert(
            "assigned_recruiter_id".into(),
            json!(model.assigned_recruiter_id.map(|id| id.to_string())),
        );
        obj.insert(
            "posting_status".into(),
            json!(model.posting.as_ref().map(|p| p.status)),
        );
        obj.insert("is_posted".into(), json!(model.posting.is_some()));
        obj.insert("created_at".into(), json!(model.created_at));
        obj.insert("updated_at".into(), json!(model.updated_at));
        obj.insert("submitted_at".into(), json!(model.submitted_at));
        obj.insert("approved_at".into(), json!(model.approved_at));
        obj.insert("assigned_at".into(), json!(model.assigned_at));
    }
    body
}

pub fn requirement_page_to_json(
    items: &[RequirementReadModel],
    total: usize,
    skip: usize,
    limit: usize,
) -> Value {
    json!({
        "items": items.iter().map(requirement_to_json).collect::<Vec<_>>(),
        "total": total,
        "page": skip / limit + 1,
        "page_size": limit,
        "total_pages": total.div_ceil(limit),
    })
}

pub fn approval_to_json(model: &ApprovalReadModel) -> Value {
    json!({
        "id": model.approval_id.to_string(),
        "requirement_id": model.requirement_id.to_string(),
        "requirement_number": model.requirement_number,
        "position_title": model.position_title,
        "submitted_by": model.submitted_by.to_string(),
        "approver_id": model.approver_id.to_string(),
        "approval_stage": model.stage,
        "status": model.status,
        "comments": model.comments,
        "submitted_at": model.submitted_at,
        "reviewed_at": model.reviewed_at,
    })
}

pub fn user_to_json(model: &UserReadModel) -> Value {
    json!({
        "id": model.user_id.to_string(),
        "email": model.email,
        "display_name": model.display_name,
        "roles": model.roles,
        "superuser": model.superuser,
        "status": model.status,
        "created_at": model.created_at,
        "updated_at": model.updated_at,
    })
}
