use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Utc;

use reqtrack_approvals::{ApprovalDecision, ApprovalId, ApprovalStage};
use reqtrack_auth::catalog::role_names;
use reqtrack_auth::{AccessRequirement, Permission};
use reqtrack_core::{AggregateId, UserId};
use reqtrack_infra::command_dispatcher::DispatchError;
use reqtrack_infra::projections::requirements::RequirementFilter;
use reqtrack_infra::workflow::select_department_head_approver;
use reqtrack_requisitions::{
    Activate, AssignRecruiter, ChangePostingStatus, CreateRequirement, ProfilePatch,
    PublishPosting, RequirementCommand, RequirementId, RequirementProfile, ResolveApproval,
    SoftDelete, Submit, UpdateDraft,
};

use crate::app::routes::common::CmdAuth;
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/requirements", post(create_requirement).get(list_requirements))
        .route(
            "/requirements/:id",
            get(get_requirement)
                .put(update_requirement)
                .delete(delete_requirement),
        )
        .route("/requirements/:id/submit", post(submit_requirement))
        .route("/requirements/:id/approve", post(approve_requirement))
        .route("/requirements/:id/reject", post(reject_requirement))
        .route(
            "/requirements/:id/assign-recruiter/:recruiter_id",
            post(assign_recruiter),
        )
        .route("/requirements/:id/activate", post(activate_requirement))
        .route("/requirements/:id/approvals", get(requirement_approvals))
        .route("/requirements/:id/posting/publish", post(publish_posting))
        .route("/requirements/:id/posting/status", post(change_posting_status))
}

fn parse_requirement_id(id: &str) -> Result<RequirementId, axum::response::Response> {
    id.parse::<AggregateId>()
        .map(RequirementId::new)
        .map_err(|_| {
            errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid requirement id")
        })
}

/// Submission is open to the `hiring_manager` role, and always to the
/// requirement's own hiring manager.
fn is_hiring_manager_for(
    services: &AppServices,
    principal: &PrincipalContext,
    requirement_id: &RequirementId,
) -> bool {
    services
        .requirements()
        .get(requirement_id)
        .is_some_and(|m| m.hiring_manager_id == principal.user_id())
}

pub async fn create_requirement(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(profile): Json<RequirementProfile>,
) -> axum::response::Response {
    if let Err(e) = crate::authz::require(
        services.catalog(),
        &principal,
        &AccessRequirement::role(role_names::HIRING_MANAGER),
    ) {
        return errors::json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string());
    }

    let number = match services.numbers().issue() {
        Ok(number) => number,
        Err(e) => return errors::dispatch_error_to_response(DispatchError::from(e)),
    };

    let agg = AggregateId::new();
    let requirement_id = RequirementId::new(agg);

    let cmd = RequirementCommand::Create(CreateRequirement {
        requirement_id,
        number,
        profile,
        created_by: principal.user_id(),
        hiring_manager_id: principal.user_id(),
        occurred_at: Utc::now(),
    });

    match services.dispatch_requirement(requirement_id, cmd) {
        Ok(_) => (
            StatusCode::CREATED,
            Json(serde_json::json!({
                "id": requirement_id.to_string(),
                "requirement_number": number.to_string(),
                "status": "DRAFT",
            })),
        )
            .into_response(),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

pub async fn list_requirements(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(query): Query<dto::ListQuery>,
) -> axum::response::Response {
    if let Err(e) = crate::authz::require(
        services.catalog(),
        &principal,
        &AccessRequirement::permission("requirement.read"),
    ) {
        return errors::json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string());
    }

    let filter = RequirementFilter {
        status: query.status,
        search: query.search.clone(),
    };
    let all = services.requirements().list(&filter);
    let total = all.len();
    let limit = query.limit();
    let page: Vec<_> = all.into_iter().skip(query.skip).take(limit).collect();

    (
        StatusCode::OK,
        Json(dto::requirement_page_to_json(&page, total, query.skip, limit)),
    )
        .into_response()
}

pub async fn get_requirement(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(e) = crate::authz::require(
        services.catalog(),
        &principal,
        &AccessRequirement::permission("requirement.read"),
    ) {
        return errors::json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string());
    }

    let requirement_id = match parse_requirement_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.requirements().get(&requirement_id) {
        Some(model) => (StatusCode::OK, Json(dto::requirement_to_json(&model))).into_response(),
        None => errors::json_error(StatusCode::NOT_FOUND, "not_found", "requirement not found"),
    }
}

pub async fn update_requirement(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(patch): Json<ProfilePatch>,
) -> axum::response::Response {
    let requirement_id = match parse_requirement_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let cmd = RequirementCommand::UpdateDraft(UpdateDraft {
        requirement_id,
        patch,
        occurred_at: Utc::now(),
    });

    let cmd_auth = CmdAuth {
        inner: cmd,
        required: vec![Permission::new("requirement.update")],
    };
    if let Err(e) = crate::authz::authorize_command(services.catalog(), &principal, &cmd_auth) {
        return errors::json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string());
    }

    match services.dispatch_requirement(requirement_id, cmd_auth.inner) {
        Ok(_) => (
            StatusCode::OK,
            Json(serde_json::json!({ "id": requirement_id.to_string() })),
        )
            .into_response(),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

pub async fn delete_requirement(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(e) = crate::authz::require(
        services.catalog(),
        &principal,
        &AccessRequirement::role(role_names::HIRING_MANAGER),
    ) {
        return errors::json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string());
    }

    let requirement_id = match parse_requirement_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let cmd = RequirementCommand::SoftDelete(SoftDelete {
        requirement_id,
        occurred_at: Utc::now(),
    });

    match services.dispatch_requirement(requirement_id, cmd) {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

pub async fn submit_requirement(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let requirement_id = match parse_requirement_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let has_role = crate::authz::require(
        services.catalog(),
        &principal,
        &AccessRequirement::role(role_names::HIRING_MANAGER),
    )
    .is_ok();
    if !has_role && !is_hiring_manager_for(&services, &principal, &requirement_id) {
        return errors::json_error(
            StatusCode::FORBIDDEN,
            "forbidden",
            "hiring_manager role required",
        );
    }

    // Approver routing happens at the boundary; the aggregate records the
    // designated approver atomically with the status change.
    let approver_id = match select_department_head_approver(&services.users().list()) {
        Ok(approver) => approver,
        Err(e) => return errors::dispatch_error_to_response(DispatchError::from(e)),
    };

    let cmd = RequirementCommand::Submit(Submit {
        requirement_id,
        approval_id: ApprovalId::new(),
        approver_id,
        stage: ApprovalStage::DepartmentHead,
        occurred_at: Utc::now(),
    });

    match services.dispatch_requirement(requirement_id, cmd) {
        Ok(_) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "id": requirement_id.to_string(),
                "status": "SUBMITTED",
                "approver_id": approver_id.to_string(),
            })),
        )
            .into_response(),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

pub async fn approve_requirement(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::ApproveRequest>,
) -> axum::response::Response {
    let requirement_id = match parse_requirement_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    // No role gate: holding a PENDING approval row for this requirement is
    // the authorization, enforced inside the aggregate.
    let cmd = RequirementCommand::ResolveApproval(ResolveApproval {
        requirement_id,
        approver_id: principal.user_id(),
        decision: ApprovalDecision::Approved,
        comments: body.comments,
        occurred_at: Utc::now(),
    });

    match services.dispatch_requirement(requirement_id, cmd) {
        Ok(_) => (
            StatusCode::OK,
            Json(serde_json::json!({ "id": requirement_id.to_string() })),
        )
            .into_response(),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

pub async fn reject_requirement(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::RejectRequest>,
) -> axum::response::Response {
    let requirement_id = match parse_requirement_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let cmd = RequirementCommand::ResolveApproval(ResolveApproval {
        requirement_id,
        approver_id: principal.user_id(),
        decision: ApprovalDecision::Rejected,
        comments: Some(body.comments),
        occurred_at: Utc::now(),
    });

    match services.dispatch_requirement(requirement_id, cmd) {
        Ok(_) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "id": requirement_id.to_string(),
                "status": "REJECTED",
            })),
        )
            .into_response(),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

pub async fn assign_recruiter(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path((id, recruiter_id)): Path<(String, String)>,
) -> axum::response::Response {
    if let Err(e) = crate::authz::require(
        services.catalog(),
        &principal,
        &AccessRequirement::role(role_names::HIRING_MANAGER),
    ) {
        return errors::json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string());
    }

    let requirement_id = match parse_requirement_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let recruiter_id: UserId = match recruiter_id.parse() {
        Ok(v) => v,
        Err(_) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid recruiter id");
        }
    };

    // The target must resolve to an existing, active user.
    match services.users().get(&recruiter_id) {
        Some(user) if user.is_active() => {}
        Some(_) => {
            return errors::json_error(
                StatusCode::UNPROCESSABLE_ENTITY,
                "invariant_violation",
                "recruiter account is inactive",
            );
        }
        None => {
            return errors::json_error(StatusCode::NOT_FOUND, "not_found", "recruiter not found");
        }
    }

    let cmd = RequirementCommand::AssignRecruiter(AssignRecruiter {
        requirement_id,
        recruiter_id,
        occurred_at: Utc::now(),
    });

    match services.dispatch_requirement(requirement_id, cmd) {
        Ok(_) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "id": requirement_id.to_string(),
                "assigned_recruiter_id": recruiter_id.to_string(),
            })),
        )
            .into_response(),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

pub async fn activate_requirement(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let requirement_id = match parse_requirement_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    // Identity check, not a role check: the aggregate verifies the actor is
    // the assigned recruiter.
    let cmd = RequirementCommand::Activate(Activate {
        requirement_id,
        actor_id: principal.user_id(),
        occurred_at: Utc::now(),
    });

    match services.dispatch_requirement(requirement_id, cmd) {
        Ok(_) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "id": requirement_id.to_string(),
                "status": "ACTIVE",
            })),
        )
            .into_response(),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

pub async fn requirement_approvals(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(e) = crate::authz::require(
        services.catalog(),
        &principal,
        &AccessRequirement::permission("requirement.read"),
    ) {
        return errors::json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string());
    }

    let requirement_id = match parse_requirement_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let items = services
        .approvals()
        .history_for_requirement(requirement_id)
        .iter()
        .map(dto::approval_to_json)
        .collect::<Vec<_>>();

    (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
}

pub async fn publish_posting(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let requirement_id = match parse_requirement_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let cmd = RequirementCommand::PublishPosting(PublishPosting {
        requirement_id,
        occurred_at: Utc::now(),
    });

    let cmd_auth = CmdAuth {
        inner: cmd,
        required: vec![Permission::new("job_posting.publish")],
    };
    if let Err(e) = crate::authz::authorize_command(services.catalog(), &principal, &cmd_auth) {
        return errors::json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string());
    }

    match services.dispatch_requirement(requirement_id, cmd_auth.inner) {
        Ok(_) => (
            StatusCode::OK,
            Json(serde_json::json!({ "id": requirement_id.to_string() })),
        )
            .into_response(),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

pub async fn change_posting_status(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::PostingStatusRequest>,
) -> axum::response::Response {
    let requirement_id = match parse_requirement_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let actor_is_admin = principal.superuser() || principal.has_role(role_names::ADMIN);

    let cmd = RequirementCommand::ChangePostingStatus(ChangePostingStatus {
        requirement_id,
        actor_id: principal.user_id(),
        actor_is_admin,
        status: body.status,
        occurred_at: Utc::now(),
    });

    let cmd_auth = CmdAuth {
        inner: cmd,
        required: vec![Permission::new("job_posting.update")],
    };
    if let Err(e) = crate::authz::authorize_command(services.catalog(), &principal, &cmd_auth) {
        return errors::json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string());
    }

    match services.dispatch_requirement(requirement_id, cmd_auth.inner) {
        Ok(_) => (
            StatusCode::OK,
            Json(serde_json::json!({ "id": requirement_id.to_string() })),
        )
            .into_response(),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}
