//! Approver selection policy for requirement submission.

use reqtrack_auth::catalog::role_names;
use reqtrack_core::{DomainError, UserId};

use crate::projections::users::UserReadModel;

/// Pick the department-head approver for a submission.
///
/// Deterministic: the first active user holding the `admin` or `approver`
/// role, ordered by ascending user id (UUIDv7, so effectively the earliest
/// created account); falling back to the first active superuser. No eligible
/// user at all is a server-side configuration fault: the submission aborts
/// and nothing is committed.
///
/// Routing by organizational hierarchy would replace this policy once the
/// directory models reporting lines.
pub fn select_department_head_approver(users: &[UserReadModel]) -> Result<UserId, DomainError> {
    let mut eligible: Vec<&UserReadModel> = users
        .iter()
        .filter(|u| {
            u.is_active() && (u.has_role(role_names::ADMIN) || u.has_role(role_names::APPROVER))
        })
        .collect();
    eligible.sort_by_key(|u| u.user_id);

    if let Some(user) = eligible.first() {
        return Ok(user.user_id);
    }

    let mut superusers: Vec<&UserReadModel> = users
        .iter()
        .filter(|u| u.is_active() && u.superuser)
        .collect();
    superusers.sort_by_key(|u| u.user_id);

    superusers
        .first()
        .map(|u| u.user_id)
        .ok_or_else(|| DomainError::configuration("no eligible approver found"))
}
