//! Requirement directory projection.
//!
//! Maintains the queryable requisition list: one row per requirement with
//! its profile, lifecycle status and timestamps. Soft-deleted rows stay in
//! the store (rows are never hard-deleted) but are excluded from every
//! query.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use reqtrack_core::UserId;
use reqtrack_events::EventEnvelope;
use reqtrack_requisitions::{
    Posting, RequirementEvent, RequirementId, RequirementProfile, RequirementStatus,
    requirement::AGGREGATE_TYPE,
};

use crate::read_model::ReadModelStore;

/// Requirement read model for queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequirementReadModel {
    pub requirement_id: RequirementId,
    pub requirement_number: String,
    pub profile: RequirementProfile,
    pub status: RequirementStatus,
    pub created_by: UserId,
    pub hiring_manager_id: UserId,
    pub assigned_recruiter_id: Option<UserId>,
    pub posting: Option<Posting>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub approved_at: Option<DateTime<Utc>>,
    pub assigned_at: Option<DateTime<Utc>>,
}

/// List filters: status plus a title/number substring search.
#[derive(Debug, Clone, Default)]
pub struct RequirementFilter {
    pub status: Option<RequirementStatus>,
    pub search: Option<String>,
}

impl RequirementFilter {
    fn matches(&self, model: &RequirementReadModel) -> bool {
        if let Some(status) = self.status {
            if model.status != status {
                return false;
            }
        }
        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            let in_title = model
                .profile
                .position_title
                .to_lowercase()
                .contains(&needle);
            let in_number = model
                .requirement_number
                .to_lowercase()
                .contains(&needle);
            if !in_title && !in_number {
                return false;
            }
        }
        true
    }
}

/// Projection that maintains the requirement directory.
pub struct RequirementsProjection<S> {
    store: S,
}

impl<S> RequirementsProjection<S>
where
    S: ReadModelStore<RequirementId, RequirementReadModel>,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn apply_envelope(
        &self,
        envelope: &EventEnvelope<serde_json::Value>,
    ) -> Result<(), anyhow::Error> {
        if envelope.aggregate_type() != AGGREGATE_TYPE {
            return Ok(());
        }

        let event: RequirementEvent = serde_json::from_value(envelope.payload().clone())?;

        match event {
            RequirementEvent::Created(e) => {
                let model = RequirementReadModel {
                    requirement_id: e.requirement_id,
                    requirement_number: e.number.to_string(),
                    profile: e.profile,
                    status: RequirementStatus::Draft,
                    created_by: e.created_by,
                    hiring_manager_id: e.hiring_manager_id,
                    assigned_recruiter_id: None,
                    posting: None,
                    deleted_at: None,
                    created_at: e.occurred_at,
                    updated_at: e.occurred_at,
                    submitted_at: None,
                    approved_at: None,
                    assigned_at: None,
                };
                self.store.upsert(e.requirement_id, model);
            }
            other => self.apply_mutation(other),
        }

        Ok(())
    }

    fn apply_mutation(&self, event: RequirementEvent) {
        let requirement_id = match &event {
            RequirementEvent::Created(e) => e.requirement_id,
            RequirementEvent::DraftUpdated(e) => e.requirement_id,
            RequirementEvent::Submitted(e) => e.requirement_id,
            RequirementEvent::ApprovalResolved(e) => e.requirement_id,
            RequirementEvent::Approved(e) => e.requirement_id,
            RequirementEvent::Rejected(e) => e.requirement_id,
            RequirementEvent::RecruiterAssigned(e) => e.requirement_id,
            RequirementEvent::Activated(e) => e.requirement_id,
            RequirementEvent::SoftDeleted(e) => e.requirement_id,
            RequirementEvent::PostingPublished(e) => e.requirement_id,
            RequirementEvent::PostingStatusChanged(e) => e.requirement_id,
        };

        let Some(mut model) = self.store.get(&requirement_id) else {
            return;
        };

        match event {
            RequirementEvent::Created(_) => {}
            RequirementEvent::DraftUpdated(e) => {
                model.profile = e.patch.applied_to(&model.profile);
                model.updated_at = e.occurred_at;
            }
            RequirementEvent::Submitted(e) => {
                model.status = RequirementStatus::Submitted;
                model.submitted_at = Some(e.occurred_at);
                model.updated_at = e.occurred_at;
            }
            RequirementEvent::ApprovalResolved(e) => {
                model.updated_at = e.occurred_at;
            }
            RequirementEvent::Approved(e) => {
                model.status = RequirementStatus::Approved;
                model.approved_at = Some(e.occurred_at);
                model.updated_at = e.occurred_at;
            }
            RequirementEvent::Rejected(e) => {
                model.status = RequirementStatus::Rejected;
                model.updated_at = e.occurred_at;
            }
            RequirementEvent::RecruiterAssigned(e) => {
                model.assigned_recruiter_id = Some(e.recruiter_id);
                model.assigned_at = Some(e.occurred_at);
                model.updated_at = e.occurred_at;
            }
            RequirementEvent::Activated(e) => {
                model.status = RequirementStatus::Active;
                model.updated_at = e.occurred_at;
            }
            RequirementEvent::SoftDeleted(e) => {
                model.deleted_at = Some(e.occurred_at);
                model.updated_at = e.occurred_at;
            }
            RequirementEvent::PostingPublished(e) => {
                model.posting = Some(Posting {
                    status: reqtrack_requisitions::PostingStatus::Active,
                    posted_at: e.occurred_at,
                });
                model.updated_at = e.occurred_at;
            }
            RequirementEvent::PostingStatusChanged(e) => {
                if let Some(posting) = &mut model.posting {
                    posting.status = e.status;
                }
                model.updated_at = e.occurred_at;
            }
        }

        self.store.upsert(requirement_id, model);
    }

    /// Fetch one requirement; soft-deleted rows resolve as absent.
    pub fn get(&self, requirement_id: &RequirementId) -> Option<RequirementReadModel> {
        self.store
            .get(requirement_id)
            .filter(|m| m.deleted_at.is_none())
    }

    /// List requirements matching `filter`, newest first, soft-deleted
    /// excluded.
    pub fn list(&self, filter: &RequirementFilter) -> Vec<RequirementReadModel> {
        let mut items: Vec<_> = self
            .store
            .list()
            .into_iter()
            .filter(|m| m.deleted_at.is_none())
            .filter(|m| filter.matches(m))
            .collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        items
    }
}
