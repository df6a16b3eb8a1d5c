//! Approval ledger projection.
//!
//! Builds the two approval queries the workflow needs: the full approval
//! history of a requirement (submission order) and the pending-approvals
//! inbox of an approver (most recent first). Each row is joined with enough
//! requirement context (number, title, submitter) to render an inbox without
//! a second round trip.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use reqtrack_approvals::{ApprovalDecision, ApprovalId, ApprovalStage, ApprovalStatus};
use reqtrack_core::UserId;
use reqtrack_events::EventEnvelope;
use reqtrack_requisitions::{RequirementEvent, RequirementId, requirement::AGGREGATE_TYPE};

use crate::read_model::ReadModelStore;

/// Approval read model: the ledger row plus requirement context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalReadModel {
    pub approval_id: ApprovalId,
    pub requirement_id: RequirementId,
    pub approver_id: UserId,
    pub stage: ApprovalStage,
    pub status: ApprovalStatus,
    pub comments: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,

    // Joined requirement context for the inbox.
    pub requirement_number: String,
    pub position_title: String,
    pub submitted_by: UserId,
}

#[derive(Debug, Clone)]
struct RequirementSummary {
    number: String,
    title: String,
    hiring_manager_id: UserId,
}

/// Projection that maintains the approval ledger read model.
pub struct ApprovalLedgerProjection<S> {
    store: S,
    summaries: RwLock<HashMap<RequirementId, RequirementSummary>>,
}

impl<S> ApprovalLedgerProjection<S>
where
    S: ReadModelStore<ApprovalId, ApprovalReadModel>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            summaries: RwLock::new(HashMap::new()),
        }
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
                if let Ok(mut summaries) = self.summaries.write() {
                    summaries.insert(
                        e.requirement_id,
                        RequirementSummary {
                            number: e.number.to_string(),
                            title: e.profile.position_title.clone(),
                            hiring_manager_id: e.hiring_manager_id,
                        },
                    );
                }
            }
            RequirementEvent::DraftUpdated(e) => {
                if let Some(title) = e.patch.position_title {
                    if let Ok(mut summaries) = self.summaries.write() {
                        if let Some(summary) = summaries.get_mut(&e.requirement_id) {
                            summary.title = title;
                        }
                    }
                }
            }
            RequirementEvent::Submitted(e) => {
                let summary = match self.summaries.read() {
                    Ok(summaries) => summaries.get(&e.requirement_id).cloned(),
                    Err(_) => None,
                };
                let Some(summary) = summary else {
                    return Ok(());
                };

                self.store.upsert(
                    e.approval_id,
                    ApprovalReadModel {
                        approval_id: e.approval_id,
                        requirement_id: e.requirement_id,
                        approver_id: e.approver_id,
                        stage: e.stage,
                        status: ApprovalStatus::Pending,
                        comments: None,
                        submitted_at: e.occurred_at,
                        reviewed_at: None,
                        requirement_number: summary.number,
                        position_title: summary.title,
                        submitted_by: summary.hiring_manager_id,
                    },
                );
            }
            RequirementEvent::ApprovalResolved(e) => {
                if let Some(mut model) = self.store.get(&e.approval_id) {
                    model.status = match e.decision {
                        ApprovalDecision::Approved => ApprovalStatus::Approved,
                        ApprovalDecision::Rejected => ApprovalStatus::Rejected,
                    };
                    model.comments = e.comments;
                    model.reviewed_at = Some(e.occurred_at);
                    self.store.upsert(e.approval_id, model);
                }
            }
            _ => {}
        }

        Ok(())
    }

    /// Full approval history for a requirement, ordered by submission time.
    pub fn history_for_requirement(&self, requirement_id: RequirementId) -> Vec<ApprovalReadModel> {
        let mut items: Vec<_> = self
            .store
            .list()
            .into_iter()
            .filter(|a| a.requirement_id == requirement_id)
            .collect();
        items.sort_by(|a, b| a.submitted_at.cmp(&b.submitted_at));
        items
    }

    /// The approver's PENDING inbox, most recent first.
    pub fn pending_for_approver(&self, approver_id: UserId) -> Vec<ApprovalReadModel> {
        let mut items: Vec<_> = self
            .store
            .list()
            .into_iter()
            .filter(|a| a.approver_id == approver_id && a.status == ApprovalStatus::Pending)
            .collect();
        items.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
        items
    }
}
