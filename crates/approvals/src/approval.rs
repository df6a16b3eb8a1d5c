use chrono::{DateTime, Utc};
use core::str::FromStr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use reqtrack_core::{DomainError, Entity, UserId};

/// Minimum length for rejection comments (approvers must say why).
pub const MIN_REJECTION_COMMENT_LEN: usize = 10;

/// Approval record identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApprovalId(Uuid);

impl ApprovalId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ApprovalId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for ApprovalId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for ApprovalId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let uuid = Uuid::from_str(s)
            .map_err(|e| DomainError::invalid_id(format!("ApprovalId: {e}")))?;
        Ok(Self(uuid))
    }
}

/// Named position in the approval chain.
///
/// Currently a single-step chain; the enum leaves room for further stages
/// (finance, HR head) without a data-model change.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApprovalStage {
    DepartmentHead,
}

impl core::fmt::Display for ApprovalStage {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ApprovalStage::DepartmentHead => write!(f, "DEPARTMENT_HEAD"),
        }
    }
}

/// Decision status of one approval record.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

impl core::fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ApprovalStatus::Pending => write!(f, "PENDING"),
            ApprovalStatus::Approved => write!(f, "APPROVED"),
            ApprovalStatus::Rejected => write!(f, "REJECTED"),
        }
    }
}

/// A reviewer's verdict on a pending approval.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApprovalDecision {
    Approved,
    Rejected,
}

impl ApprovalDecision {
    pub fn as_status(self) -> ApprovalStatus {
        match self {
            ApprovalDecision::Approved => ApprovalStatus::Approved,
            ApprovalDecision::Rejected => ApprovalStatus::Rejected,
        }
    }

    /// Comments are required and length-checked on rejection, optional on
    /// approval.
    pub fn validate_comments(self, comments: Option<&str>) -> Result<(), DomainError> {
        if self == ApprovalDecision::Rejected {
            let len = comments.map(|c| c.trim().chars().count()).unwrap_or(0);
            if len < MIN_REJECTION_COMMENT_LEN {
                return Err(DomainError::validation(format!(
                    "rejection comments must be at least {MIN_REJECTION_COMMENT_LEN} characters"
                )));
            }
        }
        Ok(())
    }
}

/// One pending-or-resolved decision point in a requirement's approval chain.
///
/// Rows are created when the requirement is submitted, mutated exactly once
/// (PENDING → APPROVED/REJECTED) by the designated approver, and never
/// deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Approval {
    pub id: ApprovalId,
    pub approver_id: UserId,
    pub stage: ApprovalStage,
    pub status: ApprovalStatus,
    pub comments: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

impl Approval {
    pub fn pending(
        id: ApprovalId,
        approver_id: UserId,
        stage: ApprovalStage,
        submitted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            approver_id,
            stage,
            status: ApprovalStatus::Pending,
            comments: None,
            submitted_at,
            reviewed_at: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == ApprovalStatus::Pending
    }
}

impl Entity for Approval {
    type Id = ApprovalId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Aggregated outcome of an approval chain.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ChainOutcome {
    /// At least one approval is still pending and nothing has rejected.
    Pending,
    /// Every approval in the chain resolved APPROVED.
    Approved,
    /// At least one approval resolved REJECTED (short-circuits the chain).
    Rejected,
}

/// The ordered approval chain of one requirement.
///
/// The chain lives inside the requirement aggregate, so "was that the last
/// pending approval" is always answered from the same consistent snapshot the
/// resolve mutates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalChain {
    approvals: Vec<Approval>,
}

impl ApprovalChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.approvals.is_empty()
    }

    pub fn len(&self) -> usize {
        self.approvals.len()
    }

    /// Approvals in submission order.
    pub fn approvals(&self) -> &[Approval] {
        &self.approvals
    }

    /// The pending approval designated to `approver_id`, if any.
    ///
    /// At most one exists: `push_pending` refuses a second pending row for
    /// the same approver.
    pub fn pending_for(&self, approver_id: UserId) -> Option<&Approval> {
        self.approvals
            .iter()
            .find(|a| a.is_pending() && a.approver_id == approver_id)
    }

    pub fn get(&self, id: ApprovalId) -> Option<&Approval> {
        self.approvals.iter().find(|a| a.id == id)
    }

    /// Append a new pending approval row.
    pub fn push_pending(
        &mut self,
        id: ApprovalId,
        approver_id: UserId,
        stage: ApprovalStage,
        submitted_at: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        if self.pending_for(approver_id).is_some() {
            return Err(DomainError::invariant(
                "approver already has a pending approval for this requirement",
            ));
        }
        self.approvals
            .push(Approval::pending(id, approver_id, stage, submitted_at));
        Ok(())
    }

    /// Resolve exactly one row; every other row is untouched.
    ///
    /// Infallible given valid event data: callers validate through
    /// [`ApprovalChain::check_resolve`] before emitting the event that drives
    /// this mutation.
    pub fn apply_resolution(
        &mut self,
        id: ApprovalId,
        decision: ApprovalDecision,
        comments: Option<String>,
        reviewed_at: DateTime<Utc>,
    ) {
        if let Some(approval) = self.approvals.iter_mut().find(|a| a.id == id) {
            approval.status = decision.as_status();
            approval.comments = comments;
            approval.reviewed_at = Some(reviewed_at);
        }
    }

    /// Validate a resolve request and return the id of the row it targets.
    ///
    /// Fails with `NotFound` when no pending row matches `(approver, PENDING)`
    /// and with `Validation` when rejection comments are absent or too short.
    /// No approval row is mutated on failure.
    pub fn check_resolve(
        &self,
        approver_id: UserId,
        decision: ApprovalDecision,
        comments: Option<&str>,
    ) -> Result<ApprovalId, DomainError> {
        let approval = self
            .pending_for(approver_id)
            .ok_or(DomainError::NotFound)?;
        decision.validate_comments(comments)?;
        Ok(approval.id)
    }

    /// Current aggregated outcome of the chain.
    pub fn outcome(&self) -> ChainOutcome {
        if self
            .approvals
            .iter()
            .any(|a| a.status == ApprovalStatus::Rejected)
        {
            return ChainOutcome::Rejected;
        }
        if !self.approvals.is_empty() && self.approvals.iter().all(|a| a.status == ApprovalStatus::Approved)
        {
            return ChainOutcome::Approved;
        }
        ChainOutcome::Pending
    }

    /// The outcome the chain would have after resolving `id` with `decision`.
    ///
    /// Used by the decision side of the aggregate to know, within the same
    /// snapshot, whether this resolve is the terminal one.
    pub fn outcome_after(&self, id: ApprovalId, decision: ApprovalDecision) -> ChainOutcome {
        let mut projected = self.clone();
        projected.apply_resolution(id, decision, None, Utc::now());
        projected.outcome()
    }
}
