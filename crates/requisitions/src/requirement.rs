use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use reqtrack_approvals::{
    ApprovalChain, ApprovalDecision, ApprovalId, ApprovalStage, ChainOutcome,
};
use reqtrack_core::{
    Aggregate, AggregateId, AggregateRoot, DepartmentId, DomainError, JobLevelId, LocationId,
    UserId, ValueObject,
};
use reqtrack_events::Event;

use crate::number::RequirementNumber;

/// Stream type identifier for requirement aggregates.
pub const AGGREGATE_TYPE: &str = "requisition.requirement";

/// Requirement identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequirementId(pub AggregateId);

impl RequirementId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for RequirementId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Requirement lifecycle status.
///
/// `Rejected` is terminal; `Active` is operationally terminal (closure and
/// fulfillment are downstream concerns).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequirementStatus {
    Draft,
    Submitted,
    Approved,
    Rejected,
    Active,
}

impl core::fmt::Display for RequirementStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            RequirementStatus::Draft => write!(f, "DRAFT"),
            RequirementStatus::Submitted => write!(f, "SUBMITTED"),
            RequirementStatus::Approved => write!(f, "APPROVED"),
            RequirementStatus::Rejected => write!(f, "REJECTED"),
            RequirementStatus::Active => write!(f, "ACTIVE"),
        }
    }
}

/// Why the position exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequirementKind {
    New,
    Replacement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmploymentType {
    FullTime,
    PartTime,
    Contract,
    Internship,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkMode {
    Onsite,
    Remote,
    Hybrid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

/// Offered salary band, in the smallest currency unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompensationRange {
    pub min: u64,
    pub max: u64,
    pub currency: String,
}

impl CompensationRange {
    fn validate(&self) -> Result<(), DomainError> {
        if self.min > self.max {
            return Err(DomainError::validation(
                "minimum salary cannot exceed maximum salary",
            ));
        }
        if self.currency.trim().is_empty() {
            return Err(DomainError::validation("currency cannot be empty"));
        }
        Ok(())
    }
}

impl ValueObject for CompensationRange {}

/// Posting substate of a requirement on the careers surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PostingStatus {
    Active,
    Paused,
    Closed,
}

impl core::fmt::Display for PostingStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            PostingStatus::Active => write!(f, "ACTIVE"),
            PostingStatus::Paused => write!(f, "PAUSED"),
            PostingStatus::Closed => write!(f, "CLOSED"),
        }
    }
}

/// Posting fields; only meaningful once a requirement has been posted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub status: PostingStatus,
    pub posted_at: DateTime<Utc>,
}

/// The descriptive content of a requirement: what the position is, where it
/// sits in the organization, and what it pays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequirementProfile {
    pub position_title: String,
    pub department_id: DepartmentId,
    pub job_level_id: JobLevelId,
    pub location_id: LocationId,
    pub kind: RequirementKind,
    pub employment_type: EmploymentType,
    pub work_mode: WorkMode,
    pub position_count: u32,
    pub priority: Priority,
    pub job_description: String,
    #[serde(default)]
    pub key_responsibilities: Option<String>,
    pub required_qualifications: String,
    #[serde(default)]
    pub preferred_qualifications: Option<String>,
    #[serde(default)]
    pub required_skills: Vec<String>,
    #[serde(default)]
    pub compensation: Option<CompensationRange>,
    #[serde(default)]
    pub target_start_date: Option<NaiveDate>,
    #[serde(default)]
    pub expected_closure_date: Option<NaiveDate>,
    pub justification: String,
}

impl RequirementProfile {
    pub fn validate(&self) -> Result<(), DomainError> {
        let title = self.position_title.trim();
        if title.is_empty() {
            return Err(DomainError::validation("position title cannot be empty"));
        }
        if title.chars().count() > 200 {
            return Err(DomainError::validation(
                "position title cannot exceed 200 characters",
            ));
        }
        if self.position_count == 0 {
            return Err(DomainError::validation("position count must be at least 1"));
        }
        if self.job_description.trim().is_empty() {
            return Err(DomainError::validation("job description cannot be empty"));
        }
        if self.required_qualifications.trim().is_empty() {
            return Err(DomainError::validation(
                "required qualifications cannot be empty",
            ));
        }
        if self.justification.trim().is_empty() {
            return Err(DomainError::validation("justification cannot be empty"));
        }
        if let Some(compensation) = &self.compensation {
            compensation.validate()?;
        }
        Ok(())
    }
}

/// Partial update of a draft's profile fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfilePatch {
    pub position_title: Option<String>,
    pub department_id: Option<DepartmentId>,
    pub job_level_id: Option<JobLevelId>,
    pub location_id: Option<LocationId>,
    pub kind: Option<RequirementKind>,
    pub employment_type: Option<EmploymentType>,
    pub work_mode: Option<WorkMode>,
    pub position_count: Option<u32>,
    pub priority: Option<Priority>,
    pub job_description: Option<String>,
    pub key_responsibilities: Option<String>,
    pub required_qualifications: Option<String>,
    pub preferred_qualifications: Option<String>,
    pub required_skills: Option<Vec<String>>,
    pub compensation: Option<CompensationRange>,
    pub target_start_date: Option<NaiveDate>,
    pub expected_closure_date: Option<NaiveDate>,
    pub justification: Option<String>,
}

impl ProfilePatch {
    pub fn is_empty(&self) -> bool {
        self == &ProfilePatch::default()
    }

    pub fn applied_to(&self, profile: &RequirementProfile) -> RequirementProfile {
        let mut next = profile.clone();
        if let Some(v) = &self.position_title {
            next.position_title = v.clone();
        }
        if let Some(v) = self.department_id {
            next.department_id = v;
        }
        if let Some(v) = self.job_level_id {
            next.job_level_id = v;
        }
        if let Some(v) = self.location_id {
            next.location_id = v;
        }
        if let Some(v) = self.kind {
            next.kind = v;
        }
        if let Some(v) = self.employment_type {
            next.employment_type = v;
        }
        if let Some(v) = self.work_mode {
            next.work_mode = v;
        }
        if let Some(v) = self.position_count {
            next.position_count = v;
        }
        if let Some(v) = self.priority {
            next.priority = v;
        }
        if let Some(v) = &self.job_description {
            next.job_description = v.clone();
        }
        if let Some(v) = &self.key_responsibilities {
            next.key_responsibilities = Some(v.clone());
        }
        if let Some(v) = &self.required_qualifications {
            next.required_qualifications = v.clone();
        }
        if let Some(v) = &self.preferred_qualifications {
            next.preferred_qualifications = Some(v.clone());
        }
        if let Some(v) = &self.required_skills {
            next.required_skills = v.clone();
        }
        if let Some(v) = &self.compensation {
            next.compensation = Some(v.clone());
        }
        if let Some(v) = self.target_start_date {
            next.target_start_date = Some(v);
        }
        if let Some(v) = self.expected_closure_date {
            next.expected_closure_date = Some(v);
        }
        if let Some(v) = &self.justification {
            next.justification = v.clone();
        }
        next
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Aggregate
// ─────────────────────────────────────────────────────────────────────────────

/// Aggregate root: a job requisition moving through the approval workflow.
///
/// # Invariants
/// - `number` is assigned at creation and immutable.
/// - `status` only moves along the legal transition graph.
/// - `assigned_recruiter_id` is set only at status APPROVED or later.
/// - Posting fields exist only once a posting has been published.
/// - A soft-deleted requirement accepts no further commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    id: RequirementId,
    number: Option<RequirementNumber>,
    profile: Option<RequirementProfile>,
    status: RequirementStatus,
    created_by: Option<UserId>,
    hiring_manager_id: Option<UserId>,
    assigned_recruiter_id: Option<UserId>,
    chain: ApprovalChain,
    posting: Option<Posting>,
    deleted_at: Option<DateTime<Utc>>,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
    submitted_at: Option<DateTime<Utc>>,
    approved_at: Option<DateTime<Utc>>,
    assigned_at: Option<DateTime<Utc>>,
    version: u64,
    created: bool,
}

impl Requirement {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: RequirementId) -> Self {
        Self {
            id,
            number: None,
            profile: None,
            status: RequirementStatus::Draft,
            created_by: None,
            hiring_manager_id: None,
            assigned_recruiter_id: None,
            chain: ApprovalChain::new(),
            posting: None,
            deleted_at: None,
            created_at: None,
            updated_at: None,
            submitted_at: None,
            approved_at: None,
            assigned_at: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> RequirementId {
        self.id
    }

    pub fn number(&self) -> Option<RequirementNumber> {
        self.number
    }

    pub fn profile(&self) -> Option<&RequirementProfile> {
        self.profile.as_ref()
    }

    pub fn status(&self) -> RequirementStatus {
        self.status
    }

    pub fn hiring_manager_id(&self) -> Option<UserId> {
        self.hiring_manager_id
    }

    pub fn assigned_recruiter_id(&self) -> Option<UserId> {
        self.assigned_recruiter_id
    }

    pub fn approvals(&self) -> &ApprovalChain {
        &self.chain
    }

    pub fn posting(&self) -> Option<&Posting> {
        self.posting.as_ref()
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn submitted_at(&self) -> Option<DateTime<Utc>> {
        self.submitted_at
    }

    pub fn approved_at(&self) -> Option<DateTime<Utc>> {
        self.approved_at
    }

    pub fn assigned_at(&self) -> Option<DateTime<Utc>> {
        self.assigned_at
    }
}

impl AggregateRoot for Requirement {
    type Id = RequirementId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Commands
// ─────────────────────────────────────────────────────────────────────────────

/// Command: create a new requisition in DRAFT.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateRequirement {
    pub requirement_id: RequirementId,
    pub number: RequirementNumber,
    pub profile: RequirementProfile,
    pub created_by: UserId,
    pub hiring_manager_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: update profile fields while still in DRAFT.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateDraft {
    pub requirement_id: RequirementId,
    pub patch: ProfilePatch,
    pub occurred_at: DateTime<Utc>,
}

/// Command: submit a draft for approval.
///
/// The approver is selected at the boundary (directory policy) and carried
/// here so the decision stays deterministic; the approval row is created in
/// the same atomic append as the status change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submit {
    pub requirement_id: RequirementId,
    pub approval_id: ApprovalId,
    pub approver_id: UserId,
    pub stage: ApprovalStage,
    pub occurred_at: DateTime<Utc>,
}

/// Command: resolve the acting approver's pending approval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolveApproval {
    pub requirement_id: RequirementId,
    pub approver_id: UserId,
    pub decision: ApprovalDecision,
    pub comments: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: hand an approved requisition to a recruiter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignRecruiter {
    pub requirement_id: RequirementId,
    pub recruiter_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: activate an approved requisition into active sourcing.
///
/// Identity-gated: only the assigned recruiter may activate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activate {
    pub requirement_id: RequirementId,
    pub actor_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: soft-delete (rows are never hard-deleted).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoftDelete {
    pub requirement_id: RequirementId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: publish the requisition to the careers surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishPosting {
    pub requirement_id: RequirementId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: pause, reactivate or close a published posting.
///
/// Only the assigned recruiter or an administrator may change posting state;
/// the admin bit is resolved at the boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangePostingStatus {
    pub requirement_id: RequirementId,
    pub actor_id: UserId,
    pub actor_is_admin: bool,
    pub status: PostingStatus,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequirementCommand {
    Create(CreateRequirement),
    UpdateDraft(UpdateDraft),
    Submit(Submit),
    ResolveApproval(ResolveApproval),
    AssignRecruiter(AssignRecruiter),
    Activate(Activate),
    SoftDelete(SoftDelete),
    PublishPosting(PublishPosting),
    ChangePostingStatus(ChangePostingStatus),
}

// ─────────────────────────────────────────────────────────────────────────────
// Events
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequirementCreated {
    pub requirement_id: RequirementId,
    pub number: RequirementNumber,
    pub profile: RequirementProfile,
    pub created_by: UserId,
    pub hiring_manager_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftUpdated {
    pub requirement_id: RequirementId,
    pub patch: ProfilePatch,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequirementSubmitted {
    pub requirement_id: RequirementId,
    pub approval_id: ApprovalId,
    pub approver_id: UserId,
    pub stage: ApprovalStage,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalResolved {
    pub requirement_id: RequirementId,
    pub approval_id: ApprovalId,
    pub approver_id: UserId,
    pub decision: ApprovalDecision,
    pub comments: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequirementApproved {
    pub requirement_id: RequirementId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequirementRejected {
    pub requirement_id: RequirementId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecruiterAssigned {
    pub requirement_id: RequirementId,
    pub recruiter_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequirementActivated {
    pub requirement_id: RequirementId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequirementSoftDeleted {
    pub requirement_id: RequirementId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostingPublished {
    pub requirement_id: RequirementId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostingStatusChanged {
    pub requirement_id: RequirementId,
    pub status: PostingStatus,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequirementEvent {
    Created(RequirementCreated),
    DraftUpdated(DraftUpdated),
    Submitted(RequirementSubmitted),
    ApprovalResolved(ApprovalResolved),
    Approved(RequirementApproved),
    Rejected(RequirementRejected),
    RecruiterAssigned(RecruiterAssigned),
    Activated(RequirementActivated),
    SoftDeleted(RequirementSoftDeleted),
    PostingPublished(PostingPublished),
    PostingStatusChanged(PostingStatusChanged),
}

impl Event for RequirementEvent {
    fn event_type(&self) -> &'static str {
        match self {
            RequirementEvent::Created(_) => "requirement.created",
            RequirementEvent::DraftUpdated(_) => "requirement.draft_updated",
            RequirementEvent::Submitted(_) => "requirement.submitted",
            RequirementEvent::ApprovalResolved(_) => "requirement.approval_resolved",
            RequirementEvent::Approved(_) => "requirement.approved",
            RequirementEvent::Rejected(_) => "requirement.rejected",
            RequirementEvent::RecruiterAssigned(_) => "requirement.recruiter_assigned",
            RequirementEvent::Activated(_) => "requirement.activated",
            RequirementEvent::SoftDeleted(_) => "requirement.soft_deleted",
            RequirementEvent::PostingPublished(_) => "requirement.posting_published",
            RequirementEvent::PostingStatusChanged(_) => "requirement.posting_status_changed",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            RequirementEvent::Created(e) => e.occurred_at,
            RequirementEvent::DraftUpdated(e) => e.occurred_at,
            RequirementEvent::Submitted(e) => e.occurred_at,
            RequirementEvent::ApprovalResolved(e) => e.occurred_at,
            RequirementEvent::Approved(e) => e.occurred_at,
            RequirementEvent::Rejected(e) => e.occurred_at,
            RequirementEvent::RecruiterAssigned(e) => e.occurred_at,
            RequirementEvent::Activated(e) => e.occurred_at,
            RequirementEvent::SoftDeleted(e) => e.occurred_at,
            RequirementEvent::PostingPublished(e) => e.occurred_at,
            RequirementEvent::PostingStatusChanged(e) => e.occurred_at,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Aggregate Implementation
// ─────────────────────────────────────────────────────────────────────────────

impl Aggregate for Requirement {
    type Command = RequirementCommand;
    type Event = RequirementEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            RequirementEvent::Created(e) => self.apply_created(e),
            RequirementEvent::DraftUpdated(e) => {
                if let Some(profile) = &self.profile {
                    self.profile = Some(e.patch.applied_to(profile));
                }
                self.updated_at = Some(e.occurred_at);
            }
            RequirementEvent::Submitted(e) => {
                // Validated at decision time; a second pending row for the
                // same approver cannot occur in a committed stream.
                let _ = self
                    .chain
                    .push_pending(e.approval_id, e.approver_id, e.stage, e.occurred_at);
                self.status = RequirementStatus::Submitted;
                self.submitted_at = Some(e.occurred_at);
                self.updated_at = Some(e.occurred_at);
            }
            RequirementEvent::ApprovalResolved(e) => {
                self.chain.apply_resolution(
                    e.approval_id,
                    e.decision,
                    e.comments.clone(),
                    e.occurred_at,
                );
                self.updated_at = Some(e.occurred_at);
            }
            RequirementEvent::Approved(e) => {
                self.status = RequirementStatus::Approved;
                self.approved_at = Some(e.occurred_at);
                self.updated_at = Some(e.occurred_at);
            }
            RequirementEvent::Rejected(e) => {
                self.status = RequirementStatus::Rejected;
                self.updated_at = Some(e.occurred_at);
            }
            RequirementEvent::RecruiterAssigned(e) => {
                self.assigned_recruiter_id = Some(e.recruiter_id);
                self.assigned_at = Some(e.occurred_at);
                self.updated_at = Some(e.occurred_at);
            }
            RequirementEvent::Activated(e) => {
                self.status = RequirementStatus::Active;
                self.updated_at = Some(e.occurred_at);
            }
            RequirementEvent::SoftDeleted(e) => {
                self.deleted_at = Some(e.occurred_at);
                self.updated_at = Some(e.occurred_at);
            }
            RequirementEvent::PostingPublished(e) => {
                self.posting = Some(Posting {
                    status: PostingStatus::Active,
                    posted_at: e.occurred_at,
                });
                self.updated_at = Some(e.occurred_at);
            }
            RequirementEvent::PostingStatusChanged(e) => {
                if let Some(posting) = &mut self.posting {
                    posting.status = e.status;
                }
                self.updated_at = Some(e.occurred_at);
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            RequirementCommand::Create(cmd) => self.handle_create(cmd),
            RequirementCommand::UpdateDraft(cmd) => self.handle_update_draft(cmd),
            RequirementCommand::Submit(cmd) => self.handle_submit(cmd),
            RequirementCommand::ResolveApproval(cmd) => self.handle_resolve(cmd),
            RequirementCommand::AssignRecruiter(cmd) => self.handle_assign_recruiter(cmd),
            RequirementCommand::Activate(cmd) => self.handle_activate(cmd),
            RequirementCommand::SoftDelete(cmd) => self.handle_soft_delete(cmd),
            RequirementCommand::PublishPosting(cmd) => self.handle_publish_posting(cmd),
            RequirementCommand::ChangePostingStatus(cmd) => self.handle_change_posting(cmd),
        }
    }
}

impl Requirement {
    fn ensure_exists(&self) -> Result<(), DomainError> {
        if !self.created || self.deleted_at.is_some() {
            return Err(DomainError::not_found());
        }
        Ok(())
    }

    fn ensure_requirement_id(&self, requirement_id: RequirementId) -> Result<(), DomainError> {
        if self.id != requirement_id {
            return Err(DomainError::invariant("requirement_id mismatch"));
        }
        Ok(())
    }

    fn handle_create(&self, cmd: &CreateRequirement) -> Result<Vec<RequirementEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("requirement already exists"));
        }

        cmd.profile.validate()?;

        Ok(vec![RequirementEvent::Created(RequirementCreated {
            requirement_id: cmd.requirement_id,
            number: cmd.number,
            profile: cmd.profile.clone(),
            created_by: cmd.created_by,
            hiring_manager_id: cmd.hiring_manager_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update_draft(&self, cmd: &UpdateDraft) -> Result<Vec<RequirementEvent>, DomainError> {
        self.ensure_exists()?;
        self.ensure_requirement_id(cmd.requirement_id)?;

        if self.status != RequirementStatus::Draft {
            return Err(DomainError::invalid_transition("update requirement", self.status));
        }

        if cmd.patch.is_empty() {
            return Err(DomainError::validation("update contains no fields"));
        }

        let profile = self
            .profile
            .as_ref()
            .ok_or_else(|| DomainError::invariant("requirement has no profile"))?;
        cmd.patch.applied_to(profile).validate()?;

        Ok(vec![RequirementEvent::DraftUpdated(DraftUpdated {
            requirement_id: cmd.requirement_id,
            patch: cmd.patch.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_submit(&self, cmd: &Submit) -> Result<Vec<RequirementEvent>, DomainError> {
        self.ensure_exists()?;
        self.ensure_requirement_id(cmd.requirement_id)?;

        if self.status != RequirementStatus::Draft {
            return Err(DomainError::invalid_transition("submit requirement", self.status));
        }

        Ok(vec![RequirementEvent::Submitted(RequirementSubmitted {
            requirement_id: cmd.requirement_id,
            approval_id: cmd.approval_id,
            approver_id: cmd.approver_id,
            stage: cmd.stage,
            occurred_at: cmd.occurred_at,
        })])
    }

    /// Resolve the acting approver's pending approval.
    ///
    /// The terminal decision ("was that the last pending approval" / "did
    /// anything reject") is read from the same aggregate snapshot this
    /// command was loaded against, and both events commit in one append, so
    /// racing resolvers cannot both conclude they were last.
    fn handle_resolve(&self, cmd: &ResolveApproval) -> Result<Vec<RequirementEvent>, DomainError> {
        self.ensure_exists()?;
        self.ensure_requirement_id(cmd.requirement_id)?;

        if self.status != RequirementStatus::Submitted {
            let event = match cmd.decision {
                ApprovalDecision::Approved => "approve requirement",
                ApprovalDecision::Rejected => "reject requirement",
            };
            return Err(DomainError::invalid_transition(event, self.status));
        }

        // Acting without a qualifying pending approval is an authorization
        // failure at the state-machine boundary, not a lookup miss.
        let approval_id = self
            .chain
            .check_resolve(cmd.approver_id, cmd.decision, cmd.comments.as_deref())
            .map_err(|err| match err {
                DomainError::NotFound => DomainError::Unauthorized,
                other => other,
            })?;

        let mut events = vec![RequirementEvent::ApprovalResolved(ApprovalResolved {
            requirement_id: cmd.requirement_id,
            approval_id,
            approver_id: cmd.approver_id,
            decision: cmd.decision,
            comments: cmd.comments.clone(),
            occurred_at: cmd.occurred_at,
        })];

        match self.chain.outcome_after(approval_id, cmd.decision) {
            ChainOutcome::Approved => {
                events.push(RequirementEvent::Approved(RequirementApproved {
                    requirement_id: cmd.requirement_id,
                    occurred_at: cmd.occurred_at,
                }));
            }
            ChainOutcome::Rejected => {
                events.push(RequirementEvent::Rejected(RequirementRejected {
                    requirement_id: cmd.requirement_id,
                    occurred_at: cmd.occurred_at,
                }));
            }
            ChainOutcome::Pending => {}
        }

        Ok(events)
    }

    fn handle_assign_recruiter(
        &self,
        cmd: &AssignRecruiter,
    ) -> Result<Vec<RequirementEvent>, DomainError> {
        self.ensure_exists()?;
        self.ensure_requirement_id(cmd.requirement_id)?;

        if self.status != RequirementStatus::Approved {
            return Err(DomainError::invalid_transition("assign recruiter", self.status));
        }

        Ok(vec![RequirementEvent::RecruiterAssigned(RecruiterAssigned {
            requirement_id: cmd.requirement_id,
            recruiter_id: cmd.recruiter_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_activate(&self, cmd: &Activate) -> Result<Vec<RequirementEvent>, DomainError> {
        self.ensure_exists()?;
        self.ensure_requirement_id(cmd.requirement_id)?;

        if self.status != RequirementStatus::Approved {
            return Err(DomainError::invalid_transition("activate requirement", self.status));
        }

        let assigned = self
            .assigned_recruiter_id
            .ok_or_else(|| DomainError::invariant("no recruiter assigned"))?;

        // Identity check, not a role check: holding the recruiter role is not
        // enough, the actor must be the assignee.
        if cmd.actor_id != assigned {
            return Err(DomainError::Unauthorized);
        }

        Ok(vec![RequirementEvent::Activated(RequirementActivated {
            requirement_id: cmd.requirement_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_soft_delete(&self, cmd: &SoftDelete) -> Result<Vec<RequirementEvent>, DomainError> {
        self.ensure_exists()?;
        self.ensure_requirement_id(cmd.requirement_id)?;

        if matches!(
            self.status,
            RequirementStatus::Rejected | RequirementStatus::Active
        ) {
            return Err(DomainError::invalid_transition("delete requirement", self.status));
        }

        Ok(vec![RequirementEvent::SoftDeleted(RequirementSoftDeleted {
            requirement_id: cmd.requirement_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_publish_posting(
        &self,
        cmd: &PublishPosting,
    ) -> Result<Vec<RequirementEvent>, DomainError> {
        self.ensure_exists()?;
        self.ensure_requirement_id(cmd.requirement_id)?;

        if !matches!(
            self.status,
            RequirementStatus::Approved | RequirementStatus::Active
        ) {
            return Err(DomainError::invalid_transition("publish posting", self.status));
        }

        if self.posting.is_some() {
            return Err(DomainError::invariant("posting already published"));
        }

        Ok(vec![RequirementEvent::PostingPublished(PostingPublished {
            requirement_id: cmd.requirement_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_change_posting(
        &self,
        cmd: &ChangePostingStatus,
    ) -> Result<Vec<RequirementEvent>, DomainError> {
        self.ensure_exists()?;
        self.ensure_requirement_id(cmd.requirement_id)?;

        let posting = self
            .posting
            .as_ref()
            .ok_or_else(|| DomainError::invariant("requirement has no posting"))?;

        if posting.status == PostingStatus::Closed {
            return Err(DomainError::invariant("posting is closed"));
        }

        let is_assigned_recruiter = self.assigned_recruiter_id == Some(cmd.actor_id);
        if !cmd.actor_is_admin && !is_assigned_recruiter {
            return Err(DomainError::Unauthorized);
        }

        Ok(vec![RequirementEvent::PostingStatusChanged(
            PostingStatusChanged {
                requirement_id: cmd.requirement_id,
                status: cmd.status,
                occurred_at: cmd.occurred_at,
            },
        )])
    }

    fn apply_created(&mut self, e: &RequirementCreated) {
        self.id = e.requirement_id;
        self.number = Some(e.number);
        self.profile = Some(e.profile.clone());
        self.status = RequirementStatus::Draft;
        self.created_by = Some(e.created_by);
        self.hiring_manager_id = Some(e.hiring_manager_id);
        self.created_at = Some(e.occurred_at);
        self.updated_at = Some(e.occurred_at);
        self.created = true;
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use reqtrack_events::execute;

    fn test_requirement_id() -> RequirementId {
        RequirementId::new(AggregateId::new())
    }

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn test_profile() -> RequirementProfile {
        RequirementProfile {
            position_title: "Senior Backend Engineer".to_string(),
            department_id: DepartmentId::new(),
            job_level_id: JobLevelId::new(),
            location_id: LocationId::new(),
            kind: RequirementKind::New,
            employment_type: EmploymentType::FullTime,
            work_mode: WorkMode::Hybrid,
            position_count: 2,
            priority: Priority::High,
            job_description: "Own the requisition platform backend.".to_string(),
            key_responsibilities: Some("Design, build, operate.".to_string()),
            required_qualifications: "5+ years building distributed systems.".to_string(),
            preferred_qualifications: None,
            required_skills: vec!["rust".to_string(), "postgres".to_string()],
            compensation: Some(CompensationRange {
                min: 14_000_000,
                max: 18_000_000,
                currency: "USD".to_string(),
            }),
            target_start_date: None,
            expected_closure_date: None,
            justification: "Team is under-staffed for the roadmap.".to_string(),
        }
    }

    fn create_cmd(id: RequirementId, hiring_manager: UserId) -> RequirementCommand {
        RequirementCommand::Create(CreateRequirement {
            requirement_id: id,
            number: RequirementNumber::new(1).unwrap(),
            profile: test_profile(),
            created_by: hiring_manager,
            hiring_manager_id: hiring_manager,
            occurred_at: test_time(),
        })
    }

    fn drafted(hiring_manager: UserId) -> Requirement {
        let id = test_requirement_id();
        let mut requirement = Requirement::empty(id);
        execute(&mut requirement, &create_cmd(id, hiring_manager)).unwrap();
        requirement
    }

    fn submitted(hiring_manager: UserId, approver: UserId) -> Requirement {
        let mut requirement = drafted(hiring_manager);
        let requirement_id = requirement.id_typed();
        execute(
            &mut requirement,
            &RequirementCommand::Submit(Submit {
                requirement_id,
                approval_id: ApprovalId::new(),
                approver_id: approver,
                stage: ApprovalStage::DepartmentHead,
                occurred_at: test_time(),
            }),
        )
        .unwrap();
        requirement
    }

    fn approved(hiring_manager: UserId, approver: UserId) -> Requirement {
        let mut requirement = submitted(hiring_manager, approver);
        let requirement_id = requirement.id_typed();
        execute(
            &mut requirement,
            &RequirementCommand::ResolveApproval(ResolveApproval {
                requirement_id,
                approver_id: approver,
                decision: ApprovalDecision::Approved,
                comments: Some("Looks good".to_string()),
                occurred_at: test_time(),
            }),
        )
        .unwrap();
        requirement
    }

    #[test]
    fn create_starts_in_draft_with_number() {
        let requirement = drafted(UserId::new());

        assert_eq!(requirement.status(), RequirementStatus::Draft);
        assert_eq!(requirement.number().unwrap().to_string(), "REQ-00001");
        assert!(requirement.approvals().is_empty());
        assert!(requirement.submitted_at().is_none());
    }

    #[test]
    fn create_twice_conflicts() {
        let hiring_manager = UserId::new();
        let requirement = drafted(hiring_manager);

        let result = requirement.handle(&create_cmd(requirement.id_typed(), hiring_manager));
        assert!(matches!(result, Err(DomainError::Conflict(_))));
    }

    #[test]
    fn create_with_invalid_compensation_fails() {
        let id = test_requirement_id();
        let requirement = Requirement::empty(id);

        let mut profile = test_profile();
        profile.compensation = Some(CompensationRange {
            min: 10,
            max: 1,
            currency: "USD".to_string(),
        });

        let result = requirement.handle(&RequirementCommand::Create(CreateRequirement {
            requirement_id: id,
            number: RequirementNumber::new(1).unwrap(),
            profile,
            created_by: UserId::new(),
            hiring_manager_id: UserId::new(),
            occurred_at: test_time(),
        }));

        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[test]
    fn draft_update_changes_profile() {
        let mut requirement = drafted(UserId::new());

        let requirement_id = requirement.id_typed();
        execute(
            &mut requirement,
            &RequirementCommand::UpdateDraft(UpdateDraft {
                requirement_id,
                patch: ProfilePatch {
                    position_title: Some("Staff Backend Engineer".to_string()),
                    priority: Some(Priority::Urgent),
                    ..Default::default()
                },
                occurred_at: test_time(),
            }),
        )
        .unwrap();

        let profile = requirement.profile().unwrap();
        assert_eq!(profile.position_title, "Staff Backend Engineer");
        assert_eq!(profile.priority, Priority::Urgent);
        // Untouched fields survive the patch.
        assert_eq!(profile.position_count, 2);
    }

    #[test]
    fn update_after_submit_is_invalid_transition() {
        let requirement = submitted(UserId::new(), UserId::new());

        let result = requirement.handle(&RequirementCommand::UpdateDraft(UpdateDraft {
            requirement_id: requirement.id_typed(),
            patch: ProfilePatch {
                priority: Some(Priority::Low),
                ..Default::default()
            },
            occurred_at: test_time(),
        }));

        assert!(matches!(result, Err(DomainError::InvalidTransition(_))));
    }

    #[test]
    fn submit_creates_pending_approval_and_stamps_time() {
        let approver = UserId::new();
        let requirement = submitted(UserId::new(), approver);

        assert_eq!(requirement.status(), RequirementStatus::Submitted);
        assert!(requirement.submitted_at().is_some());
        assert_eq!(requirement.approvals().len(), 1);

        let approval = requirement.approvals().pending_for(approver).unwrap();
        assert_eq!(approval.stage, ApprovalStage::DepartmentHead);
        assert_eq!(approval.status, reqtrack_approvals::ApprovalStatus::Pending);
    }

    #[test]
    fn submit_twice_names_current_status() {
        let requirement = submitted(UserId::new(), UserId::new());

        let result = requirement.handle(&RequirementCommand::Submit(Submit {
            requirement_id: requirement.id_typed(),
            approval_id: ApprovalId::new(),
            approver_id: UserId::new(),
            stage: ApprovalStage::DepartmentHead,
            occurred_at: test_time(),
        }));

        let err = result.unwrap_err();
        assert!(matches!(err, DomainError::InvalidTransition(_)));
        assert!(err.to_string().contains("SUBMITTED"));
    }

    #[test]
    fn approving_last_pending_advances_to_approved() {
        let approver = UserId::new();
        let requirement = approved(UserId::new(), approver);

        assert_eq!(requirement.status(), RequirementStatus::Approved);
        assert!(requirement.approved_at().is_some());

        let approval = &requirement.approvals().approvals()[0];
        assert_eq!(approval.status, reqtrack_approvals::ApprovalStatus::Approved);
        assert_eq!(approval.comments.as_deref(), Some("Looks good"));
        assert!(approval.reviewed_at.is_some());
    }

    #[test]
    fn approve_without_pending_approval_is_unauthorized() {
        let requirement = submitted(UserId::new(), UserId::new());

        let result = requirement.handle(&RequirementCommand::ResolveApproval(ResolveApproval {
            requirement_id: requirement.id_typed(),
            approver_id: UserId::new(),
            decision: ApprovalDecision::Approved,
            comments: None,
            occurred_at: test_time(),
        }));

        assert_eq!(result.unwrap_err(), DomainError::Unauthorized);
    }

    #[test]
    fn approve_in_draft_is_invalid_transition() {
        let requirement = drafted(UserId::new());

        let result = requirement.handle(&RequirementCommand::ResolveApproval(ResolveApproval {
            requirement_id: requirement.id_typed(),
            approver_id: UserId::new(),
            decision: ApprovalDecision::Approved,
            comments: None,
            occurred_at: test_time(),
        }));

        assert!(matches!(result, Err(DomainError::InvalidTransition(_))));
    }

    #[test]
    fn rejection_requires_substantive_comments() {
        let approver = UserId::new();
        let requirement = submitted(UserId::new(), approver);

        let result = requirement.handle(&RequirementCommand::ResolveApproval(ResolveApproval {
            requirement_id: requirement.id_typed(),
            approver_id: approver,
            decision: ApprovalDecision::Rejected,
            comments: Some("too bad".to_string()),
            occurred_at: test_time(),
        }));

        assert!(matches!(result, Err(DomainError::Validation(_))));
        // Nothing was emitted, so the approval row is still pending.
        assert!(requirement.approvals().pending_for(approver).is_some());
    }

    #[test]
    fn rejection_moves_to_rejected_without_approved_at() {
        let approver = UserId::new();
        let mut requirement = submitted(UserId::new(), approver);

        let requirement_id = requirement.id_typed();
        execute(
            &mut requirement,
            &RequirementCommand::ResolveApproval(ResolveApproval {
                requirement_id,
                approver_id: approver,
                decision: ApprovalDecision::Rejected,
                comments: Some("Budget not available this quarter".to_string()),
                occurred_at: test_time(),
            }),
        )
        .unwrap();

        assert_eq!(requirement.status(), RequirementStatus::Rejected);
        assert!(requirement.approved_at().is_none());
        assert_eq!(
            requirement.approvals().approvals()[0].status,
            reqtrack_approvals::ApprovalStatus::Rejected
        );
    }

    #[test]
    fn rejection_short_circuits_and_leaves_sibling_pending() {
        // A two-approver chain models a future multi-stage workflow; the
        // stream is built directly from events since a single submit only
        // designates one approver today.
        let first = UserId::new();
        let second = UserId::new();
        let id = test_requirement_id();
        let hiring_manager = UserId::new();

        let mut requirement = Requirement::empty(id);
        execute(&mut requirement, &create_cmd(id, hiring_manager)).unwrap();
        for approver in [first, second] {
            requirement.apply(&RequirementEvent::Submitted(RequirementSubmitted {
                requirement_id: id,
                approval_id: ApprovalId::new(),
                approver_id: approver,
                stage: ApprovalStage::DepartmentHead,
                occurred_at: test_time(),
            }));
        }
        assert_eq!(requirement.approvals().len(), 2);

        execute(
            &mut requirement,
            &RequirementCommand::ResolveApproval(ResolveApproval {
                requirement_id: id,
                approver_id: first,
                decision: ApprovalDecision::Rejected,
                comments: Some("Budget not available this quarter".to_string()),
                occurred_at: test_time(),
            }),
        )
        .unwrap();

        assert_eq!(requirement.status(), RequirementStatus::Rejected);
        // The sibling approval is left PENDING, not auto-cancelled.
        assert!(requirement.approvals().pending_for(second).is_some());
    }

    #[test]
    fn partial_approval_of_multi_approver_chain_stays_submitted() {
        let first = UserId::new();
        let second = UserId::new();
        let id = test_requirement_id();

        let mut requirement = Requirement::empty(id);
        execute(&mut requirement, &create_cmd(id, UserId::new())).unwrap();
        for approver in [first, second] {
            requirement.apply(&RequirementEvent::Submitted(RequirementSubmitted {
                requirement_id: id,
                approval_id: ApprovalId::new(),
                approver_id: approver,
                stage: ApprovalStage::DepartmentHead,
                occurred_at: test_time(),
            }));
        }

        let events = execute(
            &mut requirement,
            &RequirementCommand::ResolveApproval(ResolveApproval {
                requirement_id: id,
                approver_id: first,
                decision: ApprovalDecision::Approved,
                comments: None,
                occurred_at: test_time(),
            }),
        )
        .unwrap();

        // Only the resolution event; no terminal transition yet.
        assert_eq!(events.len(), 1);
        assert_eq!(requirement.status(), RequirementStatus::Submitted);
        assert!(requirement.approved_at().is_none());

        execute(
            &mut requirement,
            &RequirementCommand::ResolveApproval(ResolveApproval {
                requirement_id: id,
                approver_id: second,
                decision: ApprovalDecision::Approved,
                comments: None,
                occurred_at: test_time(),
            }),
        )
        .unwrap();

        assert_eq!(requirement.status(), RequirementStatus::Approved);
    }

    #[test]
    fn assign_recruiter_requires_approved() {
        let requirement = submitted(UserId::new(), UserId::new());

        let result = requirement.handle(&RequirementCommand::AssignRecruiter(AssignRecruiter {
            requirement_id: requirement.id_typed(),
            recruiter_id: UserId::new(),
            occurred_at: test_time(),
        }));

        assert!(matches!(result, Err(DomainError::InvalidTransition(_))));
    }

    #[test]
    fn assign_recruiter_keeps_status_and_stamps_assignment() {
        let mut requirement = approved(UserId::new(), UserId::new());
        let recruiter = UserId::new();

        let requirement_id = requirement.id_typed();
        execute(
            &mut requirement,
            &RequirementCommand::AssignRecruiter(AssignRecruiter {
                requirement_id,
                recruiter_id: recruiter,
                occurred_at: test_time(),
            }),
        )
        .unwrap();

        assert_eq!(requirement.status(), RequirementStatus::Approved);
        assert_eq!(requirement.assigned_recruiter_id(), Some(recruiter));
        assert!(requirement.assigned_at().is_some());
    }

    #[test]
    fn activation_is_identity_gated() {
        let mut requirement = approved(UserId::new(), UserId::new());
        let assigned = UserId::new();
        let other_recruiter = UserId::new();
        let requirement_id = requirement.id_typed();

        execute(
            &mut requirement,
            &RequirementCommand::AssignRecruiter(AssignRecruiter {
                requirement_id,
                recruiter_id: assigned,
                occurred_at: test_time(),
            }),
        )
        .unwrap();

        // Holding the recruiter role elsewhere does not help: wrong identity.
        let result = requirement.handle(&RequirementCommand::Activate(Activate {
            requirement_id: requirement.id_typed(),
            actor_id: other_recruiter,
            occurred_at: test_time(),
        }));
        assert_eq!(result.unwrap_err(), DomainError::Unauthorized);

        execute(
            &mut requirement,
            &RequirementCommand::Activate(Activate {
                requirement_id,
                actor_id: assigned,
                occurred_at: test_time(),
            }),
        )
        .unwrap();
        assert_eq!(requirement.status(), RequirementStatus::Active);
    }

    #[test]
    fn activation_without_assignment_fails() {
        let requirement = approved(UserId::new(), UserId::new());

        let result = requirement.handle(&RequirementCommand::Activate(Activate {
            requirement_id: requirement.id_typed(),
            actor_id: UserId::new(),
            occurred_at: test_time(),
        }));

        assert!(matches!(result, Err(DomainError::InvariantViolation(_))));
    }

    #[test]
    fn soft_delete_excludes_from_further_commands() {
        let mut requirement = drafted(UserId::new());

        let requirement_id = requirement.id_typed();
        execute(
            &mut requirement,
            &RequirementCommand::SoftDelete(SoftDelete {
                requirement_id,
                occurred_at: test_time(),
            }),
        )
        .unwrap();

        assert!(requirement.is_deleted());
        // Status is unchanged; the row is simply invisible.
        assert_eq!(requirement.status(), RequirementStatus::Draft);

        let result = requirement.handle(&RequirementCommand::Submit(Submit {
            requirement_id: requirement.id_typed(),
            approval_id: ApprovalId::new(),
            approver_id: UserId::new(),
            stage: ApprovalStage::DepartmentHead,
            occurred_at: test_time(),
        }));
        assert_eq!(result.unwrap_err(), DomainError::NotFound);
    }

    #[test]
    fn soft_delete_refused_from_terminal_states() {
        let approver = UserId::new();
        let mut rejected = submitted(UserId::new(), approver);
        let requirement_id = rejected.id_typed();
        execute(
            &mut rejected,
            &RequirementCommand::ResolveApproval(ResolveApproval {
                requirement_id,
                approver_id: approver,
                decision: ApprovalDecision::Rejected,
                comments: Some("Budget not available this quarter".to_string()),
                occurred_at: test_time(),
            }),
        )
        .unwrap();

        let result = rejected.handle(&RequirementCommand::SoftDelete(SoftDelete {
            requirement_id: rejected.id_typed(),
            occurred_at: test_time(),
        }));
        assert!(matches!(result, Err(DomainError::InvalidTransition(_))));
    }

    #[test]
    fn posting_lifecycle_publish_then_pause() {
        let recruiter = UserId::new();
        let mut requirement = approved(UserId::new(), UserId::new());
        let requirement_id = requirement.id_typed();
        execute(
            &mut requirement,
            &RequirementCommand::AssignRecruiter(AssignRecruiter {
                requirement_id,
                recruiter_id: recruiter,
                occurred_at: test_time(),
            }),
        )
        .unwrap();
        execute(
            &mut requirement,
            &RequirementCommand::Activate(Activate {
                requirement_id,
                actor_id: recruiter,
                occurred_at: test_time(),
            }),
        )
        .unwrap();

        execute(
            &mut requirement,
            &RequirementCommand::PublishPosting(PublishPosting {
                requirement_id,
                occurred_at: test_time(),
            }),
        )
        .unwrap();
        assert_eq!(requirement.posting().unwrap().status, PostingStatus::Active);

        // A stranger with the recruiter role cannot touch the posting.
        let result = requirement.handle(&RequirementCommand::ChangePostingStatus(
            ChangePostingStatus {
                requirement_id: requirement.id_typed(),
                actor_id: UserId::new(),
                actor_is_admin: false,
                status: PostingStatus::Paused,
                occurred_at: test_time(),
            },
        ));
        assert_eq!(result.unwrap_err(), DomainError::Unauthorized);

        execute(
            &mut requirement,
            &RequirementCommand::ChangePostingStatus(ChangePostingStatus {
                requirement_id,
                actor_id: recruiter,
                actor_is_admin: false,
                status: PostingStatus::Paused,
                occurred_at: test_time(),
            }),
        )
        .unwrap();
        assert_eq!(requirement.posting().unwrap().status, PostingStatus::Paused);
    }

    #[test]
    fn posting_requires_approved_or_active() {
        let requirement = drafted(UserId::new());

        let result = requirement.handle(&RequirementCommand::PublishPosting(PublishPosting {
            requirement_id: requirement.id_typed(),
            occurred_at: test_time(),
        }));

        assert!(matches!(result, Err(DomainError::InvalidTransition(_))));
    }

    // Legal status edges per the lifecycle table. `(from, to)` pairs observed
    // under any command sequence must stay inside this set.
    fn is_legal_edge(from: RequirementStatus, to: RequirementStatus) -> bool {
        use RequirementStatus::*;
        matches!(
            (from, to),
            (Draft, Submitted) | (Submitted, Approved) | (Submitted, Rejected) | (Approved, Active)
        )
    }

    fn command_of_kind(
        kind: u8,
        id: RequirementId,
        hiring_manager: UserId,
        approver: UserId,
        recruiter: UserId,
    ) -> RequirementCommand {
        match kind {
            0 => RequirementCommand::Submit(Submit {
                requirement_id: id,
                approval_id: ApprovalId::new(),
                approver_id: approver,
                stage: ApprovalStage::DepartmentHead,
                occurred_at: Utc::now(),
            }),
            1 => RequirementCommand::ResolveApproval(ResolveApproval {
                requirement_id: id,
                approver_id: approver,
                decision: ApprovalDecision::Approved,
                comments: None,
                occurred_at: Utc::now(),
            }),
            2 => RequirementCommand::ResolveApproval(ResolveApproval {
                requirement_id: id,
                approver_id: approver,
                decision: ApprovalDecision::Rejected,
                comments: Some("does not fit the hiring plan".to_string()),
                occurred_at: Utc::now(),
            }),
            3 => RequirementCommand::AssignRecruiter(AssignRecruiter {
                requirement_id: id,
                recruiter_id: recruiter,
                occurred_at: Utc::now(),
            }),
            4 => RequirementCommand::Activate(Activate {
                requirement_id: id,
                actor_id: recruiter,
                occurred_at: Utc::now(),
            }),
            5 => RequirementCommand::Activate(Activate {
                requirement_id: id,
                actor_id: hiring_manager,
                occurred_at: Utc::now(),
            }),
            6 => RequirementCommand::UpdateDraft(UpdateDraft {
                requirement_id: id,
                patch: ProfilePatch {
                    priority: Some(Priority::Low),
                    ..Default::default()
                },
                occurred_at: Utc::now(),
            }),
            _ => RequirementCommand::ResolveApproval(ResolveApproval {
                requirement_id: id,
                approver_id: hiring_manager,
                decision: ApprovalDecision::Approved,
                comments: None,
                occurred_at: Utc::now(),
            }),
        }
    }

    proptest! {
        #[test]
        fn status_only_moves_along_legal_edges(kinds in proptest::collection::vec(0u8..8, 0..40)) {
            let hiring_manager = UserId::new();
            let approver = UserId::new();
            let recruiter = UserId::new();
            let id = test_requirement_id();

            let mut requirement = Requirement::empty(id);
            execute(&mut requirement, &create_cmd(id, hiring_manager)).unwrap();

            for kind in kinds {
                let cmd = command_of_kind(kind, id, hiring_manager, approver, recruiter);
                let before = requirement.status();
                if execute(&mut requirement, &cmd).is_ok() {
                    let after = requirement.status();
                    if before != after {
                        prop_assert!(
                            is_legal_edge(before, after),
                            "illegal edge {:?} -> {:?}", before, after
                        );
                    }
                    if after == RequirementStatus::Approved {
                        prop_assert_eq!(
                            requirement.approvals().outcome(),
                            ChainOutcome::Approved
                        );
                    }
                }
            }
        }
    }
}
