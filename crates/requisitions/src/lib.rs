//! Requisition domain: the `Requirement` aggregate and its lifecycle
//! state machine.

pub mod number;
pub mod requirement;

pub use number::RequirementNumber;
pub use requirement::{
    AGGREGATE_TYPE as REQUIREMENT_AGGREGATE_TYPE,
    Activate, AssignRecruiter, ChangePostingStatus, CompensationRange, CreateRequirement,
    EmploymentType, Posting, PostingStatus, Priority, ProfilePatch, PublishPosting,
    Requirement, RequirementCommand, RequirementEvent, RequirementId, RequirementKind,
    RequirementProfile, RequirementStatus, ResolveApproval, SoftDelete, Submit, UpdateDraft,
    WorkMode,
};
