//! Approval workflow primitives: one reviewer's pending-or-resolved decision
//! at one stage of a requirement's approval chain.

pub mod approval;

pub use approval::{
    Approval, ApprovalChain, ApprovalDecision, ApprovalId, ApprovalStage, ApprovalStatus,
    ChainOutcome, MIN_REJECTION_COMMENT_LEN,
};
