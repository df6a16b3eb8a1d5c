//! Workflow policies that sit between the HTTP surface and the aggregate:
//! approver routing and requisition numbering.

pub mod approver;
pub mod numbers;

pub use approver::select_department_head_approver;
pub use numbers::RequirementNumberSequence;
