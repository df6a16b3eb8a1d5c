//! Read-model projections built from committed events.

pub mod approvals;
pub mod requirements;
pub mod users;

pub use approvals::{ApprovalLedgerProjection, ApprovalReadModel};
pub use requirements::{RequirementFilter, RequirementReadModel, RequirementsProjection};
pub use users::{UserDirectoryProjection, UserReadModel};
