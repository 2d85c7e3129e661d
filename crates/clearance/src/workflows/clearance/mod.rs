//! Clearance form (IMCF) intake, duplicate personnel detection, and review flow.

pub mod domain;
pub(crate) mod intake;
pub mod memory;
pub mod overlap;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    ClearanceAmendment, ClearanceForm, ClearanceStatus, ClearanceSubmission, CoverageWindow,
    DailyFees, DuplicateCheckRequest, FeeType, FormId, PersonnelEntry, PersonnelInput, Project,
    ProjectId, ProjectSummary,
};
pub use intake::IntakeError;
pub use memory::MemoryClearanceRepository;
pub use overlap::{
    ConflictReason, ConflictingForm, DuplicateReport, OverlapChecker, OverlapRequest,
    PersonnelConflict, RemarkOverride,
};
pub use repository::{ClearanceRepository, ExistingForm, OverlapQuery, RepositoryError};
pub use router::{clearance_router, StatusChangeRequest};
pub use service::{ClearanceFormService, ClearanceServiceError};
