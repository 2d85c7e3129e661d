use serde::{Deserialize, Serialize};

use super::domain::{
    names_match, ClearanceForm, CoverageWindow, FormId, PersonnelEntry, Project, ProjectId,
    ProjectSummary,
};

/// Storage abstraction so the service module can be exercised in isolation.
pub trait ClearanceRepository: Send + Sync {
    fn insert(&self, form: ClearanceForm) -> Result<ClearanceForm, RepositoryError>;
    fn update(&self, form: ClearanceForm) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &FormId) -> Result<Option<ClearanceForm>, RepositoryError>;
    /// Removes the form together with its personnel entries.
    fn delete(&self, id: &FormId) -> Result<Option<ClearanceForm>, RepositoryError>;
    fn list_by_project(&self, project_id: &ProjectId)
        -> Result<Vec<ClearanceForm>, RepositoryError>;
    fn project(&self, id: &ProjectId) -> Result<Option<Project>, RepositoryError>;
    /// Next value of the store-wide form sequence. Never repeats for the lifetime of the
    /// store, so ids and reference numbers stay unique across service restarts.
    fn next_sequence(&self) -> Result<u64, RepositoryError>;
    /// Active forms of the same project that register `query.personnel_name` within an
    /// overlapping coverage window. Implementations should agree with [`OverlapQuery::matches`].
    fn find_overlapping(
        &self,
        query: &OverlapQuery<'_>,
    ) -> Result<Vec<ExistingForm>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Lookup for previously registered personnel that could collide with a candidate.
#[derive(Debug, Clone, Copy)]
pub struct OverlapQuery<'a> {
    pub project_id: &'a ProjectId,
    pub personnel_name: &'a str,
    pub coverage: CoverageWindow,
    pub exclude: Option<&'a FormId>,
}

impl OverlapQuery<'_> {
    pub fn matches(&self, form: &ClearanceForm) -> bool {
        if &form.project_id != self.project_id || !form.status.is_active() {
            return false;
        }
        if self.exclude.is_some_and(|excluded| excluded == &form.id) {
            return false;
        }
        form.coverage.overlaps(&self.coverage) && form.find_personnel(self.personnel_name).is_some()
    }
}

/// Overlapping form as returned by [`ClearanceRepository::find_overlapping`]. Only the
/// personnel entries matching the queried name are carried.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExistingForm {
    pub id: FormId,
    pub reference_number: String,
    pub project: ProjectSummary,
    pub personnel: Vec<PersonnelEntry>,
}

impl ExistingForm {
    pub fn from_form(form: &ClearanceForm, project: ProjectSummary, personnel_name: &str) -> Self {
        Self {
            id: form.id.clone(),
            reference_number: form.reference_number.clone(),
            project,
            personnel: form
                .personnel
                .iter()
                .filter(|entry| names_match(&entry.registered_name, personnel_name))
                .cloned()
                .collect(),
        }
    }

    pub fn find_personnel(&self, name: &str) -> Option<&PersonnelEntry> {
        self.personnel
            .iter()
            .find(|entry| names_match(&entry.registered_name, name))
    }
}
