use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use axum::http::StatusCode;
use chrono::{Datelike, Utc};
use tracing::{error, info, warn};

use crate::config::ClearancePolicyConfig;
use crate::telemetry;

use super::domain::{
    ClearanceAmendment, ClearanceForm, ClearanceStatus, ClearanceSubmission, CoverageWindow,
    DuplicateCheckRequest, FormId, PersonnelInput, ProjectId,
};
use super::intake::{normalize_personnel, validate_coverage, IntakeError};
use super::overlap::{DuplicateReport, OverlapChecker, OverlapRequest, RemarkOverride};
use super::repository::{ClearanceRepository, RepositoryError};

/// Service composing intake validation, the duplicate check, and the repository.
///
/// Checks and writes for one project run under that project's lock so two overlapping
/// submissions handled by this process cannot both pass the duplicate check.
pub struct ClearanceFormService<R> {
    repository: Arc<R>,
    policy: ClearancePolicyConfig,
    locks: ProjectLocks,
}

#[derive(Default)]
struct ProjectLocks {
    inner: Mutex<HashMap<ProjectId, Arc<Mutex<()>>>>,
}

impl ProjectLocks {
    fn handle(&self, project_id: &ProjectId) -> Arc<Mutex<()>> {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        guard.entry(project_id.clone()).or_default().clone()
    }
}

impl<R> ClearanceFormService<R>
where
    R: ClearanceRepository + 'static,
{
    pub fn new(repository: Arc<R>, policy: ClearancePolicyConfig) -> Self {
        Self {
            repository,
            policy,
            locks: ProjectLocks::default(),
        }
    }

    pub fn repository(&self) -> &Arc<R> {
        &self.repository
    }

    /// Remark policy applied when an existing form is edited.
    pub fn edit_remark_override(&self) -> RemarkOverride {
        RemarkOverride::from_flag(self.policy.edit_remark_override)
    }

    fn next_identity(
        &self,
        coverage: &CoverageWindow,
    ) -> Result<(FormId, String), ClearanceServiceError> {
        let sequence = self
            .repository
            .next_sequence()
            .map_err(|err| self.repository_failure(err))?;
        let id = FormId(format!("form-{sequence:06}"));
        let reference = format!(
            "{}-{}-{sequence:05}",
            self.policy.reference_prefix,
            coverage.from.year()
        );
        Ok((id, reference))
    }

    fn ensure_project(&self, project_id: &ProjectId) -> Result<(), ClearanceServiceError> {
        match self.repository.project(project_id) {
            Ok(Some(_)) => Ok(()),
            Ok(None) => Err(ClearanceServiceError::UnknownProject(project_id.clone())),
            Err(err) => Err(self.repository_failure(err)),
        }
    }

    fn fetch_existing(&self, id: &FormId) -> Result<ClearanceForm, ClearanceServiceError> {
        self.repository
            .fetch(id)
            .map_err(|err| self.repository_failure(err))?
            .ok_or_else(|| ClearanceServiceError::NotFound(id.clone()))
    }

    fn repository_failure(&self, err: RepositoryError) -> ClearanceServiceError {
        if matches!(err, RepositoryError::Unavailable(_)) {
            error!(error = %err, "clearance repository unavailable");
        }
        ClearanceServiceError::Repository(err)
    }

    fn run_check(
        &self,
        project_id: &ProjectId,
        coverage: CoverageWindow,
        personnel: &[PersonnelInput],
        exclude: Option<&FormId>,
        remark_override: RemarkOverride,
    ) -> Result<DuplicateReport, ClearanceServiceError> {
        let request = OverlapRequest {
            project_id,
            coverage,
            personnel,
            exclude,
            remark_override,
        };
        OverlapChecker::new(self.repository.as_ref())
            .check(&request)
            .map_err(|err| self.repository_failure(err))
    }

    fn reject_duplicates(
        &self,
        operation: &'static str,
        report: DuplicateReport,
    ) -> Result<(), ClearanceServiceError> {
        if report.is_empty() {
            return Ok(());
        }
        telemetry::record_duplicate_rejection(operation, report.conflict_count());
        warn!(
            operation,
            conflicts = report.conflict_count(),
            references = ?report.reference_numbers(),
            "duplicate personnel rejected"
        );
        Err(ClearanceServiceError::Duplicates(report))
    }

    /// Dry-run duplicate check. With `exclude_form_id` the edit policy applies.
    pub fn check(
        &self,
        request: DuplicateCheckRequest,
    ) -> Result<DuplicateReport, ClearanceServiceError> {
        let coverage = request.coverage();
        validate_coverage(&coverage)?;
        let personnel = normalize_personnel(request.personnel)?;
        self.ensure_project(&request.project_id)?;

        let remark_override = match request.exclude_form_id {
            Some(_) => self.edit_remark_override(),
            None => RemarkOverride::Allowed,
        };

        self.run_check(
            &request.project_id,
            coverage,
            &personnel,
            request.exclude_form_id.as_ref(),
            remark_override,
        )
    }

    /// Create a clearance form. The whole personnel batch is rejected on any duplicate.
    pub fn create(
        &self,
        submission: ClearanceSubmission,
    ) -> Result<ClearanceForm, ClearanceServiceError> {
        let status = submission.status.unwrap_or(ClearanceStatus::Submitted);
        if !matches!(status, ClearanceStatus::Draft | ClearanceStatus::Submitted) {
            return Err(IntakeError::InitialStatus(status.label()).into());
        }

        let coverage = submission.coverage();
        validate_coverage(&coverage)?;
        let personnel = normalize_personnel(submission.personnel)?;
        let project_id = submission.project_id;
        self.ensure_project(&project_id)?;

        let project_lock = self.locks.handle(&project_id);
        let _guard = project_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let report = self.run_check(
            &project_id,
            coverage,
            &personnel,
            None,
            RemarkOverride::Allowed,
        )?;
        self.reject_duplicates("create", report)?;

        let (id, reference_number) = self.next_identity(&coverage)?;
        let now = Utc::now();
        let form = ClearanceForm {
            id,
            reference_number,
            project_id,
            coverage,
            status,
            personnel: personnel
                .into_iter()
                .map(PersonnelInput::into_entry)
                .collect(),
            created_at: now,
            updated_at: now,
        };

        let stored = self
            .repository
            .insert(form)
            .map_err(|err| self.repository_failure(err))?;
        telemetry::record_form_created();
        info!(
            form = %stored.id,
            reference = %stored.reference_number,
            project = %stored.project_id,
            personnel = stored.personnel.len(),
            "clearance form created"
        );
        Ok(stored)
    }

    /// Replace coverage and personnel on an editable form.
    pub fn update(
        &self,
        id: &FormId,
        amendment: ClearanceAmendment,
    ) -> Result<ClearanceForm, ClearanceServiceError> {
        let coverage = amendment.coverage();
        validate_coverage(&coverage)?;
        let personnel = normalize_personnel(amendment.personnel)?;

        let project_id = self.fetch_existing(id)?.project_id;
        let project_lock = self.locks.handle(&project_id);
        let _guard = project_lock.lock().unwrap_or_else(PoisonError::into_inner);

        // Re-read under the lock; status may have moved since the first fetch.
        let mut form = self.fetch_existing(id)?;
        if !form.status.is_editable() {
            return Err(ClearanceServiceError::Locked {
                id: id.clone(),
                status: form.status.label(),
            });
        }

        let report = self.run_check(
            &form.project_id,
            coverage,
            &personnel,
            Some(id),
            self.edit_remark_override(),
        )?;
        self.reject_duplicates("update", report)?;

        form.coverage = coverage;
        form.personnel = personnel
            .into_iter()
            .map(PersonnelInput::into_entry)
            .collect();
        form.updated_at = Utc::now();

        self.repository
            .update(form.clone())
            .map_err(|err| self.repository_failure(err))?;
        info!(
            form = %form.id,
            reference = %form.reference_number,
            personnel = form.personnel.len(),
            "clearance form updated"
        );
        Ok(form)
    }

    /// Move a form along its review flow.
    ///
    /// Entering `SUBMITTED` from `DRAFT` or `REJECTED` makes the form an active conflict
    /// source, so its personnel are checked again against the rest of the project under
    /// the edit remark policy.
    pub fn transition(
        &self,
        id: &FormId,
        next: ClearanceStatus,
    ) -> Result<ClearanceForm, ClearanceServiceError> {
        let project_id = self.fetch_existing(id)?.project_id;
        let project_lock = self.locks.handle(&project_id);
        let _guard = project_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut form = self.fetch_existing(id)?;
        if !form.status.can_transition_to(next) {
            return Err(ClearanceServiceError::InvalidTransition {
                from: form.status.label(),
                to: next.label(),
            });
        }

        if !form.status.is_active() && next.is_active() {
            let personnel: Vec<PersonnelInput> =
                form.personnel.iter().map(PersonnelInput::from).collect();
            let report = self.run_check(
                &form.project_id,
                form.coverage,
                &personnel,
                Some(id),
                self.edit_remark_override(),
            )?;
            self.reject_duplicates("transition", report)?;
        }

        let previous = form.status;
        form.status = next;
        form.updated_at = Utc::now();
        self.repository
            .update(form.clone())
            .map_err(|err| self.repository_failure(err))?;
        info!(
            form = %form.id,
            from = previous.label(),
            to = next.label(),
            "clearance form status changed"
        );
        Ok(form)
    }

    pub fn get(&self, id: &FormId) -> Result<ClearanceForm, ClearanceServiceError> {
        self.fetch_existing(id)
    }

    pub fn list_for_project(
        &self,
        project_id: &ProjectId,
    ) -> Result<Vec<ClearanceForm>, ClearanceServiceError> {
        self.ensure_project(project_id)?;
        self.repository
            .list_by_project(project_id)
            .map_err(|err| self.repository_failure(err))
    }

    /// Delete a form and its personnel. Approved forms are retained.
    pub fn delete(&self, id: &FormId) -> Result<ClearanceForm, ClearanceServiceError> {
        let project_id = self.fetch_existing(id)?.project_id;
        let project_lock = self.locks.handle(&project_id);
        let _guard = project_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let form = self.fetch_existing(id)?;
        if form.status == ClearanceStatus::Approved {
            return Err(ClearanceServiceError::Locked {
                id: id.clone(),
                status: form.status.label(),
            });
        }

        let removed = self
            .repository
            .delete(id)
            .map_err(|err| self.repository_failure(err))?
            .ok_or_else(|| ClearanceServiceError::NotFound(id.clone()))?;
        info!(form = %removed.id, reference = %removed.reference_number, "clearance form deleted");
        Ok(removed)
    }
}

/// Error raised by the clearance form service.
#[derive(Debug, thiserror::Error)]
pub enum ClearanceServiceError {
    #[error(transparent)]
    Intake(#[from] IntakeError),
    #[error("{}", .0.message())]
    Duplicates(DuplicateReport),
    #[error("project {0} is not registered")]
    UnknownProject(ProjectId),
    #[error("clearance form {0} not found")]
    NotFound(FormId),
    #[error("clearance form {id} is {status} and can no longer be changed")]
    Locked { id: FormId, status: &'static str },
    #[error("cannot move a clearance form from {from} to {to}")]
    InvalidTransition {
        from: &'static str,
        to: &'static str,
    },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl ClearanceServiceError {
    /// HTTP status this failure is reported with.
    pub fn status(&self) -> StatusCode {
        match self {
            ClearanceServiceError::Duplicates(_) => StatusCode::BAD_REQUEST,
            ClearanceServiceError::Intake(_) | ClearanceServiceError::UnknownProject(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ClearanceServiceError::NotFound(_)
            | ClearanceServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
            ClearanceServiceError::Locked { .. }
            | ClearanceServiceError::InvalidTransition { .. }
            | ClearanceServiceError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
            ClearanceServiceError::Repository(RepositoryError::Unavailable(_)) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
        }
    }
}
