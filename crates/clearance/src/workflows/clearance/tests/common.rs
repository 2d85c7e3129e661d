use std::sync::Arc;

use axum::response::Response;
use chrono::{NaiveDate, TimeZone, Utc};
use serde_json::Value;

use crate::config::ClearancePolicyConfig;
use crate::workflows::clearance::domain::{
    ClearanceForm, ClearanceStatus, ClearanceSubmission, CoverageWindow, DailyFees, FormId,
    PersonnelEntry, PersonnelInput, Project, ProjectId,
};
use crate::workflows::clearance::memory::MemoryClearanceRepository;
use crate::workflows::clearance::repository::{
    ClearanceRepository, ExistingForm, OverlapQuery, RepositoryError,
};
use crate::workflows::clearance::ClearanceFormService;

pub(super) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

pub(super) fn june(from: u32, to: u32) -> CoverageWindow {
    CoverageWindow::new(date(2024, 6, from), date(2024, 6, to))
}

pub(super) fn project_id(raw: &str) -> ProjectId {
    ProjectId(raw.to_string())
}

pub(super) fn projects() -> Vec<Project> {
    vec![
        Project {
            id: project_id("PRJ-1"),
            name: "Summer Mall Tour".to_string(),
        },
        Project {
            id: project_id("PRJ-2"),
            name: "Product Launch Roadshow".to_string(),
        },
    ]
}

pub(super) fn packaged(name: &str, fee: f64) -> PersonnelInput {
    PersonnelInput {
        registered_name: name.to_string(),
        packaged_fee: fee,
        daily_fees: DailyFees::default(),
        remarks: None,
        duplicate_remark: None,
    }
}

pub(super) fn daily(name: &str, rate: f64) -> PersonnelInput {
    PersonnelInput {
        registered_name: name.to_string(),
        packaged_fee: 0.0,
        daily_fees: DailyFees {
            monday: rate,
            tuesday: rate,
            wednesday: rate,
            thursday: rate,
            friday: rate,
            saturday: 0.0,
            sunday: 0.0,
        },
        remarks: None,
        duplicate_remark: None,
    }
}

pub(super) fn entry(name: &str, packaged_fee: f64, remarks: Option<&str>) -> PersonnelEntry {
    PersonnelEntry {
        registered_name: name.to_string(),
        packaged_fee,
        daily_fees: DailyFees::default(),
        remarks: remarks.map(str::to_string),
    }
}

pub(super) fn repository() -> Arc<MemoryClearanceRepository> {
    Arc::new(MemoryClearanceRepository::with_projects(projects()))
}

/// Stores a form directly, bypassing the service checks.
pub(super) fn seed_form(
    repository: &MemoryClearanceRepository,
    id: &str,
    project: &str,
    coverage: CoverageWindow,
    status: ClearanceStatus,
    personnel: Vec<PersonnelEntry>,
) -> ClearanceForm {
    let stamp = Utc
        .with_ymd_and_hms(2024, 5, 20, 9, 0, 0)
        .single()
        .expect("valid timestamp");
    let form = ClearanceForm {
        id: FormId(id.to_string()),
        reference_number: format!("REF-{id}"),
        project_id: project_id(project),
        coverage,
        status,
        personnel,
        created_at: stamp,
        updated_at: stamp,
    };
    repository.insert(form).expect("seed insert")
}

pub(super) fn submission(
    project: &str,
    coverage: CoverageWindow,
    personnel: Vec<PersonnelInput>,
) -> ClearanceSubmission {
    ClearanceSubmission {
        project_id: project_id(project),
        coverage_from_date: coverage.from,
        coverage_to_date: coverage.to,
        personnel,
        status: None,
    }
}

pub(super) fn build_service() -> (
    ClearanceFormService<MemoryClearanceRepository>,
    Arc<MemoryClearanceRepository>,
) {
    build_service_with(ClearancePolicyConfig::default())
}

pub(super) fn build_service_with(
    policy: ClearancePolicyConfig,
) -> (
    ClearanceFormService<MemoryClearanceRepository>,
    Arc<MemoryClearanceRepository>,
) {
    let repository = repository();
    let service = ClearanceFormService::new(repository.clone(), policy);
    (service, repository)
}

pub(super) struct UnavailableRepository;

fn offline<T>() -> Result<T, RepositoryError> {
    Err(RepositoryError::Unavailable("database offline".to_string()))
}

impl ClearanceRepository for UnavailableRepository {
    fn insert(&self, _form: ClearanceForm) -> Result<ClearanceForm, RepositoryError> {
        offline()
    }

    fn update(&self, _form: ClearanceForm) -> Result<(), RepositoryError> {
        offline()
    }

    fn fetch(&self, _id: &FormId) -> Result<Option<ClearanceForm>, RepositoryError> {
        offline()
    }

    fn delete(&self, _id: &FormId) -> Result<Option<ClearanceForm>, RepositoryError> {
        offline()
    }

    fn list_by_project(&self, _project_id: &ProjectId) -> Result<Vec<ClearanceForm>, RepositoryError> {
        offline()
    }

    fn project(&self, _id: &ProjectId) -> Result<Option<Project>, RepositoryError> {
        offline()
    }

    fn next_sequence(&self) -> Result<u64, RepositoryError> {
        offline()
    }

    fn find_overlapping(
        &self,
        _query: &OverlapQuery<'_>,
    ) -> Result<Vec<ExistingForm>, RepositoryError> {
        offline()
    }
}

/// Knows its projects but fails every duplicate lookup.
pub(super) struct FlakyLookupRepository {
    pub(super) inner: MemoryClearanceRepository,
}

impl ClearanceRepository for FlakyLookupRepository {
    fn insert(&self, form: ClearanceForm) -> Result<ClearanceForm, RepositoryError> {
        self.inner.insert(form)
    }

    fn update(&self, form: ClearanceForm) -> Result<(), RepositoryError> {
        self.inner.update(form)
    }

    fn fetch(&self, id: &FormId) -> Result<Option<ClearanceForm>, RepositoryError> {
        self.inner.fetch(id)
    }

    fn delete(&self, id: &FormId) -> Result<Option<ClearanceForm>, RepositoryError> {
        self.inner.delete(id)
    }

    fn list_by_project(&self, project_id: &ProjectId) -> Result<Vec<ClearanceForm>, RepositoryError> {
        self.inner.list_by_project(project_id)
    }

    fn project(&self, id: &ProjectId) -> Result<Option<Project>, RepositoryError> {
        self.inner.project(id)
    }

    fn next_sequence(&self) -> Result<u64, RepositoryError> {
        self.inner.next_sequence()
    }

    fn find_overlapping(
        &self,
        _query: &OverlapQuery<'_>,
    ) -> Result<Vec<ExistingForm>, RepositoryError> {
        offline()
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
