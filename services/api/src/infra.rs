use chrono::NaiveDate;
use clearance::workflows::clearance::{MemoryClearanceRepository, Project, ProjectId};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Projects available to the in-memory deployment.
pub(crate) fn demo_projects() -> Vec<Project> {
    [
        ("PRJ-1", "Summer Mall Tour"),
        ("PRJ-2", "Product Launch Roadshow"),
        ("PRJ-3", "Year-End Trade Fair"),
    ]
    .into_iter()
    .map(|(id, name)| Project {
        id: ProjectId(id.to_string()),
        name: name.to_string(),
    })
    .collect()
}

pub(crate) fn seeded_repository() -> MemoryClearanceRepository {
    MemoryClearanceRepository::with_projects(demo_projects())
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}
