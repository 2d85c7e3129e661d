use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{
    ClearanceAmendment, ClearanceStatus, ClearanceSubmission, DuplicateCheckRequest, FormId,
    ProjectId,
};
use super::repository::{ClearanceRepository, RepositoryError};
use super::service::{ClearanceFormService, ClearanceServiceError};

/// Body of a status change request.
#[derive(Debug, Deserialize)]
pub struct StatusChangeRequest {
    pub status: ClearanceStatus,
}

/// Router builder exposing HTTP endpoints for clearance forms.
pub fn clearance_router<R>(service: Arc<ClearanceFormService<R>>) -> Router
where
    R: ClearanceRepository + 'static,
{
    Router::new()
        .route("/api/v1/clearance/forms", post(create_handler::<R>))
        .route("/api/v1/clearance/forms/check", post(check_handler::<R>))
        .route(
            "/api/v1/clearance/forms/:form_id",
            get(get_handler::<R>)
                .put(update_handler::<R>)
                .delete(delete_handler::<R>),
        )
        .route(
            "/api/v1/clearance/forms/:form_id/status",
            post(status_handler::<R>),
        )
        .route(
            "/api/v1/clearance/projects/:project_id/forms",
            get(project_forms_handler::<R>),
        )
        .with_state(service)
}

pub(crate) async fn create_handler<R>(
    State(service): State<Arc<ClearanceFormService<R>>>,
    axum::Json(submission): axum::Json<ClearanceSubmission>,
) -> Response
where
    R: ClearanceRepository + 'static,
{
    match service.create(submission) {
        Ok(form) => (StatusCode::CREATED, axum::Json(form)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn check_handler<R>(
    State(service): State<Arc<ClearanceFormService<R>>>,
    axum::Json(request): axum::Json<DuplicateCheckRequest>,
) -> Response
where
    R: ClearanceRepository + 'static,
{
    match service.check(request) {
        Ok(report) => {
            let payload = json!({
                "duplicate_free": report.is_empty(),
                "message": report.message(),
                "conflicts": report.personnel,
                "conflicting_reference_numbers": report.reference_numbers(),
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn get_handler<R>(
    State(service): State<Arc<ClearanceFormService<R>>>,
    Path(form_id): Path<String>,
) -> Response
where
    R: ClearanceRepository + 'static,
{
    match service.get(&FormId(form_id)) {
        Ok(form) => (StatusCode::OK, axum::Json(form)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn update_handler<R>(
    State(service): State<Arc<ClearanceFormService<R>>>,
    Path(form_id): Path<String>,
    axum::Json(amendment): axum::Json<ClearanceAmendment>,
) -> Response
where
    R: ClearanceRepository + 'static,
{
    match service.update(&FormId(form_id), amendment) {
        Ok(form) => (StatusCode::OK, axum::Json(form)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn delete_handler<R>(
    State(service): State<Arc<ClearanceFormService<R>>>,
    Path(form_id): Path<String>,
) -> Response
where
    R: ClearanceRepository + 'static,
{
    match service.delete(&FormId(form_id)) {
        Ok(form) => {
            let payload = json!({
                "deleted": form.id,
                "reference_number": form.reference_number,
                "personnel_removed": form.personnel.len(),
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn status_handler<R>(
    State(service): State<Arc<ClearanceFormService<R>>>,
    Path(form_id): Path<String>,
    axum::Json(request): axum::Json<StatusChangeRequest>,
) -> Response
where
    R: ClearanceRepository + 'static,
{
    match service.transition(&FormId(form_id), request.status) {
        Ok(form) => (StatusCode::OK, axum::Json(form)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn project_forms_handler<R>(
    State(service): State<Arc<ClearanceFormService<R>>>,
    Path(project_id): Path<String>,
) -> Response
where
    R: ClearanceRepository + 'static,
{
    match service.list_for_project(&ProjectId(project_id)) {
        Ok(forms) => (StatusCode::OK, axum::Json(forms)).into_response(),
        Err(err) => error_response(err),
    }
}

fn error_response(err: ClearanceServiceError) -> Response {
    let status = err.status();
    let payload = match &err {
        ClearanceServiceError::Duplicates(report) => json!({
            "error": "duplicate_personnel",
            "message": report.message(),
            "conflicts": report.personnel,
            "conflicting_reference_numbers": report.reference_numbers(),
        }),
        ClearanceServiceError::Repository(RepositoryError::Unavailable(_)) => json!({
            "error": "clearance records are temporarily unavailable",
        }),
        other => json!({ "error": other.to_string() }),
    };
    (status, axum::Json(payload)).into_response()
}
