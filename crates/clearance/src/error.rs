use crate::config::ConfigError;
use crate::telemetry::TelemetryError;
use crate::workflows::clearance::ClearanceServiceError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

/// Process-level failure surfaced by the API binary.
#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Clearance(ClearanceServiceError),
}

impl AppError {
    /// Short machine-readable tag used in JSON error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Config(_) => "configuration",
            AppError::Telemetry(_) => "telemetry",
            AppError::Io(_) => "io",
            AppError::Clearance(ClearanceServiceError::Duplicates(_)) => "duplicate_personnel",
            AppError::Clearance(_) => "clearance",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Clearance(err) => err.status(),
            AppError::Config(_) | AppError::Telemetry(_) | AppError::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "invalid configuration: {err}"),
            AppError::Telemetry(err) => write!(f, "logging setup failed: {err}"),
            AppError::Io(err) => write!(f, "listener failed: {err}"),
            AppError::Clearance(err) => fmt::Display::fmt(err, f),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Clearance(err) => Some(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "error": self.code(), "message": self.to_string() }));
        (self.status(), body).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<ClearanceServiceError> for AppError {
    fn from(value: ClearanceServiceError) -> Self {
        Self::Clearance(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::clearance::{DuplicateReport, FormId, IntakeError, RepositoryError};

    #[test]
    fn unavailable_repository_maps_to_service_unavailable() {
        let err = AppError::from(ClearanceServiceError::Repository(
            RepositoryError::Unavailable("database offline".to_string()),
        ));
        assert_eq!(err.code(), "clearance");
        assert_eq!(err.into_response().status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn clearance_errors_keep_their_message() {
        let err = AppError::from(ClearanceServiceError::NotFound(FormId("F9".to_string())));
        assert_eq!(err.to_string(), "clearance form F9 not found");
        assert_eq!(err.status(), StatusCode::NOT_FOUND);

        let err = AppError::from(ClearanceServiceError::Duplicates(DuplicateReport::default()));
        assert_eq!(err.code(), "duplicate_personnel");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn clearance_statuses_match_the_http_routes() {
        let locked = AppError::from(ClearanceServiceError::Locked {
            id: FormId("F1".to_string()),
            status: "APPROVED",
        });
        assert_eq!(locked.into_response().status(), StatusCode::CONFLICT);

        let invalid = AppError::from(ClearanceServiceError::Intake(IntakeError::NoPersonnel));
        assert_eq!(invalid.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let transition = AppError::from(ClearanceServiceError::InvalidTransition {
            from: "APPROVED",
            to: "DRAFT",
        });
        assert_eq!(transition.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn config_errors_are_internal() {
        let err = AppError::from(ConfigError::InvalidPort);
        assert!(err.to_string().contains("APP_PORT"));
        assert_eq!(
            err.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
