use crate::config::{AppEnvironment, TelemetryConfig};
use std::fmt;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::EnvFilter;

/// Counter: submissions or edits refused because of duplicate personnel. Labels: operation.
pub const DUPLICATE_REJECTIONS_TOTAL: &str = "clearance_duplicate_rejections_total";

/// Counter: individual personnel conflicts reported across all refusals.
pub const PERSONNEL_CONFLICTS_TOTAL: &str = "clearance_personnel_conflicts_total";

/// Counter: forms accepted into the store.
pub const FORMS_CREATED_TOTAL: &str = "clearance_forms_created_total";

#[derive(Debug)]
pub enum TelemetryError {
    Filter { directive: String, source: ParseError },
    Install(Box<dyn std::error::Error + Send + Sync>),
}

impl fmt::Display for TelemetryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelemetryError::Filter { directive, .. } => {
                write!(f, "APP_LOG_LEVEL '{directive}' is not a valid tracing filter")
            }
            TelemetryError::Install(err) => {
                write!(f, "tracing subscriber already installed: {err}")
            }
        }
    }
}

impl std::error::Error for TelemetryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TelemetryError::Filter { source, .. } => Some(source),
            TelemetryError::Install(err) => Some(&**err),
        }
    }
}

/// `RUST_LOG` wins over the configured level when present and valid.
pub fn env_filter(config: &TelemetryConfig) -> Result<EnvFilter, TelemetryError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }

    EnvFilter::try_new(&config.log_level).map_err(|source| TelemetryError::Filter {
        directive: config.log_level.clone(),
        source,
    })
}

/// Install the global subscriber. Colour output is limited to development shells.
pub fn init(config: &TelemetryConfig, environment: AppEnvironment) -> Result<(), TelemetryError> {
    let filter = env_filter(config)?;
    let pretty = environment == AppEnvironment::Development;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(pretty)
        .with_target(!pretty)
        .compact()
        .try_init()
        .map_err(TelemetryError::Install)?;

    tracing::debug!(?environment, "tracing initialised");
    Ok(())
}

/// Record a refused submission together with how many personnel conflicts it carried.
pub fn record_duplicate_rejection(operation: &'static str, conflicts: usize) {
    metrics::counter!(DUPLICATE_REJECTIONS_TOTAL, "operation" => operation).increment(1);
    metrics::counter!(PERSONNEL_CONFLICTS_TOTAL).increment(conflicts as u64);
}

pub fn record_form_created() {
    metrics::counter!(FORMS_CREATED_TOTAL).increment(1);
}
