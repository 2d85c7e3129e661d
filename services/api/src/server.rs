use crate::cli::ServeArgs;
use crate::infra::{seeded_repository, AppState};
use crate::routes::with_clearance_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use clearance::config::AppConfig;
use clearance::error::AppError;
use clearance::telemetry;
use clearance::workflows::clearance::ClearanceFormService;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry, config.environment)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let repository = Arc::new(seeded_repository());
    let clearance_service = Arc::new(ClearanceFormService::new(
        repository,
        config.clearance.clone(),
    ));

    let app = with_clearance_routes(clearance_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        edit_remark_override = config.clearance.edit_remark_override,
        "clearance service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
