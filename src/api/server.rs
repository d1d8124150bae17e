use actix_web::dev::Server;
use actix_web::{web, App, HttpServer};
use tracing::info;
use tracing_actix_web::TracingLogger;

use crate::api::middleware::{HttpServerMetrics, RequestMetrics};
use crate::config::AppConfig;
use crate::telemetry::TelemetryHandles;

/// Seconds in-flight requests get to finish after SIGINT/SIGTERM
pub const GRACEFUL_SHUTDOWN_SECS: u64 = 15;

/// Bind an instrumented HTTP server on all interfaces.
///
/// Every request gets a server span with context extracted from the
/// incoming headers, plus request metrics recorded through `handles`.
/// `routes` registers the application's endpoints. The returned server
/// stops gracefully on SIGINT/SIGTERM.
pub fn bind<F>(config: &AppConfig, handles: &TelemetryHandles, routes: F) -> std::io::Result<Server>
where
    F: Fn(&mut web::ServiceConfig) + Send + Clone + 'static,
{
    let metrics = HttpServerMetrics::new(&handles.meter("http.server"));

    info!("Starting server on port {}", config.server_port);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(RequestMetrics::new(metrics.clone()))
            .wrap(TracingLogger::default())
            .configure(routes.clone())
    })
    .shutdown_timeout(GRACEFUL_SHUTDOWN_SECS)
    .bind(("0.0.0.0", config.server_port))?
    .run();

    Ok(server)
}
