use std::time::Duration;

use actix_web::{get, web, HttpRequest, HttpResponse, Responder};
use otel_http_service::api::server;
use otel_http_service::config::AppConfig;
use otel_http_service::telemetry::{console_dispatch, init_subscriber, TelemetryCoordinator};
use serde::Serialize;
use tracing::instrument::WithSubscriber;
use tracing::{error, info, Instrument};

const TELEMETRY_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Serialize)]
struct HealthBody {
    status: &'static str,
}

#[derive(Serialize)]
struct HelloBody {
    message: &'static str,
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
}

#[get("/health")]
async fn health() -> impl Responder {
    HttpResponse::Ok().json(HealthBody { status: "ok" })
}

#[get("/hello")]
#[tracing::instrument(skip(request), fields(endpoint = "/hello", user_agent))]
async fn hello(request: HttpRequest) -> impl Responder {
    let user_agent = request
        .headers()
        .get("user-agent")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");
    tracing::Span::current().record("user_agent", user_agent);

    process_request().await;

    HttpResponse::Ok().json(HelloBody {
        message: "Hello, OpenTelemetry!",
    })
}

#[get("/error")]
#[tracing::instrument(fields(error.type = "demo_error"))]
async fn demo_error() -> impl Responder {
    let err = DemoError("this is a demo error");
    error!(error = %err, "demo error");

    HttpResponse::InternalServerError().json(ErrorBody {
        error: "Something went wrong!",
    })
}

/// Simulated pipeline: a database query followed by business logic
#[tracing::instrument(name = "process-request")]
async fn process_request() {
    tokio::time::sleep(Duration::from_millis(50)).await;

    let db_span = tracing::info_span!(
        "database-query",
        db.statement = "SELECT * FROM users",
        db.rows_affected = tracing::field::Empty,
    );
    async {
        tokio::time::sleep(Duration::from_millis(30)).await;
        tracing::Span::current().record("db.rows_affected", 10);
    }
    .instrument(db_span)
    .await;

    tokio::time::sleep(Duration::from_millis(20))
        .instrument(tracing::info_span!("business-logic"))
        .await;
}

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
struct DemoError(&'static str);

fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(health).service(hello).service(demo_error);
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let config = AppConfig::from_env();
    println!("{}", config);

    let mut telemetry = TelemetryCoordinator::new(config.telemetry.clone());
    let setup = telemetry
        .setup()
        .with_subscriber(console_dispatch(&config.telemetry))
        .await
        .map(|handles| handles.clone());
    init_subscriber(&config.telemetry, telemetry.handles());
    let handles = match setup {
        Ok(handles) => handles,
        Err(err) => {
            error!(error = %err, "Failed to set up telemetry");
            return Err(std::io::Error::other(err));
        }
    };

    let result = server::bind(&config, &handles, routes)?.await;
    info!("Server stopped");

    let shutdown =
        tokio::task::spawn_blocking(move || telemetry.shutdown(TELEMETRY_SHUTDOWN_TIMEOUT)).await;
    match shutdown {
        Ok(Ok(())) => {}
        Ok(Err(err)) => eprintln!("Error shutting down telemetry: {}", err),
        Err(err) => eprintln!("Telemetry shutdown task failed: {}", err),
    }

    result
}
