use std::time::{Duration, Instant};

use opentelemetry::metrics::{Counter, Histogram, Meter};
use opentelemetry::KeyValue;
use otel_http_service::api::{Client, ClientError};
use otel_http_service::config::AppConfig;
use otel_http_service::telemetry::instruments::{new_counter, new_histogram};
use otel_http_service::telemetry::{console_dispatch, init_subscriber, TelemetryCoordinator};
use thiserror::Error;
use tokio::signal::unix::{signal, SignalKind};
use tracing::instrument::WithSubscriber;
use tracing::{error, info, Instrument};

const CLIENT_SERVICE_NAME: &str = "otel-client";
const TELEMETRY_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);
const REQUEST_PAUSE: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
enum RequestError {
    #[error("request failed: {0}")]
    Client(#[from] ClientError),

    #[error("failed to read response: {0}")]
    Body(#[source] reqwest::Error),

    #[error("unexpected status code: {0}")]
    Status(u16),
}

/// Application-level instruments for the request loop
struct ClientMetrics {
    requests: Counter<u64>,
    successes: Counter<u64>,
    errors: Counter<u64>,
    latency: Histogram<f64>,
}

impl ClientMetrics {
    fn new(meter: &Meter) -> Self {
        Self {
            requests: new_counter(meter, "app.client.requests", "Total number of requests sent"),
            successes: new_counter(
                meter,
                "app.client.successes",
                "Number of successful requests",
            ),
            errors: new_counter(meter, "app.client.errors", "Number of failed requests"),
            latency: new_histogram(meter, "app.client.latency", "Request latency in seconds"),
        }
    }
}

async fn execute_request(client: &Client, url: &str, number: u64) -> Result<(), RequestError> {
    let span = tracing::info_span!("request", otel.name = %format!("request-{}", number));

    async {
        let response = client.get(url).await?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(RequestError::Body)?;

        if status != 200 {
            return Err(RequestError::Status(status));
        }

        info!("Response {}: {}", number, body);
        Ok(())
    }
    .instrument(span)
    .await
}

async fn run_cycle(client: &Client, metrics: &ClientMetrics, url: &str, number: u64) {
    let span = tracing::info_span!(
        "client-request-cycle",
        request.number = number,
        request.target = %url,
    );

    async {
        let attributes = [KeyValue::new("request.number", number as i64)];
        metrics.requests.add(1, &attributes);

        let started = Instant::now();
        match execute_request(client, url, number).await {
            Ok(()) => {
                metrics
                    .latency
                    .record(started.elapsed().as_secs_f64(), &attributes);
                metrics.successes.add(1, &attributes);
            }
            Err(err) => {
                metrics.errors.add(1, &attributes);
                error!(error = %err, "Request {} failed", number);
            }
        }
    }
    .instrument(span)
    .await
}

async fn run_client(client: &Client, metrics: &ClientMetrics, url: &str) -> std::io::Result<()> {
    let mut terminate = signal(SignalKind::terminate())?;

    for number in 0.. {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = terminate.recv() => break,
            _ = async {
                run_cycle(client, metrics, url, number).await;
                tokio::time::sleep(REQUEST_PAUSE).await;
            } => {}
        }
    }

    info!("Client stopping...");
    Ok(())
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let mut config = AppConfig::from_env();
    config.telemetry.service_name = CLIENT_SERVICE_NAME.to_string();
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

    let meter = handles.meter("client-app");
    let metrics = ClientMetrics::new(&meter);
    let client = Client::new(&config, &handles.meter("http.client")).map_err(std::io::Error::other)?;

    let result = run_client(&client, &metrics, &config.server_url).await;

    let shutdown =
        tokio::task::spawn_blocking(move || telemetry.shutdown(TELEMETRY_SHUTDOWN_TIMEOUT)).await;
    match shutdown {
        Ok(Ok(())) => {}
        Ok(Err(err)) => eprintln!("Error shutting down telemetry: {}", err),
        Err(err) => eprintln!("Telemetry shutdown task failed: {}", err),
    }

    result
}
