use std::future::Future;
use std::time::Duration;

use tonic::transport::{Channel, ClientTlsConfig, Endpoint};
use tracing::debug;

use crate::telemetry::error::TelemetryError;

/// Turn a bare `host:port` into a URI tonic accepts. Explicit schemes are kept.
pub fn endpoint_uri(endpoint: &str) -> String {
    if endpoint.contains("://") {
        endpoint.to_string()
    } else {
        format!("http://{}", endpoint)
    }
}

/// Open a gRPC channel to the collector, failing once `timeout` elapses.
///
/// The channel is connected eagerly so an unreachable collector surfaces
/// here rather than on the first export.
pub async fn connect(endpoint: &str, timeout: Duration) -> Result<Channel, TelemetryError> {
    let uri = endpoint_uri(endpoint);
    let invalid = |reason: String| TelemetryError::InvalidEndpoint {
        endpoint: endpoint.to_string(),
        reason,
    };

    // The deadline is enforced by with_deadline alone, so expiry is always
    // ConnectionTimeout.
    let mut target = Endpoint::from_shared(uri.clone()).map_err(|e| invalid(e.to_string()))?;

    if uri.starts_with("https://") {
        target = target
            .tls_config(ClientTlsConfig::new().with_native_roots())
            .map_err(|e| invalid(e.to_string()))?;
    }

    debug!(endpoint = %uri, ?timeout, "connecting to collector");
    with_deadline(endpoint, timeout, target.connect()).await
}

/// Bound a connection attempt by `timeout`, mapping both outcomes to
/// [`TelemetryError`].
pub async fn with_deadline<F, T>(
    endpoint: &str,
    timeout: Duration,
    attempt: F,
) -> Result<T, TelemetryError>
where
    F: Future<Output = Result<T, tonic::transport::Error>>,
{
    match tokio::time::timeout(timeout, attempt).await {
        Ok(Ok(connected)) => Ok(connected),
        Ok(Err(source)) => Err(TelemetryError::Connection {
            endpoint: endpoint.to_string(),
            source,
        }),
        Err(_) => Err(TelemetryError::ConnectionTimeout {
            endpoint: endpoint.to_string(),
            timeout,
        }),
    }
}
