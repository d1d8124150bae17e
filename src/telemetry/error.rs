use std::fmt;
use std::time::Duration;

use opentelemetry_sdk::error::OTelSdkError;
use thiserror::Error;

use crate::telemetry::lifecycle::LifecycleState;

/// Failure while building a single telemetry backend.
#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("connection to collector at {endpoint} timed out after {timeout:?}")]
    ConnectionTimeout { endpoint: String, timeout: Duration },

    #[error("failed to connect to collector at {endpoint}: {source}")]
    Connection {
        endpoint: String,
        #[source]
        source: tonic::transport::Error,
    },

    #[error("invalid collector endpoint {endpoint:?}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("exporter error: {0}")]
    Exporter(String),
}

impl From<opentelemetry_otlp::ExporterBuildError> for TelemetryError {
    fn from(err: opentelemetry_otlp::ExporterBuildError) -> Self {
        Self::Exporter(err.to_string())
    }
}

/// Failure of [`TelemetryCoordinator::setup`](crate::telemetry::TelemetryCoordinator::setup).
///
/// Any variant means no provider was published: telemetry is fully inactive.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("failed to build telemetry resource: {0}")]
    Resource(String),

    #[error("failed to set up tracing: {0}")]
    Tracing(#[source] TelemetryError),

    #[error("failed to set up metrics: {0}")]
    Metrics(#[source] TelemetryError),

    #[error("telemetry setup requires a fresh coordinator, current state is {0:?}")]
    InvalidState(LifecycleState),
}

/// A single shutdown hook that failed.
#[derive(Debug, Error)]
#[error("{backend}: {source}")]
pub struct ShutdownFailure {
    pub backend: &'static str,
    #[source]
    pub source: OTelSdkError,
}

/// Every failure collected while draining the shutdown registry, in
/// registration order.
#[derive(Debug, Error)]
pub struct ShutdownError {
    failures: Vec<ShutdownFailure>,
}

impl ShutdownError {
    pub(crate) fn new(failures: Vec<ShutdownFailure>) -> Self {
        Self { failures }
    }

    pub fn failures(&self) -> &[ShutdownFailure] {
        &self.failures
    }
}

impl fmt::Display for ShutdownError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "errors shutting down telemetry: [")?;
        for (i, failure) in self.failures.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", failure)?;
        }
        write!(f, "]")
    }
}
