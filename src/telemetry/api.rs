use opentelemetry_sdk::metrics::SdkMeterProvider;
use opentelemetry_sdk::trace::SdkTracerProvider;
use opentelemetry_sdk::Resource;

use crate::telemetry::config::TelemetryConfig;
use crate::telemetry::error::TelemetryError;

/// Factory for the SDK backends the coordinator wires together.
///
/// Implementations build providers but never install them anywhere; the
/// coordinator decides when a provider becomes visible.
pub trait TelemetryProvider: Send + Sync {
    /// Build the tracer provider for this backend
    fn build_tracer_provider(
        &self,
        config: &TelemetryConfig,
        resource: Resource,
    ) -> impl std::future::Future<Output = Result<SdkTracerProvider, TelemetryError>> + Send;

    /// Build the meter provider for this backend
    fn build_meter_provider(
        &self,
        config: &TelemetryConfig,
        resource: Resource,
    ) -> impl std::future::Future<Output = Result<SdkMeterProvider, TelemetryError>> + Send;
}
