use opentelemetry_otlp::{MetricExporter, SpanExporter, WithTonicConfig};
use opentelemetry_sdk::metrics::{PeriodicReader, SdkMeterProvider};
use opentelemetry_sdk::trace::{BatchSpanProcessor, Sampler, SdkTracerProvider};
use opentelemetry_sdk::Resource;
use tracing::info;

use crate::telemetry::api::TelemetryProvider;
use crate::telemetry::config::TelemetryConfig;
use crate::telemetry::connection::connect;
use crate::telemetry::error::TelemetryError;

/// Exports to an OTLP collector over gRPC
pub struct OtlpProvider;

impl TelemetryProvider for OtlpProvider {
    async fn build_tracer_provider(
        &self,
        config: &TelemetryConfig,
        resource: Resource,
    ) -> Result<SdkTracerProvider, TelemetryError> {
        let channel = connect(&config.otlp_endpoint, config.connect_timeout).await?;

        let exporter = SpanExporter::builder()
            .with_tonic()
            .with_channel(channel)
            .build()?;

        let provider = SdkTracerProvider::builder()
            .with_sampler(Sampler::AlwaysOn)
            .with_span_processor(BatchSpanProcessor::builder(exporter).build())
            .with_resource(resource)
            .build();

        info!(endpoint = %config.otlp_endpoint, "trace exporter connected");
        Ok(provider)
    }

    async fn build_meter_provider(
        &self,
        config: &TelemetryConfig,
        resource: Resource,
    ) -> Result<SdkMeterProvider, TelemetryError> {
        let channel = connect(&config.otlp_endpoint, config.connect_timeout).await?;

        let exporter = MetricExporter::builder()
            .with_tonic()
            .with_channel(channel)
            .build()?;

        let reader = PeriodicReader::builder(exporter)
            .with_interval(config.metrics_interval)
            .build();

        let provider = SdkMeterProvider::builder()
            .with_reader(reader)
            .with_resource(resource)
            .build();

        info!(
            endpoint = %config.otlp_endpoint,
            interval = ?config.metrics_interval,
            "metric exporter connected"
        );
        Ok(provider)
    }
}
