//! OTLP/gRPC telemetry provider.
//!
//! Builds tracer and meter providers that export to an OpenTelemetry
//! collector over gRPC.
//!
//! # Behavior
//!
//! - Each signal dials its own channel to `otlp_endpoint`, bounded by
//!   `connect_timeout`
//! - Spans go through a batch processor, sampled at 100%
//! - Metrics are pushed by a periodic reader every `metrics_interval`
//!
//! # Example
//!
//! ```rust,ignore
//! use otel_http_service::telemetry::{TelemetryConfig, TelemetryCoordinator};
//! use otel_http_service::telemetry::otlp::OtlpProvider;
//!
//! let config = TelemetryConfig::from_env();
//! let mut telemetry = TelemetryCoordinator::with_provider(config, OtlpProvider);
//! telemetry.setup().await?;
//! ```

mod provider;

pub use provider::OtlpProvider;
