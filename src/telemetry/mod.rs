//! Tracing and metrics lifecycle built on OpenTelemetry.
//!
//! A [`TelemetryCoordinator`] owns the whole sequence: build the resource,
//! install W3C propagation, build the tracing and metrics backends that are
//! enabled, publish them, and later flush and stop them in order.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! let config = TelemetryConfig::from_env();
//! let mut telemetry = TelemetryCoordinator::new(config.clone());
//! let handles = telemetry
//!     .setup()
//!     .with_subscriber(console_dispatch(&config))
//!     .await?
//!     .clone();
//! init_subscriber(&config, &handles);
//!
//! // ... serve ...
//!
//! telemetry.shutdown(Duration::from_secs(5))?;
//! ```
//!
//! # Failure model
//!
//! - `setup` is all-or-nothing. Tracing is built before metrics; nothing is
//!   published until every enabled backend has been built.
//! - `shutdown` visits every backend even when one fails, and reports all
//!   failures together in [`ShutdownError`].
//!
//! # Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `SERVICE_NAME` / `OTEL_SERVICE_NAME` | Service name | `otel-service` |
//! | `SERVICE_VERSION` / `OTEL_SERVICE_VERSION` | Service version | `0.1.0` |
//! | `OTLP_ENDPOINT` / `OTEL_EXPORTER_OTLP_ENDPOINT` | Collector address | `localhost:4317` |
//! | `TRACES_ENABLED` | `true` enables tracing | `true` |
//! | `METRICS_ENABLED` | `true` enables metrics | `true` |
//! | `RUST_LOG` | Log level filter | `info` |
//! | `LOG_FORMAT` | `pretty` or `json` | `pretty` |
//!
//! # Module Structure
//!
//! - [`lifecycle`]: the coordinator and the handles it publishes
//! - [`api`]: backend factory trait
//! - [`otlp`]: OTLP/gRPC backend factory
//! - [`connection`]: deadline-bounded collector connection
//! - [`shutdown`]: shutdown hooks and their registry
//! - [`trace`]: `tracing` subscriber and OpenTelemetry bridge

pub mod api;
pub mod config;
pub mod connection;
pub mod error;
pub mod instruments;
pub mod lifecycle;
pub mod otlp;
pub mod propagation;
pub mod resource;
pub mod shutdown;
#[cfg(test)]
pub(crate) mod testing;
pub mod trace;

pub use api::TelemetryProvider;
pub use config::{LogFormat, TelemetryConfig, TelemetryConfigBuilder};
pub use error::{SetupError, ShutdownError, ShutdownFailure, TelemetryError};
pub use lifecycle::{LifecycleState, TelemetryCoordinator, TelemetryHandles};
pub use shutdown::{ShutdownHook, ShutdownRegistry};
pub use trace::{console_dispatch, init_subscriber};
