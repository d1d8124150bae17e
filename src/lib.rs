//! HTTP server and client wired to OpenTelemetry tracing and metrics.
//!
//! - [`telemetry`]: lifecycle of the tracing and metrics backends
//! - [`api`]: instrumented actix-web server and reqwest client
//! - [`config`]: environment-driven application configuration

pub mod api;
pub mod config;
pub mod telemetry;
