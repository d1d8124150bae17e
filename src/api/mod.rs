//! Instrumented HTTP server and client.
//!
//! Both sides take their meters from [`TelemetryHandles`](crate::telemetry::TelemetryHandles)
//! and rely on the propagator installed during telemetry setup to carry
//! trace context across the wire.

pub mod client;
pub mod middleware;
pub mod propagation;
pub mod server;

pub use client::{Client, ClientError};
pub use middleware::{HttpServerMetrics, RequestMetrics};
