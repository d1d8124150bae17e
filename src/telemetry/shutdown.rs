use std::time::{Duration, Instant};

use opentelemetry_sdk::error::OTelSdkResult;
use opentelemetry_sdk::metrics::SdkMeterProvider;
use opentelemetry_sdk::trace::SdkTracerProvider;
use tracing::{debug, warn};

use crate::telemetry::error::{ShutdownError, ShutdownFailure};

/// A backend that must be flushed and stopped when the process exits.
pub trait ShutdownHook: Send + Sync {
    /// Label used in logs and in [`ShutdownFailure`]
    fn name(&self) -> &'static str;

    fn shutdown(&self, timeout: Duration) -> OTelSdkResult;
}

impl ShutdownHook for SdkTracerProvider {
    fn name(&self) -> &'static str {
        "tracer_provider"
    }

    fn shutdown(&self, timeout: Duration) -> OTelSdkResult {
        self.shutdown_with_timeout(timeout)
    }
}

impl ShutdownHook for SdkMeterProvider {
    fn name(&self) -> &'static str {
        "meter_provider"
    }

    fn shutdown(&self, timeout: Duration) -> OTelSdkResult {
        self.shutdown_with_timeout(timeout)
    }
}

/// Ordered, append-only list of shutdown hooks, drained once.
#[derive(Default)]
pub struct ShutdownRegistry {
    hooks: Vec<Box<dyn ShutdownHook>>,
}

impl ShutdownRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<H: ShutdownHook + 'static>(&mut self, hook: H) {
        debug!(backend = hook.name(), "registered shutdown hook");
        self.hooks.push(Box::new(hook));
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Run every hook in registration order under one shared deadline.
    ///
    /// Each hook gets whatever is left of `timeout` when its turn comes, so
    /// the whole drain is bounded by `timeout`. A failing or slow hook never
    /// prevents the following ones from running.
    pub fn shutdown_all(&mut self, timeout: Duration) -> Result<(), ShutdownError> {
        let deadline = Instant::now() + timeout;
        let mut failures = Vec::new();

        for hook in self.hooks.drain(..) {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match hook.shutdown(remaining) {
                Ok(()) => debug!(backend = hook.name(), "backend shut down"),
                Err(source) => {
                    warn!(backend = hook.name(), error = %source, "backend shutdown failed");
                    failures.push(ShutdownFailure {
                        backend: hook.name(),
                        source,
                    });
                }
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(ShutdownError::new(failures))
        }
    }
}
