//! Ordered setup and best-effort shutdown of the telemetry backends.
//!
//! [`TelemetryCoordinator::setup`] is all-or-nothing: either every requested
//! backend is built and published, or nothing is. [`TelemetryCoordinator::shutdown`]
//! is best-effort: every registered backend is flushed even if an earlier one
//! fails.

use std::borrow::Cow;
use std::time::Duration;

use opentelemetry::global;
use opentelemetry::metrics::{Meter, MeterProvider};
use opentelemetry::trace::TracerProvider;
use opentelemetry_sdk::metrics::SdkMeterProvider;
use opentelemetry_sdk::trace::{SdkTracer, SdkTracerProvider};
use tracing::{info, warn};

use crate::telemetry::api::TelemetryProvider;
use crate::telemetry::config::TelemetryConfig;
use crate::telemetry::error::{SetupError, ShutdownError};
use crate::telemetry::otlp::OtlpProvider;
use crate::telemetry::propagation::install_propagator;
use crate::telemetry::resource::build_resource;
use crate::telemetry::shutdown::ShutdownRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    NotStarted,
    Running,
    Stopped,
}

/// Providers published by a successful setup.
///
/// Hand this to code that records spans or metrics instead of reaching for
/// the global slots. Cloning is cheap; clones share the same providers.
#[derive(Debug, Clone, Default)]
pub struct TelemetryHandles {
    tracer_provider: Option<SdkTracerProvider>,
    meter_provider: Option<SdkMeterProvider>,
}

impl TelemetryHandles {
    pub fn tracer_provider(&self) -> Option<&SdkTracerProvider> {
        self.tracer_provider.as_ref()
    }

    pub fn meter_provider(&self) -> Option<&SdkMeterProvider> {
        self.meter_provider.as_ref()
    }

    /// Named tracer, or `None` when tracing is disabled
    pub fn tracer(&self, name: impl Into<Cow<'static, str>>) -> Option<SdkTracer> {
        self.tracer_provider
            .as_ref()
            .map(|provider| provider.tracer(name))
    }

    /// Named meter. Falls back to the global meter, a no-op unless some
    /// other component installed a provider.
    pub fn meter(&self, name: &'static str) -> Meter {
        match &self.meter_provider {
            Some(provider) => provider.meter(name),
            None => global::meter(name),
        }
    }
}

/// Builds, publishes and tears down the tracing and metrics backends.
pub struct TelemetryCoordinator<P = OtlpProvider> {
    config: TelemetryConfig,
    provider: P,
    state: LifecycleState,
    registry: ShutdownRegistry,
    handles: TelemetryHandles,
    install_global: bool,
}

impl TelemetryCoordinator<OtlpProvider> {
    /// Coordinator exporting over OTLP/gRPC
    pub fn new(config: TelemetryConfig) -> Self {
        Self::with_provider(config, OtlpProvider)
    }
}

impl<P: TelemetryProvider> TelemetryCoordinator<P> {
    pub fn with_provider(config: TelemetryConfig, provider: P) -> Self {
        Self {
            config,
            provider,
            state: LifecycleState::NotStarted,
            registry: ShutdownRegistry::new(),
            handles: TelemetryHandles::default(),
            install_global: true,
        }
    }

    /// Keep the built providers out of the process-wide slots; they are
    /// reachable only through [`TelemetryHandles`].
    pub fn without_global_install(mut self) -> Self {
        self.install_global = false;
        self
    }

    pub fn config(&self) -> &TelemetryConfig {
        &self.config
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn handles(&self) -> &TelemetryHandles {
        &self.handles
    }

    /// Number of backends waiting to be shut down
    pub fn registered_backends(&self) -> usize {
        self.registry.len()
    }

    /// Build and publish every enabled backend.
    ///
    /// Must be called once, on a `NotStarted` coordinator. Tracing is built
    /// before metrics; a tracing failure means metrics is never attempted.
    /// On any error nothing is published and the coordinator stays
    /// `NotStarted`.
    pub async fn setup(&mut self) -> Result<&TelemetryHandles, SetupError> {
        if self.state != LifecycleState::NotStarted {
            return Err(SetupError::InvalidState(self.state));
        }

        let resource = build_resource(&self.config)?;
        install_propagator();

        let tracer_provider = if self.config.traces_enabled {
            let provider = self
                .provider
                .build_tracer_provider(&self.config, resource.clone())
                .await
                .map_err(SetupError::Tracing)?;
            Some(provider)
        } else {
            None
        };

        let meter_provider = if self.config.metrics_enabled {
            match self
                .provider
                .build_meter_provider(&self.config, resource)
                .await
            {
                Ok(provider) => Some(provider),
                Err(err) => {
                    if let Some(tracer_provider) = tracer_provider {
                        self.discard(tracer_provider);
                    }
                    return Err(SetupError::Metrics(err));
                }
            }
        } else {
            None
        };

        self.publish(tracer_provider, meter_provider);
        self.state = LifecycleState::Running;

        info!(
            service = %self.config.service_name,
            traces = self.config.traces_enabled,
            metrics = self.config.metrics_enabled,
            backends = self.registry.len(),
            "telemetry started"
        );
        Ok(&self.handles)
    }

    /// Flush and stop every registered backend, all within one `timeout`.
    ///
    /// The coordinator ends up `Stopped` whatever the outcome. Calling this
    /// on a coordinator that never started or already stopped is a no-op.
    pub fn shutdown(&mut self, timeout: Duration) -> Result<(), ShutdownError> {
        let previous = std::mem::replace(&mut self.state, LifecycleState::Stopped);
        if previous != LifecycleState::Running {
            return Ok(());
        }

        let result = self.registry.shutdown_all(timeout);
        match &result {
            Ok(()) => info!("telemetry stopped"),
            Err(err) => warn!(error = %err, "telemetry stopped with errors"),
        }
        result
    }

    fn publish(
        &mut self,
        tracer_provider: Option<SdkTracerProvider>,
        meter_provider: Option<SdkMeterProvider>,
    ) {
        if let Some(provider) = &tracer_provider {
            if self.install_global {
                global::set_tracer_provider(provider.clone());
            }
            self.registry.register(provider.clone());
        }

        if let Some(provider) = &meter_provider {
            if self.install_global {
                global::set_meter_provider(provider.clone());
            }
            self.registry.register(provider.clone());
        }

        self.handles = TelemetryHandles {
            tracer_provider,
            meter_provider,
        };
    }

    /// Stop a provider that was built but will never be published
    fn discard(&self, provider: SdkTracerProvider) {
        if let Err(err) = provider.shutdown_with_timeout(self.config.connect_timeout) {
            warn!(error = %err, "failed to stop unpublished tracer provider");
        }
    }
}
