use std::env;
use std::fmt;
use std::time::Duration;

pub const DEFAULT_SERVICE_NAME: &str = "otel-service";
pub const DEFAULT_SERVICE_VERSION: &str = "0.1.0";
pub const DEFAULT_OTLP_ENDPOINT: &str = "localhost:4317";

/// Upper bound on establishing a collector connection
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Periodic reader export interval
pub const DEFAULT_METRICS_INTERVAL: Duration = Duration::from_secs(15);

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Pretty human-readable format with colors (for local dev)
    #[default]
    Pretty,
    /// JSON structured format (for collectors and log shippers)
    Json,
}

impl LogFormat {
    fn parse(value: &str) -> Self {
        match value {
            "json" => Self::Json,
            _ => Self::Pretty,
        }
    }
}

/// Main telemetry configuration
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub service_name: String,
    pub service_version: String,
    pub otlp_endpoint: String,
    pub traces_enabled: bool,
    pub metrics_enabled: bool,
    pub connect_timeout: Duration,
    pub metrics_interval: Duration,
    pub log_level: String,
    pub log_format: LogFormat,
}

impl TelemetryConfig {
    /// Create config from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Create config from an arbitrary variable source.
    ///
    /// Empty values count as unset. The enable flags are only `true` when
    /// the value is `true` in any casing.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |keys: &[&str]| {
            keys.iter()
                .filter_map(|key| lookup(*key))
                .find(|value| !value.is_empty())
        };
        let flag = |key: &str, default: bool| {
            var(&[key])
                .map(|value| value.to_lowercase() == "true")
                .unwrap_or(default)
        };

        Self {
            service_name: var(&["SERVICE_NAME", "OTEL_SERVICE_NAME"])
                .unwrap_or_else(|| DEFAULT_SERVICE_NAME.to_string()),
            service_version: var(&["SERVICE_VERSION", "OTEL_SERVICE_VERSION"])
                .unwrap_or_else(|| DEFAULT_SERVICE_VERSION.to_string()),
            otlp_endpoint: var(&["OTLP_ENDPOINT", "OTEL_EXPORTER_OTLP_ENDPOINT"])
                .unwrap_or_else(|| DEFAULT_OTLP_ENDPOINT.to_string()),
            traces_enabled: flag("TRACES_ENABLED", true),
            metrics_enabled: flag("METRICS_ENABLED", true),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            metrics_interval: DEFAULT_METRICS_INTERVAL,
            log_level: var(&["RUST_LOG"]).unwrap_or_else(|| "info".to_string()),
            log_format: var(&["LOG_FORMAT"])
                .map(|value| LogFormat::parse(&value))
                .unwrap_or_default(),
        }
    }

    /// Create a new config with explicit values and both signals enabled
    pub fn new(service_name: impl Into<String>, service_version: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            service_version: service_version.into(),
            otlp_endpoint: DEFAULT_OTLP_ENDPOINT.to_string(),
            traces_enabled: true,
            metrics_enabled: true,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            metrics_interval: DEFAULT_METRICS_INTERVAL,
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
        }
    }

    pub fn builder() -> TelemetryConfigBuilder {
        TelemetryConfigBuilder::default()
    }

    pub fn with_service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = name.into();
        self
    }

    pub fn with_otlp_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.otlp_endpoint = endpoint.into();
        self
    }

    pub fn with_traces(mut self, enabled: bool) -> Self {
        self.traces_enabled = enabled;
        self
    }

    pub fn with_metrics(mut self, enabled: bool) -> Self {
        self.metrics_enabled = enabled;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_metrics_interval(mut self, interval: Duration) -> Self {
        self.metrics_interval = interval;
        self
    }

    pub fn with_log_format(mut self, format: LogFormat) -> Self {
        self.log_format = format;
        self
    }

    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }
}

impl fmt::Display for TelemetryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  Service:")?;
        writeln!(f, "    Name: {}", self.service_name)?;
        writeln!(f, "    Version: {}", self.service_version)?;
        writeln!(f, "  OpenTelemetry:")?;
        writeln!(f, "    OTLP Endpoint: {}", self.otlp_endpoint)?;
        writeln!(f, "    Traces Enabled: {}", self.traces_enabled)?;
        writeln!(f, "    Metrics Enabled: {}", self.metrics_enabled)
    }
}

#[derive(Default)]
pub struct TelemetryConfigBuilder {
    service_name: Option<String>,
    service_version: Option<String>,
    otlp_endpoint: Option<String>,
    traces_enabled: Option<bool>,
    metrics_enabled: Option<bool>,
    connect_timeout: Option<Duration>,
    metrics_interval: Option<Duration>,
    log_level: Option<String>,
    log_format: Option<LogFormat>,
}

impl TelemetryConfigBuilder {
    pub fn service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = Some(name.into());
        self
    }

    pub fn service_version(mut self, version: impl Into<String>) -> Self {
        self.service_version = Some(version.into());
        self
    }

    pub fn otlp_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.otlp_endpoint = Some(endpoint.into());
        self
    }

    pub fn traces(mut self, enabled: bool) -> Self {
        self.traces_enabled = Some(enabled);
        self
    }

    pub fn metrics(mut self, enabled: bool) -> Self {
        self.metrics_enabled = Some(enabled);
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    pub fn metrics_interval(mut self, interval: Duration) -> Self {
        self.metrics_interval = Some(interval);
        self
    }

    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = Some(level.into());
        self
    }

    pub fn log_format(mut self, format: LogFormat) -> Self {
        self.log_format = Some(format);
        self
    }

    pub fn json(self) -> Self {
        self.log_format(LogFormat::Json)
    }

    pub fn pretty(self) -> Self {
        self.log_format(LogFormat::Pretty)
    }

    pub fn build(self) -> TelemetryConfig {
        TelemetryConfig {
            service_name: self
                .service_name
                .unwrap_or_else(|| DEFAULT_SERVICE_NAME.to_string()),
            service_version: self
                .service_version
                .unwrap_or_else(|| DEFAULT_SERVICE_VERSION.to_string()),
            otlp_endpoint: self
                .otlp_endpoint
                .unwrap_or_else(|| DEFAULT_OTLP_ENDPOINT.to_string()),
            traces_enabled: self.traces_enabled.unwrap_or(true),
            metrics_enabled: self.metrics_enabled.unwrap_or(true),
            connect_timeout: self.connect_timeout.unwrap_or(DEFAULT_CONNECT_TIMEOUT),
            metrics_interval: self.metrics_interval.unwrap_or(DEFAULT_METRICS_INTERVAL),
            log_level: self.log_level.unwrap_or_else(|| "info".to_string()),
            log_format: self.log_format.unwrap_or_default(),
        }
    }
}
