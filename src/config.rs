use std::collections::HashMap;
use std::env;
use std::fmt;

use crate::telemetry::TelemetryConfig;

pub const DEFAULT_SERVER_PORT: u16 = 8080;
pub const DEFAULT_SERVER_URL: &str = "http://localhost:8080/hello";

/// Application configuration shared by the server and client binaries
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub telemetry: TelemetryConfig,
    pub server_port: u16,
    /// Target of the client request loop
    pub server_url: String,
    /// Headers the client adds to every request that does not set them
    pub default_headers: HashMap<String, String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// A `SERVER_PORT` that does not parse is ignored.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let server_port = lookup("SERVER_PORT")
            .and_then(|value| value.parse().ok())
            .unwrap_or(DEFAULT_SERVER_PORT);
        let server_url = lookup("SERVER_URL")
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string());

        Self {
            telemetry: TelemetryConfig::from_lookup(&lookup),
            server_port,
            server_url,
            default_headers: HashMap::new(),
        }
    }

    pub fn new(telemetry: TelemetryConfig) -> Self {
        Self {
            telemetry,
            server_port: DEFAULT_SERVER_PORT,
            server_url: DEFAULT_SERVER_URL.to_string(),
            default_headers: HashMap::new(),
        }
    }

    pub fn with_server_port(mut self, port: u16) -> Self {
        self.server_port = port;
        self
    }

    pub fn with_default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.insert(name.into(), value.into());
        self
    }
}

impl fmt::Display for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Configuration:")?;
        write!(f, "{}", self.telemetry)?;
        writeln!(f, "  Server:")?;
        writeln!(f, "    Port: {}", self.server_port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_lookup_defaults() {
        let config = AppConfig::from_lookup(|_| None);

        assert_eq!(config.server_port, 8080);
        assert_eq!(config.server_url, DEFAULT_SERVER_URL);
        assert_eq!(config.telemetry.service_name, "otel-service");
        assert!(config.default_headers.is_empty());
    }

    #[test]
    fn from_lookup_reads_port() {
        let config = AppConfig::from_lookup(|key| match key {
            "SERVER_PORT" => Some("9090".to_string()),
            "SERVICE_NAME" => Some("svc".to_string()),
            _ => None,
        });

        assert_eq!(config.server_port, 9090);
        assert_eq!(config.telemetry.service_name, "svc");
    }

    #[test]
    fn invalid_port_keeps_default() {
        let config = AppConfig::from_lookup(|key| {
            (key == "SERVER_PORT").then(|| "not-a-port".to_string())
        });

        assert_eq!(config.server_port, DEFAULT_SERVER_PORT);
    }

    #[test]
    fn display_includes_all_sections() {
        let config = AppConfig::new(TelemetryConfig::new("svc", "1.0")).with_server_port(3000);
        let rendered = config.to_string();

        assert!(rendered.starts_with("Configuration:"));
        assert!(rendered.contains("OTLP Endpoint: localhost:4317"));
        assert!(rendered.contains("Port: 3000"));
    }
}
