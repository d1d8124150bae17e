use opentelemetry::KeyValue;
use opentelemetry_sdk::Resource;
use opentelemetry_semantic_conventions::resource::{SERVICE_NAME, SERVICE_VERSION};

use crate::telemetry::config::TelemetryConfig;
use crate::telemetry::error::SetupError;

/// Get base attributes for any resource
pub fn base_attributes(config: &TelemetryConfig) -> Vec<KeyValue> {
    vec![
        KeyValue::new(SERVICE_NAME, config.service_name.clone()),
        KeyValue::new(SERVICE_VERSION, config.service_version.clone()),
    ]
}

/// Build the resource attached to every exported span and metric.
///
/// Fails when the service name is blank, since collectors key everything
/// on `service.name`.
pub fn build_resource(config: &TelemetryConfig) -> Result<Resource, SetupError> {
    if config.service_name.trim().is_empty() {
        return Err(SetupError::Resource("service name must not be empty".into()));
    }

    Ok(Resource::builder()
        .with_attributes(base_attributes(config))
        .build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use opentelemetry::{Key, Value};

    fn test_config() -> TelemetryConfig {
        TelemetryConfig::new("test-service", "1.2.3")
    }

    #[test]
    fn base_attributes_contains_service_name() {
        let config = test_config();
        let attrs = base_attributes(&config);

        let has_service_name = attrs
            .iter()
            .any(|kv| kv.key.as_str() == SERVICE_NAME && kv.value.as_str() == "test-service");

        assert!(has_service_name);
    }

    #[test]
    fn base_attributes_contains_service_version() {
        let config = test_config();
        let attrs = base_attributes(&config);

        let has_version = attrs
            .iter()
            .any(|kv| kv.key.as_str() == SERVICE_VERSION && kv.value.as_str() == "1.2.3");

        assert!(has_version);
    }

    #[test]
    fn build_resource_carries_service_identity() {
        let resource = build_resource(&test_config()).unwrap();

        assert_eq!(
            resource.get(&Key::new(SERVICE_NAME)),
            Some(Value::from("test-service"))
        );
        assert_eq!(
            resource.get(&Key::new(SERVICE_VERSION)),
            Some(Value::from("1.2.3"))
        );
    }

    #[test]
    fn build_resource_rejects_empty_service_name() {
        let config = TelemetryConfig::new("", "1.0.0");

        let err = build_resource(&config).unwrap_err();

        assert!(matches!(err, SetupError::Resource(_)));
    }

    #[test]
    fn build_resource_rejects_blank_service_name() {
        let config = TelemetryConfig::new("   ", "1.0.0");

        assert!(build_resource(&config).is_err());
    }
}
