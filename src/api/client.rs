use opentelemetry::metrics::{Counter, Meter};
use opentelemetry::KeyValue;
use opentelemetry_semantic_conventions::attribute::{
    HTTP_REQUEST_METHOD, HTTP_RESPONSE_STATUS_CODE, URL_FULL,
};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, Response, Url};
use thiserror::Error;
use tracing::{field, Instrument};

use crate::api::propagation::inject_current_context;
use crate::config::AppConfig;
use crate::telemetry::instruments::new_counter;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid default header {name:?}: {reason}")]
    InvalidHeader { name: String, reason: String },

    #[error("invalid url {0:?}")]
    InvalidUrl(String),

    #[error(transparent)]
    Request(#[from] reqwest::Error),
}

/// HTTP client that propagates trace context and records request metrics
pub struct Client {
    inner: reqwest::Client,
    default_headers: HeaderMap,
    request_count: Counter<u64>,
    error_count: Counter<u64>,
}

impl Client {
    pub fn new(config: &AppConfig, meter: &Meter) -> Result<Self, ClientError> {
        let mut default_headers = HeaderMap::new();
        for (name, value) in &config.default_headers {
            let invalid = |reason: String| ClientError::InvalidHeader {
                name: name.clone(),
                reason,
            };
            let header_name =
                HeaderName::from_bytes(name.as_bytes()).map_err(|e| invalid(e.to_string()))?;
            let header_value = HeaderValue::from_str(value).map_err(|e| invalid(e.to_string()))?;
            default_headers.insert(header_name, header_value);
        }

        Ok(Self {
            inner: reqwest::Client::new(),
            default_headers,
            request_count: new_counter(
                meter,
                "http.client.request_count",
                "Number of outgoing HTTP requests",
            ),
            error_count: new_counter(
                meter,
                "http.client.error_count",
                "Number of outgoing HTTP errors",
            ),
        })
    }

    pub async fn get(&self, url: &str) -> Result<Response, ClientError> {
        let url = Url::parse(url).map_err(|_| ClientError::InvalidUrl(url.to_string()))?;
        self.execute(Method::GET, url, HeaderMap::new()).await
    }

    /// Send a request inside a client span named `"<METHOD> <path>"`.
    ///
    /// Transport failures and statuses of 400 and above are counted as
    /// errors; only transport failures are returned as `Err`.
    pub async fn execute(
        &self,
        method: Method,
        url: Url,
        headers: HeaderMap,
    ) -> Result<Response, ClientError> {
        let span = tracing::info_span!(
            "http.client.request",
            otel.name = %format!("{} {}", method, url.path()),
            otel.kind = "client",
            http.request.method = %method,
            url.full = %url,
            http.response.status_code = field::Empty,
        );

        async move {
            let mut headers = self.merged_headers(&headers);
            inject_current_context(&mut headers);

            let attributes = [
                KeyValue::new(HTTP_REQUEST_METHOD, method.to_string()),
                KeyValue::new(URL_FULL, url.to_string()),
            ];
            self.request_count.add(1, &attributes);

            let response = match self.inner.request(method, url).headers(headers).send().await {
                Ok(response) => response,
                Err(err) => {
                    self.error_count.add(1, &attributes);
                    tracing::warn!(error = %err, "request failed");
                    return Err(err.into());
                }
            };

            let status = response.status();
            tracing::Span::current().record("http.response.status_code", status.as_u16());
            if status.as_u16() >= 400 {
                let [method, url] = attributes;
                self.error_count.add(
                    1,
                    &[
                        method,
                        url,
                        KeyValue::new(HTTP_RESPONSE_STATUS_CODE, i64::from(status.as_u16())),
                    ],
                );
            }

            Ok(response)
        }
        .instrument(span)
        .await
    }

    /// Default headers merged with caller headers; caller values win
    fn merged_headers(&self, headers: &HeaderMap) -> HeaderMap {
        let mut merged = headers.clone();
        for (name, value) in &self.default_headers {
            if !merged.contains_key(name) {
                merged.insert(name.clone(), value.clone());
            }
        }
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::testing::MetricsCapture;
    use crate::telemetry::TelemetryConfig;
    use opentelemetry::metrics::MeterProvider;
    use opentelemetry_sdk::metrics::SdkMeterProvider;
    use std::io::{Read, Write};
    use std::net::TcpListener;

    const REQUESTS: &str = "http.client.request_count";
    const ERRORS: &str = "http.client.error_count";

    /// Answers each of `statuses` on its own connection, in order
    fn serve_statuses(statuses: &'static [u16]) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        std::thread::spawn(move || {
            for (status, stream) in statuses.iter().zip(listener.incoming()) {
                let mut stream = stream.unwrap();
                let mut request = [0u8; 4096];
                let _ = stream.read(&mut request);
                let response = format!(
                    "HTTP/1.1 {} Status\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
                    status
                );
                stream.write_all(response.as_bytes()).unwrap();
            }
        });
        format!("http://{}", addr)
    }

    fn meter() -> Meter {
        SdkMeterProvider::builder().build().meter("client-test")
    }

    fn config() -> AppConfig {
        AppConfig::new(TelemetryConfig::new("client-test", "1.0"))
    }

    #[test]
    fn rejects_invalid_default_header() {
        let config = config().with_default_header("bad header", "value");

        let result = Client::new(&config, &meter());

        assert!(matches!(result, Err(ClientError::InvalidHeader { .. })));
    }

    #[test]
    fn default_headers_do_not_override_caller_headers() {
        let config = config()
            .with_default_header("x-tenant", "default")
            .with_default_header("x-source", "otel-client");
        let client = Client::new(&config, &meter()).unwrap();
        let mut headers = HeaderMap::new();
        headers.insert("x-tenant", HeaderValue::from_static("explicit"));

        let merged = client.merged_headers(&headers);

        assert_eq!(merged.get("x-tenant").unwrap(), "explicit");
        assert_eq!(merged.get("x-source").unwrap(), "otel-client");
    }

    #[tokio::test]
    async fn get_rejects_invalid_url() {
        let client = Client::new(&config(), &meter()).unwrap();

        let result = client.get("not a url").await;

        assert!(matches!(result, Err(ClientError::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn get_reports_transport_errors() {
        let client = Client::new(&config(), &meter()).unwrap();

        let result = client.get("http://127.0.0.1:1/hello").await;

        assert!(matches!(result, Err(ClientError::Request(_))));
    }

    #[tokio::test]
    async fn counts_requests_and_only_status_errors() {
        let base = serve_statuses(&[200, 404, 503]);
        let capture = MetricsCapture::new();
        let client = Client::new(&config(), &capture.meter("client-test")).unwrap();

        let mut received = Vec::new();
        for path in ["/ok", "/missing", "/down"] {
            let response = client.get(&format!("{}{}", base, path)).await.unwrap();
            received.push(response.status().as_u16());
        }
        assert_eq!(received, vec![200, 404, 503]);

        let requests = capture.points(REQUESTS);
        assert_eq!(requests.len(), 3);
        assert!(requests
            .iter()
            .all(|point| point.attr(HTTP_REQUEST_METHOD) == Some("GET") && point.value == 1.0));

        let mut statuses: Vec<_> = capture
            .points(ERRORS)
            .iter()
            .map(|point| point.attr(HTTP_RESPONSE_STATUS_CODE).unwrap().to_string())
            .collect();
        statuses.sort();
        assert_eq!(statuses, vec!["404", "503"]);
    }

    #[tokio::test]
    async fn transport_failures_count_as_errors() {
        let capture = MetricsCapture::new();
        let client = Client::new(&config(), &capture.meter("client-test")).unwrap();

        let result = client.get("http://127.0.0.1:1/hello").await;
        assert!(result.is_err());

        assert_eq!(capture.total(REQUESTS), 1.0);
        let errors = capture.points(ERRORS);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].attr(URL_FULL), Some("http://127.0.0.1:1/hello"));
        assert_eq!(errors[0].attr(HTTP_RESPONSE_STATUS_CODE), None);
    }
}
