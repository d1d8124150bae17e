use std::future::{self, Ready};
use std::rc::Rc;
use std::time::{Duration, Instant};

use actix_web::body::MessageBody;
use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::Error;
use futures::future::LocalBoxFuture;
use opentelemetry::metrics::{Counter, Histogram, Meter, UpDownCounter};
use opentelemetry::KeyValue;
use opentelemetry_semantic_conventions::attribute::{
    HTTP_REQUEST_METHOD, HTTP_RESPONSE_STATUS_CODE, HTTP_ROUTE,
};

use crate::telemetry::instruments::{new_counter, new_gauge, new_histogram};

/// Route label for requests that matched no registered pattern
const UNKNOWN_ROUTE: &str = "unknown";

/// Server-side HTTP instruments
#[derive(Clone)]
pub struct HttpServerMetrics {
    request_count: Counter<u64>,
    request_duration: Histogram<f64>,
    error_count: Counter<u64>,
    active_requests: UpDownCounter<f64>,
}

impl HttpServerMetrics {
    pub fn new(meter: &Meter) -> Self {
        Self {
            request_count: new_counter(
                meter,
                "http.server.request_count",
                "Number of HTTP requests",
            ),
            request_duration: new_histogram(
                meter,
                "http.server.duration",
                "Duration of HTTP requests",
            ),
            error_count: new_counter(meter, "http.server.error_count", "Number of HTTP errors"),
            active_requests: new_gauge(
                meter,
                "http.server.active_requests",
                "Number of in-flight HTTP requests",
            ),
        }
    }

    /// Count a request as in flight until the returned guard is dropped
    fn in_flight(&self, method: &str) -> InFlight {
        let attributes = [KeyValue::new(HTTP_REQUEST_METHOD, method.to_string())];
        self.active_requests.add(1.0, &attributes);
        InFlight {
            gauge: self.active_requests.clone(),
            attributes,
        }
    }

    /// Record one finished request. Statuses of 400 and above also count
    /// as errors.
    pub fn record(&self, method: &str, route: &str, status: u16, elapsed: Duration) {
        let attributes = [
            KeyValue::new(HTTP_REQUEST_METHOD, method.to_string()),
            KeyValue::new(HTTP_ROUTE, route.to_string()),
            KeyValue::new(HTTP_RESPONSE_STATUS_CODE, i64::from(status)),
        ];

        self.request_count.add(1, &attributes);
        self.request_duration
            .record(elapsed.as_secs_f64(), &attributes);
        if status >= 400 {
            self.error_count.add(1, &attributes);
        }
    }
}

/// Decrements the in-flight gauge on drop, including when actix drops the
/// request future before it completes.
struct InFlight {
    gauge: UpDownCounter<f64>,
    attributes: [KeyValue; 1],
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.gauge.add(-1.0, &self.attributes);
    }
}

/// Records request count, duration and errors for every request.
///
/// Register it with `App::wrap`; the route label is read from the matched
/// resource pattern once the inner service has run.
///
/// ```ignore
/// App::new()
///     .wrap(RequestMetrics::new(HttpServerMetrics::new(&meter)))
///     .service(hello)
/// ```
#[derive(Clone)]
pub struct RequestMetrics {
    metrics: HttpServerMetrics,
}

impl RequestMetrics {
    pub fn new(metrics: HttpServerMetrics) -> Self {
        Self { metrics }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RequestMetrics
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = RequestMetricsService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        future::ready(Ok(RequestMetricsService {
            service: Rc::new(service),
            metrics: self.metrics.clone(),
        }))
    }
}

/// This service implements the request metrics behavior
pub struct RequestMetricsService<S> {
    service: Rc<S>,
    metrics: HttpServerMetrics,
}

impl<S, B> Service<ServiceRequest> for RequestMetricsService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;
    type Response = ServiceResponse<B>;

    forward_ready!(service);

    fn call(&self, request: ServiceRequest) -> Self::Future {
        let started = Instant::now();
        let method = request.method().to_string();
        let metrics = self.metrics.clone();
        let in_flight = metrics.in_flight(&method);
        let response = self.service.call(request);

        Box::pin(async move {
            let result = response.await;
            // The request must not be held across routing, the router mutates it.
            let (status, route) = match &result {
                Ok(response) => (response.status(), response.request().match_pattern()),
                Err(err) => (err.as_response_error().status_code(), None),
            };
            let route = route.unwrap_or_else(|| UNKNOWN_ROUTE.to_string());

            metrics.record(&method, &route, status.as_u16(), started.elapsed());
            drop(in_flight);
            result
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::testing::MetricsCapture;
    use actix_web::test::{call_service, init_service, TestRequest};
    use actix_web::{web, App, HttpResponse};

    const REQUESTS: &str = "http.server.request_count";
    const DURATION: &str = "http.server.duration";
    const ERRORS: &str = "http.server.error_count";
    const ACTIVE: &str = "http.server.active_requests";

    fn capture() -> (MetricsCapture, RequestMetrics) {
        let capture = MetricsCapture::new();
        let metrics = HttpServerMetrics::new(&capture.meter("middleware-test"));
        (capture, RequestMetrics::new(metrics))
    }

    #[actix_web::test]
    async fn records_request_with_method_route_and_status() {
        let (capture, middleware) = capture();
        let app = init_service(App::new().wrap(middleware).route(
            "/users/{id}",
            web::get().to(|| async { HttpResponse::Ok().body("ok") }),
        ))
        .await;

        let response = call_service(&app, TestRequest::get().uri("/users/7").to_request()).await;
        assert!(response.status().is_success());

        let requests = capture.points(REQUESTS);
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].value, 1.0);
        assert_eq!(requests[0].attr(HTTP_REQUEST_METHOD), Some("GET"));
        assert_eq!(requests[0].attr(HTTP_ROUTE), Some("/users/{id}"));
        assert_eq!(requests[0].attr(HTTP_RESPONSE_STATUS_CODE), Some("200"));

        let durations = capture.points(DURATION);
        assert_eq!(durations.len(), 1);
        assert_eq!(durations[0].value, 1.0);
        assert_eq!(durations[0].attr(HTTP_ROUTE), Some("/users/{id}"));

        assert_eq!(capture.total(ERRORS), 0.0);
    }

    #[actix_web::test]
    async fn counts_errors_only_from_status_400() {
        let (capture, middleware) = capture();
        let app = init_service(
            App::new()
                .wrap(middleware)
                .route("/ok", web::get().to(|| async { HttpResponse::Ok().finish() }))
                .route(
                    "/redirect",
                    web::get().to(|| async { HttpResponse::Found().finish() }),
                )
                .route(
                    "/bad",
                    web::get().to(|| async { HttpResponse::BadRequest().finish() }),
                )
                .route(
                    "/boom",
                    web::get().to(|| async { HttpResponse::InternalServerError().finish() }),
                ),
        )
        .await;

        for uri in ["/ok", "/redirect", "/bad", "/boom"] {
            call_service(&app, TestRequest::get().uri(uri).to_request()).await;
        }

        assert_eq!(capture.total(REQUESTS), 4.0);
        let mut errors: Vec<_> = capture
            .points(ERRORS)
            .iter()
            .map(|point| {
                (
                    point.attr(HTTP_ROUTE).unwrap().to_string(),
                    point.attr(HTTP_RESPONSE_STATUS_CODE).unwrap().to_string(),
                )
            })
            .collect();
        errors.sort();
        assert_eq!(
            errors,
            vec![
                ("/bad".to_string(), "400".to_string()),
                ("/boom".to_string(), "500".to_string()),
            ]
        );
    }

    #[actix_web::test]
    async fn unmatched_routes_are_labelled_unknown() {
        let (capture, middleware) = capture();
        let app = init_service(App::new().wrap(middleware)).await;

        let response = call_service(&app, TestRequest::get().uri("/missing").to_request()).await;
        assert_eq!(response.status().as_u16(), 404);

        let requests = capture.points(REQUESTS);
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].attr(HTTP_ROUTE), Some(UNKNOWN_ROUTE));
        let errors = capture.points(ERRORS);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].attr(HTTP_RESPONSE_STATUS_CODE), Some("404"));
    }

    #[actix_web::test]
    async fn in_flight_gauge_returns_to_zero_after_completion() {
        let (capture, middleware) = capture();
        let app = init_service(
            App::new()
                .wrap(middleware)
                .route("/ok", web::get().to(|| async { HttpResponse::Ok().finish() })),
        )
        .await;

        call_service(&app, TestRequest::get().uri("/ok").to_request()).await;

        assert_eq!(capture.total(ACTIVE), 0.0);
    }

    #[actix_web::test]
    async fn dropped_request_releases_in_flight_gauge() {
        let (capture, middleware) = capture();
        let app = init_service(App::new().wrap(middleware).route(
            "/slow",
            web::get().to(|| async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                HttpResponse::Ok().finish()
            }),
        ))
        .await;

        let pending = app.call(TestRequest::get().uri("/slow").to_request());
        let outcome = tokio::time::timeout(Duration::from_millis(20), pending).await;
        assert!(outcome.is_err());

        assert_eq!(capture.total(ACTIVE), 0.0);
        assert_eq!(capture.total(REQUESTS), 0.0);
    }
}
