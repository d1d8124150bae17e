use opentelemetry::trace::TracerProvider;
use opentelemetry_sdk::trace::{SdkTracer, SdkTracerProvider};
use serde_json::{Map, Value};
use tracing::field::{Field, Visit};
use tracing::{Dispatch, Event, Level, Subscriber};
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::fmt::format::{FmtSpan, Writer};
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields, FormattedFields};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::telemetry::config::{LogFormat, TelemetryConfig};
use crate::telemetry::lifecycle::TelemetryHandles;

/// Bridge `tracing` spans into the given tracer provider
pub fn build_otel_layer<S>(
    provider: &SdkTracerProvider,
    service_name: &str,
) -> OpenTelemetryLayer<S, SdkTracer>
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    let tracer = provider.tracer(service_name.to_string());
    tracing_opentelemetry::layer().with_tracer(tracer)
}

/// One JSON object per line.
///
/// `severity`, `timestamp`, `target` and `message` sit at the root next to
/// the event fields. `spans` lists the enclosing spans from the root down,
/// and `span` carries the innermost one with its recorded fields.
struct JsonLogFormat;

impl JsonLogFormat {
    fn severity(level: &Level) -> &'static str {
        match *level {
            Level::ERROR => "ERROR",
            Level::WARN => "WARNING",
            Level::INFO => "INFO",
            Level::DEBUG | Level::TRACE => "DEBUG",
        }
    }
}

impl<S, N> FormatEvent<S, N> for JsonLogFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> std::fmt::Result {
        let metadata = event.metadata();
        let mut record = Map::new();
        record.insert("severity".into(), Self::severity(metadata.level()).into());
        record.insert(
            "timestamp".into(),
            chrono::Utc::now()
                .to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
                .into(),
        );
        record.insert("target".into(), metadata.target().into());

        if let Some(scope) = ctx.event_scope() {
            let names: Vec<Value> = scope.from_root().map(|span| span.name().into()).collect();
            record.insert("spans".into(), Value::Array(names));
        }

        if let Some(span) = ctx.lookup_current() {
            let mut current = Map::new();
            current.insert("name".into(), span.name().into());
            if let Some(fields) = span.extensions().get::<FormattedFields<N>>() {
                if !fields.is_empty() {
                    current.insert("fields".into(), fields.as_str().into());
                }
            }
            record.insert("span".into(), Value::Object(current));
        }

        event.record(&mut FieldCollector(&mut record));

        let line = serde_json::to_string(&record).map_err(|_| std::fmt::Error)?;
        writeln!(writer, "{}", line)
    }
}

/// Copies event fields into the JSON record, keeping numbers and booleans typed
struct FieldCollector<'a>(&'a mut Map<String, Value>);

impl FieldCollector<'_> {
    fn insert(&mut self, field: &Field, value: Value) {
        self.0.insert(field.name().to_string(), value);
    }
}

impl Visit for FieldCollector<'_> {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.insert(field, Value::String(format!("{:?}", value)));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.insert(field, value.into());
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.insert(field, value.into());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.insert(field, value.into());
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.insert(field, value.into());
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.insert(field, value.into());
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.insert(field, value.to_string().into());
    }
}

/// Console output in the configured format
pub fn console_layer<S>(format: LogFormat) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    match format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .event_format(JsonLogFormat)
            .with_ansi(false)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .pretty()
            .with_thread_ids(false)
            .with_thread_names(false)
            .with_span_events(FmtSpan::CLOSE)
            .boxed(),
    }
}

/// `RUST_LOG` when set, otherwise the configured level
pub fn build_filter(config: &TelemetryConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level))
}

/// Console-only dispatcher for the window before the global subscriber
/// exists, typically wrapped around `TelemetryCoordinator::setup` with
/// [`tracing::instrument::WithSubscriber`].
pub fn console_dispatch(config: &TelemetryConfig) -> Dispatch {
    tracing_subscriber::registry()
        .with(build_filter(config))
        .with(console_layer(config.log_format))
        .into()
}

/// Install the global subscriber.
///
/// Spans are bridged to OpenTelemetry only when `handles` carries a tracer
/// provider, i.e. tracing was enabled and set up successfully.
pub fn init_subscriber(config: &TelemetryConfig, handles: &TelemetryHandles) {
    let otel_layer = handles
        .tracer_provider()
        .map(|provider| build_otel_layer(provider, &config.service_name));

    tracing_subscriber::registry()
        .with(build_filter(config))
        .with(otel_layer)
        .with(console_layer(config.log_format))
        .init();
}
