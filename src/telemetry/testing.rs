//! In-memory metric pipeline for asserting on recorded data points.

use std::collections::HashMap;

use opentelemetry::metrics::{Meter, MeterProvider};
use opentelemetry_sdk::metrics::data::{AggregatedMetrics, MetricData};
use opentelemetry_sdk::metrics::{InMemoryMetricExporter, PeriodicReader, SdkMeterProvider};

/// One exported data point: its attributes rendered as strings, and its
/// value (sum value, or sample count for histograms)
#[derive(Debug, Clone)]
pub struct Point {
    pub attributes: HashMap<String, String>,
    pub value: f64,
}

impl Point {
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }
}

pub struct MetricsCapture {
    provider: SdkMeterProvider,
    exporter: InMemoryMetricExporter,
}

impl MetricsCapture {
    pub fn new() -> Self {
        let exporter = InMemoryMetricExporter::default();
        let provider = SdkMeterProvider::builder()
            .with_reader(PeriodicReader::builder(exporter.clone()).build())
            .build();
        Self { provider, exporter }
    }

    pub fn meter(&self, name: &'static str) -> Meter {
        self.provider.meter(name)
    }

    /// Flush and return the current points of metric `name`
    pub fn points(&self, name: &str) -> Vec<Point> {
        self.provider.force_flush().unwrap();
        let exported = self.exporter.get_finished_metrics().unwrap();
        self.exporter.reset();

        let mut points = Vec::new();
        for resource in &exported {
            for scope in resource.scope_metrics() {
                for metric in scope.metrics().filter(|metric| metric.name() == name) {
                    match metric.data() {
                        AggregatedMetrics::U64(MetricData::Sum(sum)) => {
                            points.extend(sum.data_points().map(|point| {
                                to_point(point.attributes(), point.value() as f64)
                            }))
                        }
                        AggregatedMetrics::F64(MetricData::Sum(sum)) => points.extend(
                            sum.data_points()
                                .map(|point| to_point(point.attributes(), point.value())),
                        ),
                        AggregatedMetrics::F64(MetricData::Histogram(histogram)) => {
                            points.extend(histogram.data_points().map(|point| {
                                to_point(point.attributes(), point.count() as f64)
                            }))
                        }
                        _ => panic!("unexpected aggregation for {}", name),
                    }
                }
            }
        }
        points
    }

    /// Sum of the values of every point of `name`
    pub fn total(&self, name: &str) -> f64 {
        self.points(name).iter().map(|point| point.value).sum()
    }
}

fn to_point<'a>(
    attributes: impl Iterator<Item = &'a opentelemetry::KeyValue>,
    value: f64,
) -> Point {
    Point {
        attributes: attributes
            .map(|kv| (kv.key.as_str().to_string(), kv.value.to_string()))
            .collect(),
        value,
    }
}
