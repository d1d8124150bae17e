use opentelemetry::metrics::{Counter, Histogram, Meter, UpDownCounter};

pub fn new_counter(meter: &Meter, name: &'static str, description: &'static str) -> Counter<u64> {
    meter.u64_counter(name).with_description(description).build()
}

/// Histogram of durations, recorded in seconds
pub fn new_histogram(
    meter: &Meter,
    name: &'static str,
    description: &'static str,
) -> Histogram<f64> {
    meter
        .f64_histogram(name)
        .with_description(description)
        .with_unit("s")
        .build()
}

pub fn new_gauge(
    meter: &Meter,
    name: &'static str,
    description: &'static str,
) -> UpDownCounter<f64> {
    meter
        .f64_up_down_counter(name)
        .with_description(description)
        .build()
}
