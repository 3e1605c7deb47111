use std::{
    sync::{Arc, Weak},
    time::Duration,
};

use opentelemetry::KeyValue;
use opentelemetry_sdk::{
    error::{OTelSdkError, OTelSdkResult},
    metrics::{
        InstrumentKind, ManualReader, Pipeline, Temporality,
        data::{AggregatedMetrics, MetricData, ResourceMetrics},
        reader::MetricReader,
    },
};

/// Pull-based metrics reader.
///
/// Register it with a meter provider, then take snapshots of the collected
/// metrics whenever needed. Used by servers to serve scrape endpoints and by
/// tests to assert on counter values.
#[derive(Clone, Debug)]
pub struct MetricsExporter {
    reader: Arc<ManualReader>,
}

impl MetricsExporter {
    /// Collect the current state of all instruments.
    pub fn snapshot(&self) -> Result<ResourceMetrics, OTelSdkError> {
        let mut metrics = ResourceMetrics::default();
        self.reader.collect(&mut metrics)?;
        Ok(metrics)
    }

    /// Sum of a u64 counter across the data points whose attributes include
    /// all of `attributes`. Returns zero when the instrument has not been
    /// recorded yet.
    pub fn u64_counter_value(&self, name: &str, attributes: &[KeyValue]) -> u64 {
        let Ok(metrics) = self.snapshot() else {
            return 0;
        };

        metrics
            .scope_metrics()
            .flat_map(|scope| scope.metrics())
            .filter(|metric| metric.name() == name)
            .filter_map(|metric| match metric.data() {
                AggregatedMetrics::U64(MetricData::Sum(sum)) => Some(sum),
                _ => None,
            })
            .flat_map(|sum| sum.data_points())
            .filter(|point| {
                attributes
                    .iter()
                    .all(|attribute| point.attributes().any(|kv| kv == attribute))
            })
            .map(|point| point.value())
            .sum()
    }

    /// Total number of observations recorded by an f64 histogram.
    pub fn f64_histogram_count(&self, name: &str) -> u64 {
        let Ok(metrics) = self.snapshot() else {
            return 0;
        };

        metrics
            .scope_metrics()
            .flat_map(|scope| scope.metrics())
            .filter(|metric| metric.name() == name)
            .filter_map(|metric| match metric.data() {
                AggregatedMetrics::F64(MetricData::Histogram(histogram)) => Some(histogram),
                _ => None,
            })
            .flat_map(|histogram| histogram.data_points())
            .map(|point| point.count())
            .sum()
    }
}

impl MetricReader for MetricsExporter {
    fn register_pipeline(&self, pipeline: Weak<Pipeline>) {
        self.reader.register_pipeline(pipeline);
    }

    fn collect(&self, rm: &mut ResourceMetrics) -> OTelSdkResult {
        self.reader.collect(rm)
    }

    fn force_flush(&self) -> OTelSdkResult {
        self.reader.force_flush()
    }

    fn shutdown_with_timeout(&self, timeout: Duration) -> OTelSdkResult {
        self.reader.shutdown_with_timeout(timeout)
    }

    fn temporality(&self, kind: InstrumentKind) -> Temporality {
        self.reader.temporality(kind)
    }
}

impl Default for MetricsExporter {
    fn default() -> Self {
        let reader = ManualReader::builder().build();
        Self {
            reader: Arc::new(reader),
        }
    }
}
