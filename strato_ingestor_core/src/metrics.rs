use strato_observability::{Counter, Histogram, KeyValue, Meter};

/// Metrics for the batch consumer.
pub struct ConsumerMetrics {
    /// Number of records that reached a push attempt, regardless of outcome.
    pub records_total: Counter<u64>,
    /// Number of records that failed while processing, by cause.
    pub records_failed: Counter<u64>,
    /// Time taken to push a single record.
    pub processing_time: Histogram<f64>,
}

impl ConsumerMetrics {
    pub fn new(meter: &Meter) -> Self {
        Self {
            records_total: meter
                .u64_counter("ingestor.consumer.records")
                .with_unit("{record}")
                .with_description("number of attempted (pushed) records")
                .build(),
            records_failed: meter
                .u64_counter("ingestor.consumer.records.failed")
                .with_unit("{record}")
                .with_description(
                    "number of records that caused errors while processing, by cause",
                )
                .build(),
            processing_time: meter
                .f64_histogram("ingestor.consumer.processing_time")
                .with_unit("s")
                .with_description("time taken to process a single record")
                .build(),
        }
    }

    pub(crate) fn record_failure(&self, cause: &'static str) {
        self.records_failed.add(1, &[KeyValue::new("cause", cause)]);
    }
}

impl Default for ConsumerMetrics {
    fn default() -> Self {
        Self::new(&strato_observability::meter("ingestor"))
    }
}
