use std::{sync::Arc, time::Instant};

use snafu::ResultExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

use crate::{
    decoder::{DecodedRecord, RecordDecoder, decode_records},
    error::{RecordPushSnafu, Result},
    metrics::ConsumerMetrics,
    record::Record,
    sink::{ClientErrorLogPolicy, LogAllClientErrors, StorageSink},
};

/// Consumes ordered batches of records: decodes each record and pushes the
/// decoded write request to the storage sink.
///
/// Decoding of the next record overlaps with pushing of the current one;
/// pushes themselves are strictly sequential and in batch order.
pub struct BatchConsumer<D: RecordDecoder> {
    decoder: Arc<D>,
    sink: Arc<dyn StorageSink<D::Request>>,
    log_policy: Arc<dyn ClientErrorLogPolicy>,
    metrics: ConsumerMetrics,
}

impl<D: RecordDecoder> BatchConsumer<D> {
    pub fn new(decoder: Arc<D>, sink: Arc<dyn StorageSink<D::Request>>) -> Self {
        Self::with_log_policy(decoder, sink, Arc::new(LogAllClientErrors))
    }

    pub fn with_log_policy(
        decoder: Arc<D>,
        sink: Arc<dyn StorageSink<D::Request>>,
        log_policy: Arc<dyn ClientErrorLogPolicy>,
    ) -> Self {
        Self {
            decoder,
            sink,
            log_policy,
            metrics: ConsumerMetrics::default(),
        }
    }

    /// Replace the metrics, keeping everything else.
    pub fn with_metrics(mut self, metrics: ConsumerMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    /// Consume one batch of records, in order.
    ///
    /// Returns `Ok(())` once the batch is exhausted or consumption is
    /// cancelled. Returns an error on the first server-classified push
    /// failure; records after the failed one are not pushed. Decode failures
    /// and client-classified push failures never abort the batch.
    pub async fn consume(&self, ct: CancellationToken, records: Vec<Record>) -> Result<()> {
        // Single-slot handoff between the two stages.
        let (tx, rx) = mpsc::channel(1);

        let ct = ct.child_token();
        // Cancels the decoder stage on every exit path, including this
        // future being dropped while a push is in flight.
        let _decoder_guard = ct.clone().drop_guard();

        let decoder_task = tokio::spawn(decode_records(
            self.decoder.clone(),
            records,
            tx,
            ct.clone(),
        ));

        let result = self.push_records(rx).await;

        // The decoder task must not outlive this call.
        ct.cancel();
        let _ = decoder_task.await;

        result
    }

    /// Pusher stage: push decoded records until the handoff channel closes.
    async fn push_records(&self, mut rx: mpsc::Receiver<DecodedRecord<D::Request>>) -> Result<()> {
        let mut index = 0;
        while let Some(decoded) = rx.recv().await {
            self.push_decoded(index, decoded).await?;
            index += 1;
        }
        Ok(())
    }

    async fn push_decoded(&self, index: usize, decoded: DecodedRecord<D::Request>) -> Result<()> {
        let request = match decoded.request {
            Ok(request) => request,
            Err(decode_error) => {
                error!(index, error = %decode_error, "failed to decode write request, skipping record");
                return Ok(());
            }
        };

        let started_at = Instant::now();
        let pushed = self.sink.push(&decoded.tenant_id, request).await;
        let elapsed = started_at.elapsed();

        // Recorded whatever the push outcome, but only for records that
        // reached a push attempt.
        self.metrics
            .processing_time
            .record(elapsed.as_secs_f64(), &[]);
        self.metrics.records_total.add(1, &[]);

        let Err(push_error) = pushed else {
            return Ok(());
        };

        self.metrics.record_failure(push_error.cause());

        if !push_error.is_client() {
            return Err(push_error).context(RecordPushSnafu {
                index,
                tenant_id: decoded.tenant_id,
            });
        }

        // The error could be sampled or marked to be skipped in logs, so we
        // check whether it should be logged before doing it.
        if self
            .log_policy
            .should_log(&decoded.tenant_id, &push_error, elapsed)
        {
            warn!(
                tenant_id = %decoded.tenant_id,
                error = %push_error,
                "client error while pushing write request, the request may have been partially applied",
            );
        }

        Ok(())
    }
}
