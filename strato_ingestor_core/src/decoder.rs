use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::{
    error::DecodeError,
    record::{Record, TenantId},
};

/// Decodes the opaque content of a record into a write request.
///
/// The wire format belongs to the record source and the storage sink; this
/// crate only cares about success or failure.
pub trait RecordDecoder: Send + Sync + 'static {
    /// The decoded write request handed to the storage sink.
    type Request: Send + 'static;

    fn decode(&self, content: &[u8]) -> Result<Self::Request, DecodeError>;
}

/// Decode result for a single record.
///
/// Exactly one decoded record is produced per input record, in batch order.
#[derive(Debug)]
pub struct DecodedRecord<R> {
    pub tenant_id: TenantId,
    pub request: Result<R, DecodeError>,
}

/// Decoder stage: decode records in order and hand them to the pusher stage.
///
/// Runs as its own task so the next record is decoded while the previous one
/// is being pushed. A slot in the handoff channel is reserved before the next
/// record is decoded, so the stage never runs more than one record ahead of
/// the pusher. Dropping the sender closes the channel and signals the pusher
/// stage that the batch is exhausted.
pub(crate) async fn decode_records<D: RecordDecoder>(
    decoder: Arc<D>,
    records: Vec<Record>,
    tx: mpsc::Sender<DecodedRecord<D::Request>>,
    ct: CancellationToken,
) {
    for record in records {
        // Wait until the pusher has taken the previous unit before decoding
        // the next record.
        let permit = tokio::select! {
            biased;
            _ = ct.cancelled() => return,
            permit = tx.reserve() => match permit {
                Ok(permit) => permit,
                // The pusher stage dropped the receiver after a fatal error.
                Err(_) => return,
            }
        };

        // Decode failures travel inside the decoded record; the pusher stage
        // decides what to do with them.
        permit.send(DecodedRecord {
            request: decoder.decode(&record.content),
            tenant_id: record.tenant_id,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Decodes a record into its content length; empty records fail.
    struct LenDecoder;

    impl RecordDecoder for LenDecoder {
        type Request = usize;

        fn decode(&self, content: &[u8]) -> Result<usize, DecodeError> {
            if content.is_empty() {
                return Err(DecodeError::new("empty record"));
            }
            Ok(content.len())
        }
    }

    #[tokio::test]
    async fn test_decodes_in_order_and_closes_the_channel() {
        let (tx, mut rx) = mpsc::channel(1);
        let ct = CancellationToken::new();

        let records = vec![
            Record::new("tenant-a", &b"x"[..]),
            Record::new("tenant-b", &b""[..]),
            Record::new("tenant-a", &b"xyz"[..]),
        ];

        let task = tokio::spawn(decode_records(Arc::new(LenDecoder), records, tx, ct));

        let first = rx.recv().await.expect("first record");
        assert_eq!(first.tenant_id, TenantId::new("tenant-a"));
        assert_eq!(first.request, Ok(1));

        let second = rx.recv().await.expect("second record");
        assert_eq!(second.tenant_id, TenantId::new("tenant-b"));
        assert!(second.request.is_err());

        let third = rx.recv().await.expect("third record");
        assert_eq!(third.request, Ok(3));

        assert!(rx.recv().await.is_none());
        task.await.expect("decoder task");
    }

    #[tokio::test]
    async fn test_stops_without_sending_once_cancelled() {
        let (tx, mut rx) = mpsc::channel::<DecodedRecord<usize>>(1);
        let ct = CancellationToken::new();
        ct.cancel();

        let records = vec![Record::new("tenant-a", &b"x"[..])];
        let task = tokio::spawn(decode_records(Arc::new(LenDecoder), records, tx, ct));

        assert!(rx.recv().await.is_none());
        task.await.expect("decoder task");
    }
}
