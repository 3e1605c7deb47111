//! Write-path batch consumer for strato's ingest storage.
//!
//! Consumes ordered batches of log records, decodes each record's write
//! request, and pushes it to a [`StorageSink`]. Decoding of the next record
//! overlaps with pushing of the current one; pushes themselves are strictly
//! sequential and in batch order.

pub mod consumer;
pub mod decoder;
pub mod error;
pub mod metrics;
pub mod record;
pub mod sink;

pub use consumer::BatchConsumer;
pub use decoder::{DecodedRecord, RecordDecoder};
pub use error::{ConsumeError, DecodeError, PushError, Result};
pub use metrics::ConsumerMetrics;
pub use record::{Record, TenantId};
pub use sink::{ClientErrorLogPolicy, LogAllClientErrors, StorageSink};
