use std::time::Duration;

use async_trait::async_trait;

use crate::{error::PushError, record::TenantId};

/// Storage backend that durably applies decoded write requests.
#[async_trait]
pub trait StorageSink<R: Send + 'static>: Send + Sync {
    /// Apply a single write request for the given tenant.
    ///
    /// The request is exclusively owned by the sink from this point on,
    /// including any internal buffers.
    async fn push(&self, tenant_id: &TenantId, request: R) -> Result<(), PushError>;
}

/// Decides whether a client push error is worth a warning log entry.
///
/// Client errors can be frequent and repetitive, so implementations may
/// sample or suppress them. Server errors abort the batch and are not
/// subject to this policy.
pub trait ClientErrorLogPolicy: Send + Sync {
    fn should_log(&self, tenant_id: &TenantId, error: &PushError, elapsed: Duration) -> bool;
}

/// Policy that logs every client error.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogAllClientErrors;

impl ClientErrorLogPolicy for LogAllClientErrors {
    fn should_log(&self, _tenant_id: &TenantId, _error: &PushError, _elapsed: Duration) -> bool {
        true
    }
}
