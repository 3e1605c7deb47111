use snafu::Snafu;

use crate::record::TenantId;

/// A record whose content could not be decoded into a write request.
///
/// Decode errors travel inside the decoded record and are handled by the
/// pusher stage: the record is logged and dropped, the batch continues.
#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
#[snafu(display("malformed record content: {message}"))]
pub struct DecodeError {
    pub message: String,
}

impl DecodeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Push failure reported by the storage sink.
///
/// The message ends up in logs and, for server errors, in the error returned
/// to the caller, so it should be useful to an operator.
#[derive(Debug, Clone, Snafu)]
#[snafu(visibility(pub))]
pub enum PushError {
    /// The sink rejected the write for tenant-attributable reasons, such as
    /// tenant limits or out-of-bounds samples. Never aborts the batch, but
    /// the record may have been partially applied.
    #[snafu(display("client error: {message}"))]
    Client { message: String },
    /// The sink failed for an internal, potentially recoverable reason.
    /// Aborts the rest of the batch.
    #[snafu(display("server error: {message}"))]
    Server { message: String },
}

impl PushError {
    /// Whether the failure is attributable to the tenant rather than to the
    /// system itself.
    pub fn is_client(&self) -> bool {
        matches!(self, PushError::Client { .. })
    }

    /// Attribute value for the failed-records counter.
    pub(crate) fn cause(&self) -> &'static str {
        match self {
            PushError::Client { .. } => "client",
            PushError::Server { .. } => "server",
        }
    }
}

/// Error returned by [`BatchConsumer::consume`].
///
/// [`BatchConsumer::consume`]: crate::consumer::BatchConsumer::consume
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ConsumeError {
    /// A server-classified push failure aborted the batch.
    #[snafu(display("pushing record at index {index} for tenant {tenant_id}: {source}"))]
    RecordPush {
        index: usize,
        tenant_id: TenantId,
        source: PushError,
    },
}

pub type Result<T, E = ConsumeError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_error_classification() {
        let client = PushError::Client {
            message: "per-tenant series limit exceeded".to_string(),
        };
        assert!(client.is_client());
        assert_eq!(client.cause(), "client");

        let server = PushError::Server {
            message: "storage unavailable".to_string(),
        };
        assert!(!server.is_client());
        assert_eq!(server.cause(), "server");
    }

    #[test]
    fn test_consume_error_references_record() {
        let error = ConsumeError::RecordPush {
            index: 7,
            tenant_id: TenantId::new("tenant-b"),
            source: PushError::Server {
                message: "storage unavailable".to_string(),
            },
        };

        let rendered = error.to_string();
        assert!(rendered.contains("index 7"));
        assert!(rendered.contains("tenant-b"));
        assert!(rendered.contains("storage unavailable"));
    }
}
