use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use strato_ingestor_core::{
    BatchConsumer, DecodeError, PushError, Record, RecordDecoder, StorageSink, TenantId,
};

/// Test decoder: the record content is the write request itself, as UTF-8
/// text.
pub struct Utf8Decoder;

impl RecordDecoder for Utf8Decoder {
    type Request = String;

    fn decode(&self, content: &[u8]) -> Result<String, DecodeError> {
        std::str::from_utf8(content)
            .map(str::to_owned)
            .map_err(|err| DecodeError::new(format!("invalid utf-8: {err}")))
    }
}

/// Sink that records pushes in order and fails on configured requests.
#[derive(Default)]
pub struct RecordingSink {
    pushes: Mutex<Vec<(TenantId, String)>>,
    failures: Mutex<HashMap<String, PushError>>,
}

impl RecordingSink {
    pub fn failing_on(failures: impl IntoIterator<Item = (&'static str, PushError)>) -> Self {
        Self {
            pushes: Mutex::new(Vec::new()),
            failures: Mutex::new(
                failures
                    .into_iter()
                    .map(|(request, error)| (request.to_owned(), error))
                    .collect(),
            ),
        }
    }

    pub fn pushes(&self) -> Vec<(TenantId, String)> {
        self.pushes.lock().expect("pushes lock").clone()
    }
}

#[async_trait]
impl StorageSink<String> for RecordingSink {
    async fn push(&self, tenant_id: &TenantId, request: String) -> Result<(), PushError> {
        self.pushes
            .lock()
            .expect("pushes lock")
            .push((tenant_id.clone(), request.clone()));

        match self.failures.lock().expect("failures lock").get(&request) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

pub fn consumer(sink: Arc<RecordingSink>) -> BatchConsumer<Utf8Decoder> {
    BatchConsumer::new(Arc::new(Utf8Decoder), sink)
}

pub fn record(tenant_id: &str, content: &'static str) -> Record {
    Record::new(tenant_id, content.as_bytes())
}

/// A record whose content is not valid UTF-8 and therefore fails to decode.
pub fn malformed_record(tenant_id: &str) -> Record {
    Record::new(tenant_id, &b"\xff\xfe"[..])
}

pub fn client_error() -> PushError {
    PushError::Client {
        message: "per-tenant series limit exceeded".to_string(),
    }
}

pub fn server_error() -> PushError {
    PushError::Server {
        message: "storage unavailable".to_string(),
    }
}
