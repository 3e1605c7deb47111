use std::fmt;
use std::sync::Arc;

use bytes::Bytes;

/// Identifier of the tenant a record was written for.
///
/// Cheap to clone; copies end up in logs, metric attributes and errors.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TenantId(Arc<str>);

impl TenantId {
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TenantId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for TenantId {
    fn from(id: String) -> Self {
        Self::new(id)
    }
}

/// A single record as delivered by the record source.
///
/// The content is an opaque serialized write request; this crate never
/// inspects it beyond handing it to a [`RecordDecoder`].
///
/// [`RecordDecoder`]: crate::decoder::RecordDecoder
#[derive(Debug, Clone)]
pub struct Record {
    pub tenant_id: TenantId,
    pub content: Bytes,
}

impl Record {
    pub fn new(tenant_id: impl Into<TenantId>, content: impl Into<Bytes>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            content: content.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tenant_id_display() {
        let tenant = TenantId::new("tenant-a");
        assert_eq!(tenant.as_str(), "tenant-a");
        assert_eq!(tenant.to_string(), "tenant-a");
        assert_eq!(tenant, TenantId::from("tenant-a"));
    }

    #[test]
    fn test_record_new() {
        let record = Record::new("tenant-a", "payload".as_bytes());
        assert_eq!(record.tenant_id, TenantId::new("tenant-a"));
        assert_eq!(record.content.as_ref(), b"payload");
    }
}
