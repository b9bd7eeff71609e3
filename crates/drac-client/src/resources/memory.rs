//! Memory module inventory.

use std::sync::Arc;

use serde::Serialize;

use crate::enumerator;
use crate::error::{DracError, Result};
use crate::uris::Resource;
use crate::wsman::{find_integer, find_value, Element, Transport};

/// One installed DIMM.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Memory {
    /// FQDD, e.g. `DIMM.Socket.A1`.
    pub id: String,
    /// Capacity in MB.
    pub size: u64,
}

pub struct MemoryManagement {
    transport: Arc<dyn Transport>,
}

impl MemoryManagement {
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// List installed memory modules.
    ///
    /// # Errors
    /// Transport errors and malformed `DCIM_MemoryView` instances.
    pub async fn list_memory(&self) -> Result<Vec<Memory>> {
        enumerator::list(
            self.transport.as_ref(),
            Resource::MemoryView,
            None,
            parse_memory,
        )
        .await
    }
}

fn parse_memory(memory: &Element) -> Result<Memory> {
    let ns = Resource::MemoryView.uri();
    let size = find_integer(memory, &ns, "Size")?;
    Ok(Memory {
        id: find_value(memory, &ns, "FQDD")?,
        size: u64::try_from(size)
            .map_err(|_| DracError::InvalidResponse(format!("invalid memory size {size}")))?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{enumeration_body, instance, FakeTransport};

    #[tokio::test]
    async fn test_list_memory() {
        let body = enumeration_body(
            Resource::MemoryView,
            &[instance(
                Resource::MemoryView,
                &[("FQDD", Some("DIMM.Socket.A1")), ("Size", Some("16384"))],
            )],
        );
        let transport = Arc::new(FakeTransport::new().on_enumerate(Resource::MemoryView, body));

        let memory = MemoryManagement::new(transport).list_memory().await.unwrap();
        assert_eq!(
            memory,
            vec![Memory {
                id: "DIMM.Socket.A1".into(),
                size: 16384
            }]
        );
    }

    #[tokio::test]
    async fn test_no_modules_is_empty() {
        let body = enumeration_body(Resource::MemoryView, &[]);
        let transport = Arc::new(FakeTransport::new().on_enumerate(Resource::MemoryView, body));

        let memory = MemoryManagement::new(transport).list_memory().await.unwrap();
        assert!(memory.is_empty());
    }

    #[tokio::test]
    async fn test_negative_size_is_invalid() {
        let body = enumeration_body(
            Resource::MemoryView,
            &[instance(
                Resource::MemoryView,
                &[("FQDD", Some("DIMM.Socket.A1")), ("Size", Some("-1"))],
            )],
        );
        let transport = Arc::new(FakeTransport::new().on_enumerate(Resource::MemoryView, body));

        assert!(matches!(
            MemoryManagement::new(transport).list_memory().await,
            Err(DracError::InvalidResponse(_))
        ));
    }
}
