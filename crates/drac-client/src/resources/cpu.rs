//! Processor inventory.

use std::sync::Arc;

use serde::Serialize;

use crate::enumerator;
use crate::error::{DracError, Result};
use crate::uris::Resource;
use crate::wsman::{find_integer, find_value, Element, Transport};

/// One installed processor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cpu {
    /// FQDD, e.g. `CPU.Socket.1`.
    pub id: String,
    pub cores: u32,
}

pub struct CpuManagement {
    transport: Arc<dyn Transport>,
}

impl CpuManagement {
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// List installed processors.
    ///
    /// # Errors
    /// Transport errors and malformed `DCIM_CPUView` instances.
    pub async fn list_cpus(&self) -> Result<Vec<Cpu>> {
        enumerator::list(self.transport.as_ref(), Resource::CpuView, None, parse_cpu).await
    }
}

fn parse_cpu(cpu: &Element) -> Result<Cpu> {
    let ns = Resource::CpuView.uri();
    let cores = find_integer(cpu, &ns, "NumberOfProcessorCores")?;
    Ok(Cpu {
        id: find_value(cpu, &ns, "FQDD")?,
        cores: u32::try_from(cores).map_err(|_| {
            DracError::InvalidResponse(format!("invalid core count {cores}"))
        })?,
    })
}
