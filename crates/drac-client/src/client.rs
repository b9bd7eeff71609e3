//! Entry point tying the managers to one DRAC connection.

use std::sync::Arc;

use crate::config::EndpointConfig;
use crate::error::Result;
use crate::resources::{
    AttributeManagement, CpuManagement, JobManagement, LifecycleManagement, MemoryManagement,
    NicManagement, SystemManagement,
};
use crate::wsman::{Transport, WsmanClient};

/// Client for one DRAC.
///
/// Managers are created on demand and share the underlying transport. The
/// client keeps no state of its own, so every call reads fresh data.
#[derive(Clone)]
pub struct DracClient {
    transport: Arc<dyn Transport>,
}

impl DracClient {
    /// Connect over WS-Management.
    ///
    /// # Errors
    /// [`DracError::Config`](crate::DracError::Config) for an invalid
    /// endpoint, or an HTTP error when the client cannot be built.
    pub fn new(config: &EndpointConfig) -> Result<Self> {
        Ok(Self::with_transport(Arc::new(WsmanClient::new(config)?)))
    }

    /// Use a custom transport.
    #[must_use]
    pub fn with_transport(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    #[must_use]
    pub fn transport(&self) -> Arc<dyn Transport> {
        Arc::clone(&self.transport)
    }

    #[must_use]
    pub fn lifecycle(&self) -> LifecycleManagement {
        LifecycleManagement::new(self.transport())
    }

    #[must_use]
    pub fn cpus(&self) -> CpuManagement {
        CpuManagement::new(self.transport())
    }

    #[must_use]
    pub fn memory(&self) -> MemoryManagement {
        MemoryManagement::new(self.transport())
    }

    #[must_use]
    pub fn nics(&self) -> NicManagement {
        NicManagement::new(self.transport())
    }

    #[must_use]
    pub fn system(&self) -> SystemManagement {
        SystemManagement::new(self.transport())
    }

    #[must_use]
    pub fn jobs(&self) -> JobManagement {
        JobManagement::new(self.transport())
    }

    /// iDRAC card attributes.
    #[must_use]
    pub fn idrac_attributes(&self) -> AttributeManagement {
        AttributeManagement::idrac_card(self.transport())
    }

    /// BIOS attributes.
    #[must_use]
    pub fn bios_attributes(&self) -> AttributeManagement {
        AttributeManagement::bios(self.transport())
    }
}
