//! Network interface inventory.

use std::sync::Arc;

use serde::Serialize;

use crate::enumerator;
use crate::error::Result;
use crate::uris::Resource;
use crate::wsman::{find_value, Element, Transport};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkInterface {
    /// FQDD, e.g. `NIC.Integrated.1-1-1`.
    pub id: String,
    /// Factory MAC address.
    pub mac: String,
}

pub struct NicManagement {
    transport: Arc<dyn Transport>,
}

impl NicManagement {
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// List network interfaces.
    ///
    /// # Errors
    /// Transport errors and malformed `DCIM_NICView` instances.
    pub async fn list_network_interfaces(&self) -> Result<Vec<NetworkInterface>> {
        enumerator::list(self.transport.as_ref(), Resource::NicView, None, parse_nic).await
    }
}

fn parse_nic(nic: &Element) -> Result<NetworkInterface> {
    let ns = Resource::NicView.uri();
    Ok(NetworkInterface {
        id: find_value(nic, &ns, "FQDD")?,
        mac: find_value(nic, &ns, "PermanentMACAddress")?,
    })
}
