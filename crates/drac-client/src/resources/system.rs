//! System identity, health and the identification LED.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use crate::capability::{self, Feature};
use crate::enumerator;
use crate::error::{DracError, Result};
use crate::resources::lifecycle::lifecycle_version;
use crate::uris::Resource;
use crate::wsman::{
    check_return_value, find_nullable_value, find_value, Element, Properties, ReturnValue,
    SelectorSet, Transport,
};

/// Rolled-up health reported in `PrimaryStatus`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SystemStatus {
    Unknown,
    #[serde(rename = "OK")]
    Ok,
    Degraded,
    Error,
}

impl SystemStatus {
    fn from_code(code: &str) -> Option<Self> {
        match code {
            "0" => Some(Self::Unknown),
            "1" => Some(Self::Ok),
            "2" => Some(Self::Degraded),
            "3" => Some(Self::Error),
            _ => None,
        }
    }
}

impl fmt::Display for SystemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Unknown => "Unknown",
            Self::Ok => "OK",
            Self::Degraded => "Degraded",
            Self::Error => "Error",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct System {
    pub bios_version: String,
    pub express_service_tag: String,
    /// Host OS name, when the OS has reported one.
    pub hostname: Option<String>,
    /// Lifecycle Controller version string.
    pub ilm_version: String,
    pub model: String,
    /// Server generation, e.g. `13` for `13G Monolithic`.
    pub generation: u32,
    pub service_tag: String,
    pub status: SystemStatus,
}

pub struct SystemManagement {
    transport: Arc<dyn Transport>,
}

impl SystemManagement {
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Identity and health of the server.
    ///
    /// # Errors
    /// Transport errors, [`DracError::InvalidResponse`] when no
    /// `DCIM_SystemView` instance is returned, and field errors.
    pub async fn get_system_info(&self) -> Result<System> {
        let instances =
            enumerator::enumerate_instances(self.transport.as_ref(), Resource::SystemView, None)
                .await?;
        let view = instances.first().ok_or_else(|| {
            DracError::InvalidResponse("no DCIM_SystemView instance returned".to_string())
        })?;
        parse_system(view)
    }

    /// Turn the chassis identification LED on.
    ///
    /// Does nothing on Lifecycle Controller firmware without chassis
    /// identify support.
    ///
    /// # Errors
    /// Transport errors and [`DracError::OperationFailed`].
    pub async fn enable_system_led(&self) -> Result<()> {
        self.identify_chassis(true).await
    }

    /// Turn the chassis identification LED off. Same gating as
    /// [`SystemManagement::enable_system_led`].
    ///
    /// # Errors
    /// Transport errors and [`DracError::OperationFailed`].
    pub async fn disable_system_led(&self) -> Result<()> {
        self.identify_chassis(false).await
    }

    async fn identify_chassis(&self, on: bool) -> Result<()> {
        let version = lifecycle_version(self.transport.as_ref()).await?;
        if !capability::supports(Feature::ChassisIdentify, &version) {
            debug!(version = %version, "Chassis identify not supported, skipping");
            return Ok(());
        }

        let resource = Resource::SystemManagementService;
        let selectors = SelectorSet::for_service(resource).with_system_name("srv:system");
        let properties = Properties::new().with("IdentifyState", if on { "1" } else { "0" });

        let doc = self
            .transport
            .invoke(resource, "IdentifyChassis", &selectors, &properties)
            .await?;
        check_return_value(&doc, resource, ReturnValue::Success)?;

        info!(on, "System identification LED updated");
        Ok(())
    }
}

fn parse_system(view: &Element) -> Result<System> {
    let ns = Resource::SystemView.uri();

    let generation_text = find_value(view, &ns, "SystemGeneration")?;
    let digits: String = generation_text.chars().filter(char::is_ascii_digit).collect();
    let generation = digits.parse().map_err(|_| {
        DracError::InvalidResponse(format!("unrecognized system generation '{generation_text}'"))
    })?;

    let status_code = find_value(view, &ns, "PrimaryStatus")?;
    let status = SystemStatus::from_code(&status_code).ok_or_else(|| {
        DracError::InvalidResponse(format!("unknown primary status '{status_code}'"))
    })?;

    Ok(System {
        bios_version: find_value(view, &ns, "BIOSVersionString")?,
        express_service_tag: find_value(view, &ns, "ExpressServiceCode")?,
        hostname: find_nullable_value(view, &ns, "HostName").filter(|h| !h.is_empty()),
        ilm_version: find_value(view, &ns, "LifecycleControllerVersion")?,
        model: find_value(view, &ns, "Model")?,
        generation,
        service_tag: find_value(view, &ns, "ServiceTag")?,
        status,
    })
}
