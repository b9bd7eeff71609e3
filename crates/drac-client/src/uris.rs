//! Resource URIs and XML namespaces of the DRAC WS-Management schema.
//!
//! Each DCIM class is addressed by `DCIM_BASE` followed by the class name,
//! and the instance fields in responses live in a namespace equal to that
//! same URI.

use std::fmt;

/// Base URI shared by every DCIM class.
pub const DCIM_BASE: &str = "http://schemas.dell.com/wbem/wscim/1/cim-schema/2/";

/// SOAP 1.2 envelope namespace.
pub const NS_SOAP_ENV: &str = "http://www.w3.org/2003/05/soap-envelope";

/// WS-Addressing namespace.
pub const NS_WS_ADDRESSING: &str = "http://schemas.xmlsoap.org/ws/2004/08/addressing";

/// WS-Addressing anonymous reply address.
pub const WS_ADDRESSING_ANONYMOUS: &str =
    "http://schemas.xmlsoap.org/ws/2004/08/addressing/role/anonymous";

/// WS-Enumeration namespace.
pub const NS_WS_ENUMERATION: &str = "http://schemas.xmlsoap.org/ws/2004/09/enumeration";

/// WS-Management namespace.
pub const NS_WSMAN: &str = "http://schemas.dmtf.org/wbem/wsman/1/wsman.xsd";

/// XML Schema instance namespace (`xsi:nil`).
pub const NS_XML_SCHEMA_INSTANCE: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// WQL filter dialect.
pub const WQL_DIALECT: &str = "http://schemas.microsoft.com/wbem/wsman/1/WQL";

/// DCIM classes used by this client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    BiosEnumeration,
    BiosInteger,
    BiosService,
    BiosString,
    BootConfigSetting,
    BootSourceSetting,
    ComputerSystem,
    ControllerView,
    CpuView,
    IdracCardEnumeration,
    IdracCardInteger,
    IdracCardService,
    IdracCardString,
    LcService,
    LifecycleJob,
    MemoryView,
    NicView,
    OsDeploymentService,
    PhysicalDiskView,
    RaidService,
    SystemManagementService,
    SystemView,
    VirtualDiskView,
}

impl Resource {
    /// DCIM class name, which is also the tag of each enumerated instance.
    #[must_use]
    pub fn class_name(self) -> &'static str {
        match self {
            Self::BiosEnumeration => "DCIM_BIOSEnumeration",
            Self::BiosInteger => "DCIM_BIOSInteger",
            Self::BiosService => "DCIM_BIOSService",
            Self::BiosString => "DCIM_BIOSString",
            Self::BootConfigSetting => "DCIM_BootConfigSetting",
            Self::BootSourceSetting => "DCIM_BootSourceSetting",
            Self::ComputerSystem => "DCIM_ComputerSystem",
            Self::ControllerView => "DCIM_ControllerView",
            Self::CpuView => "DCIM_CPUView",
            Self::IdracCardEnumeration => "DCIM_iDRACCardEnumeration",
            Self::IdracCardInteger => "DCIM_iDRACCardInteger",
            Self::IdracCardService => "DCIM_iDRACCardService",
            Self::IdracCardString => "DCIM_iDRACCardString",
            Self::LcService => "DCIM_LCService",
            Self::LifecycleJob => "DCIM_LifecycleJob",
            Self::MemoryView => "DCIM_MemoryView",
            Self::NicView => "DCIM_NICView",
            Self::OsDeploymentService => "DCIM_OSDeploymentService",
            Self::PhysicalDiskView => "DCIM_PhysicalDiskView",
            Self::RaidService => "DCIM_RAIDService",
            Self::SystemManagementService => "DCIM_SystemManagementService",
            Self::SystemView => "DCIM_SystemView",
            Self::VirtualDiskView => "DCIM_VirtualDiskView",
        }
    }

    /// Full resource URI, also used as the namespace of instance fields.
    #[must_use]
    pub fn uri(self) -> String {
        format!("{DCIM_BASE}{}", self.class_name())
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.class_name())
    }
}
