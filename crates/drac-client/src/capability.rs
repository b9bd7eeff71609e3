//! Firmware version gates.
//!
//! Some DRAC methods only exist on newer Lifecycle Controller firmware.
//! Every such check goes through [`supports`], backed by one table.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::DracError;

/// Dot-separated firmware version, compared component by component.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Version(Vec<u32>);

impl Version {
    #[must_use]
    pub fn new(parts: impl Into<Vec<u32>>) -> Self {
        Self(parts.into())
    }

    #[must_use]
    pub fn parts(&self) -> &[u32] {
        &self.0
    }
}

impl FromStr for Version {
    type Err = DracError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .split('.')
            .map(|part| {
                part.parse::<u32>().map_err(|_| {
                    DracError::InvalidResponse(format!("malformed version string '{s}'"))
                })
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(u32::to_string).collect();
        f.write_str(&parts.join("."))
    }
}

/// Operations that depend on the Lifecycle Controller version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    /// `DCIM_SystemManagementService.IdentifyChassis` (system LED).
    ChassisIdentify,
}

/// Versions a feature requires the Lifecycle Controller to exceed.
const THRESHOLDS: &[(Feature, &[u32])] = &[(Feature::ChassisIdentify, &[2, 0, 0])];

/// Version `feature` requires the controller to be newer than.
#[must_use]
pub fn threshold(feature: Feature) -> Version {
    THRESHOLDS
        .iter()
        .find(|(f, _)| *f == feature)
        .map(|(_, parts)| Version::new(parts.to_vec()))
        .unwrap_or_default()
}

/// True when a controller at `version` offers `feature`.
#[must_use]
pub fn supports(feature: Feature, version: &Version) -> bool {
    *version > threshold(feature)
}
