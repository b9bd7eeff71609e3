//! WS-Management transport façade.
//!
//! The rest of the crate talks to the DRAC only through [`Transport`]:
//! `enumerate` lists instances of a resource and `invoke` calls a method on
//! a service instance addressed by a [`SelectorSet`]. [`WsmanClient`] is the
//! HTTP implementation.

mod client;
mod document;
mod envelope;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::{DracError, Result};
use crate::uris::{Resource, NS_WSMAN};

pub use client::{WsmanClient, DEFAULT_MAX_PAGES};
pub use document::{find_integer, find_nullable_value, find_value, Document, Element};

/// Remote operations the DRAC exposes.
#[async_trait]
pub trait Transport: Send + Sync {
    /// List all instances of `resource`, optionally filtered by a WQL query.
    ///
    /// Implementations follow enumeration contexts until the end of the
    /// sequence and return a single document holding every item.
    async fn enumerate(&self, resource: Resource, filter_query: Option<&str>) -> Result<Document>;

    /// Call `method` on the service instance identified by `selectors`.
    async fn invoke(
        &self,
        resource: Resource,
        method: &str,
        selectors: &SelectorSet,
        properties: &Properties,
    ) -> Result<Document>;
}

/// Identifies the service instance a method call targets.
///
/// The four keys are the same for every DCIM service; only the values differ.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectorSet {
    pub name: String,
    pub system_name: String,
    pub creation_class_name: String,
    pub system_creation_class_name: String,
}

impl SelectorSet {
    /// Selectors for a DCIM service hosted on `DCIM:ComputerSystem`.
    #[must_use]
    pub fn for_service(service: Resource) -> Self {
        let class_name = service.class_name();
        Self {
            name: format!("DCIM:{}", class_name.trim_start_matches("DCIM_")),
            system_name: "DCIM:ComputerSystem".to_string(),
            creation_class_name: class_name.to_string(),
            system_creation_class_name: "DCIM_ComputerSystem".to_string(),
        }
    }

    /// Replace the `SystemName` selector.
    #[must_use]
    pub fn with_system_name(mut self, system_name: impl Into<String>) -> Self {
        self.system_name = system_name.into();
        self
    }

    /// Key/value pairs in wire order.
    #[must_use]
    pub fn pairs(&self) -> [(&'static str, &str); 4] {
        [
            ("Name", self.name.as_str()),
            ("SystemName", self.system_name.as_str()),
            ("CreationClassName", self.creation_class_name.as_str()),
            ("SystemCreationClassName", self.system_creation_class_name.as_str()),
        ]
    }
}

/// Value of one method input parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    Single(String),
    /// Serialized as the same element repeated once per entry.
    List(Vec<String>),
}

/// Ordered method input parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Properties(Vec<(String, PropertyValue)>);

impl Properties {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a scalar parameter.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.0
            .push((name.into(), PropertyValue::Single(value.into())));
        self
    }

    /// Add a list parameter.
    #[must_use]
    pub fn with_list(mut self, name: impl Into<String>, values: Vec<String>) -> Self {
        self.0.push((name.into(), PropertyValue::List(values)));
        self
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropertyValue)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// `ReturnValue` codes reported by DCIM methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnValue {
    Success,
    Error,
    /// A job was created.
    Created,
}

impl ReturnValue {
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::Success => "0",
            Self::Error => "2",
            Self::Created => "4096",
        }
    }
}

/// Check the `ReturnValue` of an `invoke` response.
///
/// # Errors
/// [`DracError::OperationFailed`] with the DRAC message when the call
/// reported an error, [`DracError::UnexpectedReturnValue`] for any other
/// mismatch, and the usual field errors when `ReturnValue` is missing.
pub fn check_return_value(doc: &Document, resource: Resource, expected: ReturnValue) -> Result<()> {
    let namespace = resource.uri();
    let actual = find_value(doc.root(), &namespace, "ReturnValue")?;

    if actual == expected.code() {
        return Ok(());
    }

    if actual == ReturnValue::Error.code() {
        let message = find_nullable_value(doc.root(), &namespace, "Message")
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| "no message returned".to_string());
        return Err(DracError::OperationFailed { message });
    }

    Err(DracError::UnexpectedReturnValue {
        expected: expected.code().to_string(),
        actual,
    })
}

/// Job identifier from a `CreateTargetedConfigJob` response.
///
/// # Errors
/// [`DracError::InvalidResponse`] when the job reference carries no
/// `InstanceID` selector.
pub fn job_id_from_response(doc: &Document) -> Result<String> {
    doc.find_all(NS_WSMAN, "Selector")
        .into_iter()
        .find(|s| s.attribute("Name") == Some("InstanceID"))
        .and_then(Element::text)
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .ok_or_else(|| DracError::InvalidResponse("job reference has no InstanceID".to_string()))
}
