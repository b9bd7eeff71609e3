//! Generic "list instances of a resource" operations.

use tracing::debug;

use crate::attribute::{Attribute, AttributeSet};
use crate::error::Result;
use crate::uris::Resource;
use crate::wsman::{Element, Transport};

/// Enumerate `resource` and return every instance element, in document order.
///
/// An enumeration without instances yields an empty vector.
///
/// # Errors
/// Transport errors from the enumerate call.
pub async fn enumerate_instances(
    transport: &dyn Transport,
    resource: Resource,
    filter_query: Option<&str>,
) -> Result<Vec<Element>> {
    let doc = transport.enumerate(resource, filter_query).await?;
    let instances: Vec<Element> = doc
        .find_all(&resource.uri(), resource.class_name())
        .into_iter()
        .cloned()
        .collect();

    debug!(resource = %resource, count = instances.len(), "Enumerated instances");
    Ok(instances)
}

/// Enumerate `resource` and map every instance with `parse`.
///
/// # Errors
/// Transport errors, or the first error returned by `parse`.
pub async fn list<T, F>(
    transport: &dyn Transport,
    resource: Resource,
    filter_query: Option<&str>,
    parse: F,
) -> Result<Vec<T>>
where
    F: Fn(&Element) -> Result<T>,
{
    enumerate_instances(transport, resource, filter_query)
        .await?
        .iter()
        .map(parse)
        .collect()
}

/// List the attributes of several attribute classes as one set.
///
/// One enumerate call is made per class, in the given order.
///
/// # Errors
/// Transport and parse errors, and
/// [`DracError::AggregationConflict`](crate::DracError::AggregationConflict)
/// when two classes report the same attribute key.
pub async fn list_attributes(
    transport: &dyn Transport,
    namespaces: &[Resource],
) -> Result<AttributeSet> {
    let mut merged = AttributeSet::new();
    for &resource in namespaces {
        let attributes = list(transport, resource, None, |fragment| {
            Attribute::parse(fragment, resource)
        })
        .await?;
        merged = merged.merge(AttributeSet::from_attributes(attributes)?)?;
    }
    Ok(merged)
}
