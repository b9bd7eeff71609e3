//! Listing and changing iDRAC card and BIOS attributes.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::info;

use crate::attribute::AttributeSet;
use crate::enumerator;
use crate::error::{DracError, Result};
use crate::job::{AttributeChange, ConfigService, JobProtocol, ScheduledJob};
use crate::uris::Resource;
use crate::wsman::Transport;

/// Attribute namespaces plus the service that writes them.
pub struct AttributeManagement {
    transport: Arc<dyn Transport>,
    namespaces: [Resource; 3],
    jobs: JobProtocol,
}

impl AttributeManagement {
    /// Attributes of the embedded iDRAC card.
    #[must_use]
    pub fn idrac_card(transport: Arc<dyn Transport>) -> Self {
        Self::new(
            transport,
            [
                Resource::IdracCardEnumeration,
                Resource::IdracCardString,
                Resource::IdracCardInteger,
            ],
            ConfigService::idrac_card(),
        )
    }

    /// BIOS setup attributes. Applying them reboots the host.
    #[must_use]
    pub fn bios(transport: Arc<dyn Transport>) -> Self {
        Self::new(
            transport,
            [
                Resource::BiosEnumeration,
                Resource::BiosString,
                Resource::BiosInteger,
            ],
            ConfigService::bios(),
        )
    }

    fn new(transport: Arc<dyn Transport>, namespaces: [Resource; 3], service: ConfigService) -> Self {
        let jobs = JobProtocol::new(Arc::clone(&transport), service);
        Self {
            transport,
            namespaces,
            jobs,
        }
    }

    /// The job protocol used for writes.
    #[must_use]
    pub fn jobs(&self) -> &JobProtocol {
        &self.jobs
    }

    /// All attributes, merged across the three namespaces.
    ///
    /// # Errors
    /// Transport and parse errors, and [`DracError::AggregationConflict`]
    /// when two namespaces report the same key.
    pub async fn list_attributes(&self) -> Result<AttributeSet> {
        enumerator::list_attributes(self.transport.as_ref(), &self.namespaces).await
    }

    /// Validate `changes` against the current attributes and apply the ones
    /// that differ from the active value or would be overridden by another
    /// staged value.
    ///
    /// Returns `None` when every value is already active with nothing else
    /// pending; no remote write is made in that case.
    ///
    /// # Errors
    /// [`DracError::Validation`] listing every rejected change, before any
    /// write is sent; otherwise the errors of [`JobProtocol::apply`].
    pub async fn set_attributes(&self, changes: &[AttributeChange]) -> Result<Option<ScheduledJob>> {
        let attributes = self.list_attributes().await?;

        let mut messages = Vec::new();
        let mut seen = HashSet::new();
        let mut pending = Vec::new();
        for change in changes {
            if !seen.insert(change.name.as_str()) {
                messages.push(format!("attribute '{}' is given more than once", change.name));
                continue;
            }
            let Some(attribute) = attributes.get(&change.name) else {
                messages.push(format!("attribute '{}' does not exist", change.name));
                continue;
            };
            if attribute.read_only {
                messages.push(format!("attribute '{}' is read-only", change.name));
                continue;
            }
            if let Some(rejection) = attribute.validate(&change.value) {
                messages.push(rejection.to_string());
                continue;
            }
            if !attribute.is_settled(&change.value) {
                pending.push(change.clone());
            }
        }

        if !messages.is_empty() {
            return Err(DracError::Validation { messages });
        }
        if pending.is_empty() {
            info!(fqdd = %self.jobs.service().target, "All requested values already active");
            return Ok(None);
        }

        self.jobs.apply(&pending).await.map(Some)
    }

    /// Schedule a job for values staged earlier, e.g. after
    /// [`DracError::JobSchedulingFailed`].
    ///
    /// # Errors
    /// The errors of [`JobProtocol::schedule_job`].
    pub async fn commit_pending(&self) -> Result<String> {
        self.jobs.schedule_job().await
    }

    /// Drop every staged value on the target.
    ///
    /// # Errors
    /// The errors of [`JobProtocol::abandon_pending`].
    pub async fn abandon_pending(&self) -> Result<()> {
        self.jobs.abandon_pending().await
    }
}
