//! Two-phase attribute mutation.
//!
//! Writes never take effect directly. `SetAttributes` stages pending values
//! on the owning service, then `CreateTargetedConfigJob` schedules a job that
//! applies them. The two steps are exposed separately so a failed job
//! creation can be retried without staging the values again.
//!
//! The controller does not promise that a multi-attribute `SetAttributes`
//! is all-or-nothing. When it fails, treat the pending state of every
//! attribute in the batch as unknown and re-read before retrying.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::attribute::AttributeValue;
use crate::error::{DracError, Result};
use crate::uris::Resource;
use crate::wsman::{
    check_return_value, job_id_from_response, Properties, ReturnValue, SelectorSet, Transport,
};

/// Scheduling directive for immediate execution.
const TIME_NOW: &str = "TIME_NOW";

/// `RebootJobType` for a graceful reboot with forced shutdown fallback.
const REBOOT_GRACEFUL_WITH_FORCED_SHUTDOWN: &str = "3";

/// Target of iDRAC card attributes.
pub const IDRAC_TARGET: &str = "iDRAC.Embedded.1";

/// Target of BIOS attributes.
pub const BIOS_TARGET: &str = "BIOS.Setup.1-1";

/// Desired new value for one attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttributeChange {
    /// Attribute key relative to the target, e.g. `SSH.1#Enable`.
    pub name: String,
    pub value: AttributeValue,
}

impl AttributeChange {
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Service that owns attribute mutations for one subsystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigService {
    pub resource: Resource,
    pub selectors: SelectorSet,
    /// FQDD the changes apply to.
    pub target: String,
    /// Whether the configuration job needs a host reboot.
    pub reboot: bool,
}

impl ConfigService {
    /// `DCIM_iDRACCardService` targeting the embedded iDRAC.
    #[must_use]
    pub fn idrac_card() -> Self {
        Self {
            resource: Resource::IdracCardService,
            selectors: SelectorSet::for_service(Resource::IdracCardService),
            target: IDRAC_TARGET.to_string(),
            reboot: false,
        }
    }

    /// `DCIM_BIOSService` targeting the system BIOS.
    #[must_use]
    pub fn bios() -> Self {
        Self {
            resource: Resource::BiosService,
            selectors: SelectorSet::for_service(Resource::BiosService),
            target: BIOS_TARGET.to_string(),
            reboot: true,
        }
    }

    /// Same service, different target FQDD.
    #[must_use]
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }
}

/// Result of a fully submitted write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScheduledJob {
    /// Lifecycle job id, e.g. `JID_471269252011`.
    pub job_id: String,
    pub target: String,
    /// Attribute keys staged before the job was created.
    pub staged: Vec<String>,
}

/// Drives the stage-then-schedule sequence against one service.
#[derive(Clone)]
pub struct JobProtocol {
    transport: Arc<dyn Transport>,
    service: ConfigService,
}

impl JobProtocol {
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, service: ConfigService) -> Self {
        Self { transport, service }
    }

    #[must_use]
    pub fn service(&self) -> &ConfigService {
        &self.service
    }

    /// Stage pending values with one `SetAttributes` call.
    ///
    /// Returns the staged attribute keys in call order.
    ///
    /// # Errors
    /// [`DracError::InvalidParameter`] for an empty batch, transport errors,
    /// and [`DracError::OperationFailed`] when the DRAC rejects the batch.
    pub async fn stage(&self, changes: &[AttributeChange]) -> Result<Vec<String>> {
        if changes.is_empty() {
            return Err(DracError::InvalidParameter(
                "no attribute changes to stage".to_string(),
            ));
        }

        // Pairs are split into the two index-aligned wire lists only here.
        let (names, values): (Vec<String>, Vec<String>) = changes
            .iter()
            .map(|c| (c.name.clone(), c.value.to_string()))
            .unzip();

        let properties = Properties::new()
            .with("Target", self.service.target.as_str())
            .with_list("AttributeName", names.clone())
            .with_list("AttributeValue", values);

        let doc = self
            .transport
            .invoke(
                self.service.resource,
                "SetAttributes",
                &self.service.selectors,
                &properties,
            )
            .await?;
        check_return_value(&doc, self.service.resource, ReturnValue::Success)?;

        info!(
            service = %self.service.resource,
            fqdd = %self.service.target,
            attributes = ?names,
            "Staged pending attribute values"
        );
        Ok(names)
    }

    /// Create a configuration job applying every pending value on the target.
    ///
    /// Safe to call again after a failure; staged values are not resent.
    ///
    /// # Errors
    /// Transport errors, [`DracError::OperationFailed`] when the DRAC refuses
    /// to create the job, and [`DracError::InvalidResponse`] when the reply
    /// has no job id.
    pub async fn schedule_job(&self) -> Result<String> {
        let mut properties = Properties::new()
            .with("Target", self.service.target.as_str())
            .with("ScheduledStartTime", TIME_NOW);
        if self.service.reboot {
            properties = properties.with("RebootJobType", REBOOT_GRACEFUL_WITH_FORCED_SHUTDOWN);
        }

        let doc = self
            .transport
            .invoke(
                self.service.resource,
                "CreateTargetedConfigJob",
                &self.service.selectors,
                &properties,
            )
            .await?;
        check_return_value(&doc, self.service.resource, ReturnValue::Created)?;
        let job_id = job_id_from_response(&doc)?;

        info!(
            service = %self.service.resource,
            fqdd = %self.service.target,
            job_id = %job_id,
            "Configuration job scheduled"
        );
        Ok(job_id)
    }

    /// Stage `changes` and schedule the job that applies them.
    ///
    /// # Errors
    /// Any error of [`JobProtocol::stage`], in which case no job was
    /// requested, or [`DracError::JobSchedulingFailed`] when the values were
    /// staged but the job could not be created.
    pub async fn apply(&self, changes: &[AttributeChange]) -> Result<ScheduledJob> {
        let staged = self.stage(changes).await?;

        match self.schedule_job().await {
            Ok(job_id) => Ok(ScheduledJob {
                job_id,
                target: self.service.target.clone(),
                staged,
            }),
            Err(source) => {
                warn!(
                    fqdd = %self.service.target,
                    error = %source,
                    "Values staged but configuration job was not created"
                );
                Err(DracError::JobSchedulingFailed {
                    target: self.service.target.clone(),
                    staged,
                    source: Box::new(source),
                })
            }
        }
    }

    /// Discard every pending value on the target.
    ///
    /// # Errors
    /// Transport errors and [`DracError::OperationFailed`].
    pub async fn abandon_pending(&self) -> Result<()> {
        let properties = Properties::new().with("Target", self.service.target.as_str());
        let doc = self
            .transport
            .invoke(
                self.service.resource,
                "DeletePendingConfiguration",
                &self.service.selectors,
                &properties,
            )
            .await?;
        check_return_value(&doc, self.service.resource, ReturnValue::Success)?;

        info!(fqdd = %self.service.target, "Pending configuration deleted");
        Ok(())
    }
}
