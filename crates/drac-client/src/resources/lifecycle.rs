//! Lifecycle Controller operations: firmware version, remote services and
//! iDRAC user accounts.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use crate::capability::Version;
use crate::enumerator;
use crate::error::{DracError, Result};
use crate::job::{AttributeChange, ConfigService, JobProtocol, ScheduledJob, IDRAC_TARGET};
use crate::uris::Resource;
use crate::wsman::{
    check_return_value, find_nullable_value, find_value, Properties, ReturnValue, SelectorSet,
    Transport,
};

/// User slot of the built-in administrator account.
const ADMIN_USER_ID: u32 = 2;

/// Services that can be switched on or off on the iDRAC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RemoteService {
    Ipmi,
    Racadm,
    Snmp,
    Ssh,
    Telnet,
    Vnc,
    Web,
}

/// Short name and controller attribute id of every remote service.
static REMOTE_SERVICES: [(RemoteService, &str, &str); 7] = [
    (RemoteService::Ipmi, "ipmi", "iDRAC.Embedded.1#IPMILan.1#Enable"),
    (RemoteService::Racadm, "racadm", "iDRAC.Embedded.1#Racadm.1#Enable"),
    (RemoteService::Snmp, "snmp", "iDRAC.Embedded.1#SNMP.1#AgentEnable"),
    (RemoteService::Ssh, "ssh", "iDRAC.Embedded.1#SSH.1#Enable"),
    (RemoteService::Telnet, "telnet", "iDRAC.Embedded.1#Telnet.1#Enable"),
    (RemoteService::Vnc, "vnc", "iDRAC.Embedded.1#VNCServer.1#Enable"),
    (RemoteService::Web, "web", "iDRAC.Embedded.1#WebServer.1#Enable"),
];

impl RemoteService {
    /// All services, in table order.
    pub fn all() -> impl Iterator<Item = Self> {
        REMOTE_SERVICES.iter().map(|(service, _, _)| *service)
    }

    fn entry(self) -> &'static (RemoteService, &'static str, &'static str) {
        // Every variant has exactly one table row.
        &REMOTE_SERVICES[self as usize]
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        self.entry().1
    }

    /// Fully qualified id, e.g. `iDRAC.Embedded.1#SSH.1#Enable`.
    #[must_use]
    pub fn instance_id(self) -> &'static str {
        self.entry().2
    }

    /// Attribute name relative to the iDRAC target, e.g. `SSH.1#Enable`.
    #[must_use]
    pub fn attribute_name(self) -> &'static str {
        let id = self.instance_id();
        id.split_once('#').map_or(id, |(_, rest)| rest)
    }

    /// Reverse lookup from a fully qualified id.
    #[must_use]
    pub fn from_instance_id(instance_id: &str) -> Option<Self> {
        REMOTE_SERVICES
            .iter()
            .find(|(_, _, id)| *id == instance_id)
            .map(|(service, _, _)| *service)
    }
}

impl fmt::Display for RemoteService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RemoteService {
    type Err = DracError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase();
        REMOTE_SERVICES
            .iter()
            .find(|(_, name, _)| *name == wanted)
            .map(|(service, _, _)| *service)
            .ok_or_else(|| DracError::InvalidParameter(format!("unknown remote service '{s}'")))
    }
}

/// State of one remote service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RemoteServiceToggle {
    pub name: RemoteService,
    pub enabled: bool,
}

/// A configured iDRAC user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManagedUser {
    pub name: String,
    /// Target FQDD the account lives on, e.g. `iDRAC.Embedded.1`.
    pub target: String,
    /// Numeric user slot.
    pub user_id: u32,
}

pub struct LifecycleManagement {
    transport: Arc<dyn Transport>,
}

impl LifecycleManagement {
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Lifecycle Controller firmware version.
    ///
    /// # Errors
    /// Transport errors, a missing version field, or a malformed version.
    pub async fn get_version(&self) -> Result<Version> {
        lifecycle_version(self.transport.as_ref()).await
    }

    /// Remote services readiness, e.g. `Ready`.
    ///
    /// # Errors
    /// Transport errors, [`DracError::OperationFailed`], or a reply without
    /// `Status`.
    pub async fn get_status(&self) -> Result<String> {
        let resource = Resource::LcService;
        let doc = self
            .transport
            .invoke(
                resource,
                "GetRSStatus",
                &SelectorSet::for_service(resource),
                &Properties::new(),
            )
            .await?;
        check_return_value(&doc, resource, ReturnValue::Success)?;
        find_value(doc.root(), &resource.uri(), "Status")
    }

    /// Current state of every known remote service.
    ///
    /// Instances with an unknown id or without a current value are skipped.
    ///
    /// # Errors
    /// Transport errors, or an instance without `InstanceID`.
    pub async fn list_remote_services(&self) -> Result<Vec<RemoteServiceToggle>> {
        let resource = Resource::IdracCardEnumeration;
        let ns = resource.uri();
        let query = remote_services_query();
        let instances =
            enumerator::enumerate_instances(self.transport.as_ref(), resource, Some(query.as_str()))
                .await?;

        let mut toggles = Vec::with_capacity(instances.len());
        for instance in &instances {
            let instance_id = find_value(instance, &ns, "InstanceID")?;
            let Some(name) = RemoteService::from_instance_id(&instance_id) else {
                warn!(instance_id = %instance_id, "Skipping unknown remote service");
                continue;
            };
            let Some(value) = find_nullable_value(instance, &ns, "CurrentValue") else {
                debug!(service = %name, "Remote service has no current value");
                continue;
            };
            toggles.push(RemoteServiceToggle {
                name,
                enabled: value == "Enabled",
            });
        }
        Ok(toggles)
    }

    /// Enable or disable remote services with a single configuration job.
    ///
    /// Attributes are sent in the order given.
    ///
    /// # Errors
    /// [`DracError::InvalidParameter`] for an empty or repeated service,
    /// otherwise the errors of [`JobProtocol::apply`].
    pub async fn set_remote_services(
        &self,
        settings: &[(RemoteService, bool)],
    ) -> Result<ScheduledJob> {
        if settings.is_empty() {
            return Err(DracError::InvalidParameter(
                "no remote services given".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        let mut changes = Vec::with_capacity(settings.len());
        for &(service, enabled) in settings {
            if !seen.insert(service) {
                return Err(DracError::InvalidParameter(format!(
                    "remote service '{service}' given more than once"
                )));
            }
            let value = if enabled { "Enabled" } else { "Disabled" };
            changes.push(AttributeChange::new(service.attribute_name(), value));
        }

        self.idrac_jobs(IDRAC_TARGET).apply(&changes).await
    }

    /// Configured iDRAC user accounts. Empty slots are skipped.
    ///
    /// # Errors
    /// Transport errors.
    pub async fn list_users(&self) -> Result<Vec<ManagedUser>> {
        let resource = Resource::IdracCardString;
        let ns = resource.uri();
        let instances =
            enumerator::enumerate_instances(self.transport.as_ref(), resource, Some(USERS_QUERY))
                .await?;

        let users = instances
            .iter()
            .filter(|instance| {
                find_nullable_value(instance, &ns, "AttributeName").as_deref() == Some("UserName")
            })
            .filter_map(|instance| {
                let instance_id = find_nullable_value(instance, &ns, "InstanceID")?;
                let name = find_nullable_value(instance, &ns, "CurrentValue")
                    .filter(|name| !name.is_empty())?;
                let Some((target, user_id)) = split_user_id(&instance_id) else {
                    warn!(instance_id = %instance_id, "Skipping malformed user id");
                    return None;
                };
                Some(ManagedUser {
                    name,
                    target,
                    user_id,
                })
            })
            .collect();
        Ok(users)
    }

    /// Change the password of the account named `user`.
    ///
    /// # Errors
    /// [`DracError::InvalidParameter`] when no account has that name,
    /// otherwise the errors of [`JobProtocol::apply`].
    pub async fn set_user_password(&self, user: &str, password: &str) -> Result<ScheduledJob> {
        let account = self
            .list_users()
            .await?
            .into_iter()
            .find(|u| u.name == user)
            .ok_or_else(|| DracError::InvalidParameter(format!("unknown user '{user}'")))?;

        self.idrac_jobs(&account.target)
            .apply(&[password_change(account.user_id, password)])
            .await
    }

    /// Change the password of the built-in administrator.
    ///
    /// # Errors
    /// The errors of [`JobProtocol::apply`].
    pub async fn set_admin_password(&self, password: &str) -> Result<ScheduledJob> {
        self.idrac_jobs(IDRAC_TARGET)
            .apply(&[password_change(ADMIN_USER_ID, password)])
            .await
    }

    fn idrac_jobs(&self, target: &str) -> JobProtocol {
        JobProtocol::new(
            Arc::clone(&self.transport),
            ConfigService::idrac_card().with_target(target),
        )
    }
}

const USERS_QUERY: &str = "select * from DCIM_iDRACCardString where AttributeName = 'UserName'";

fn remote_services_query() -> String {
    let clauses: Vec<String> = RemoteService::all()
        .map(|service| format!("InstanceID='{}'", service.instance_id()))
        .collect();
    format!(
        "select CurrentValue from {} where {}",
        Resource::IdracCardEnumeration.class_name(),
        clauses.join(" or ")
    )
}

/// Read the Lifecycle Controller version from `DCIM_SystemView`.
pub(crate) async fn lifecycle_version(transport: &dyn Transport) -> Result<Version> {
    let resource = Resource::SystemView;
    let doc = transport
        .enumerate(
            resource,
            Some("select LifecycleControllerVersion from DCIM_SystemView"),
        )
        .await?;
    find_value(doc.root(), &resource.uri(), "LifecycleControllerVersion")?.parse()
}

// `iDRAC.Embedded.1#Users.3#UserName` -> (`iDRAC.Embedded.1`, 3)
fn split_user_id(instance_id: &str) -> Option<(String, u32)> {
    let mut segments = instance_id.split('#');
    let target = segments.next().filter(|t| !t.is_empty())?;
    let slot = segments.next()?;
    let user_id = slot.rsplit_once('.').map_or(slot, |(_, n)| n).parse().ok()?;
    Some((target.to_string(), user_id))
}

fn password_change(user_id: u32, password: &str) -> AttributeChange {
    AttributeChange::new(format!("Users.{user_id}#Password"), password)
}
