//! Lifecycle job status.
//!
//! Jobs are only observed here; waiting for completion is up to the caller.

use std::sync::Arc;

use serde::Serialize;

use crate::enumerator;
use crate::error::{DracError, Result};
use crate::uris::Resource;
use crate::wsman::{find_nullable_value, find_value, Element, Transport};

const UNFINISHED_JOBS_QUERY: &str = concat!(
    r#"select * from DCIM_LifecycleJob where Name != "CLEARALL" and"#,
    r#" JobStatus != "Reboot Completed" and JobStatus != "Completed" and"#,
    r#" JobStatus != "Completed with Errors" and JobStatus != "Failed""#,
);

/// One Lifecycle Controller job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Job {
    /// Job id, e.g. `JID_471269252011`.
    pub id: String,
    pub name: Option<String>,
    pub start_time: Option<String>,
    pub until_time: Option<String>,
    pub message: Option<String>,
    /// Controller status text, e.g. `Scheduled` or `Completed`.
    pub status: String,
    pub percent_complete: Option<u8>,
}

impl Job {
    /// True once the controller will do no further work on the job.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        matches!(
            self.status.as_str(),
            "Completed" | "Completed with Errors" | "Failed" | "Reboot Completed"
        )
    }
}

pub struct JobManagement {
    transport: Arc<dyn Transport>,
}

impl JobManagement {
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Look up one job.
    ///
    /// # Errors
    /// Transport errors and malformed job instances.
    pub async fn get_job(&self, job_id: &str) -> Result<Option<Job>> {
        if job_id.contains('"') {
            return Err(DracError::InvalidParameter(format!("invalid job id '{job_id}'")));
        }
        let query = format!(r#"select * from DCIM_LifecycleJob where InstanceID="{job_id}""#);
        let jobs = enumerator::list(
            self.transport.as_ref(),
            Resource::LifecycleJob,
            Some(query.as_str()),
            parse_job,
        )
        .await?;
        Ok(jobs.into_iter().next())
    }

    /// List jobs, optionally only those still queued or running.
    ///
    /// # Errors
    /// Transport errors and malformed job instances.
    pub async fn list_jobs(&self, only_unfinished: bool) -> Result<Vec<Job>> {
        let filter = only_unfinished.then_some(UNFINISHED_JOBS_QUERY);
        enumerator::list(self.transport.as_ref(), Resource::LifecycleJob, filter, parse_job).await
    }
}

fn parse_job(job: &Element) -> Result<Job> {
    let ns = Resource::LifecycleJob.uri();
    let optional = |field: &str| find_nullable_value(job, &ns, field).filter(|v| !v.is_empty());

    let percent_complete = match optional("PercentComplete") {
        None => None,
        Some(text) => Some(text.parse().map_err(|_| {
            DracError::InvalidResponse(format!("invalid PercentComplete '{text}'"))
        })?),
    };

    Ok(Job {
        id: find_value(job, &ns, "InstanceID")?,
        name: optional("Name"),
        start_time: optional("JobStartTime"),
        until_time: optional("JobUntilTime"),
        message: optional("Message"),
        status: find_value(job, &ns, "JobStatus")?,
        percent_complete,
    })
}
