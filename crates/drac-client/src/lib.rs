//! WS-Management client for Dell iDRAC and the Lifecycle Controller.
//!
//! Reads are enumerations of DCIM classes parsed into plain records.
//! Configuration writes follow the controller's two-phase model: values are
//! staged as pending with `SetAttributes`, then a configuration job is
//! scheduled to apply them. See [`job::JobProtocol`].
//!
//! # Example
//!
//! ```rust,ignore
//! use drac_client::{DracClient, EndpointConfig, RemoteService};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = DracClient::new(&EndpointConfig::from_env()?)?;
//!
//!     for cpu in client.cpus().list_cpus().await? {
//!         println!("{}: {} cores", cpu.id, cpu.cores);
//!     }
//!
//!     let job = client
//!         .lifecycle()
//!         .set_remote_services(&[(RemoteService::Ssh, true), (RemoteService::Telnet, false)])
//!         .await?;
//!     println!("scheduled {}", job.job_id);
//!
//!     Ok(())
//! }
//! ```

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod attribute;
pub mod capability;
pub mod client;
pub mod config;
pub mod enumerator;
pub mod error;
pub mod job;
pub mod resources;
pub mod uris;
pub mod wsman;

#[cfg(test)]
mod testing;

pub use attribute::{Attribute, AttributeKind, AttributeSet, AttributeType, AttributeValue, Rejection};
pub use capability::{Feature, Version};
pub use client::DracClient;
pub use config::EndpointConfig;
pub use error::{DracError, Result};
pub use job::{AttributeChange, ConfigService, JobProtocol, ScheduledJob};
pub use resources::{
    Cpu, Job, ManagedUser, Memory, NetworkInterface, RemoteService, RemoteServiceToggle, System,
    SystemStatus,
};
pub use uris::Resource;
pub use wsman::{Transport, WsmanClient};
