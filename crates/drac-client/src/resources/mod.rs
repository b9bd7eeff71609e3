//! Domain managers built on the enumerator and the job protocol.

pub mod attributes;
pub mod cpu;
pub mod jobs;
pub mod lifecycle;
pub mod memory;
pub mod nic;
pub mod system;

pub use attributes::AttributeManagement;
pub use cpu::{Cpu, CpuManagement};
pub use jobs::{Job, JobManagement};
pub use lifecycle::{LifecycleManagement, ManagedUser, RemoteService, RemoteServiceToggle};
pub use memory::{Memory, MemoryManagement};
pub use nic::{NetworkInterface, NicManagement};
pub use system::{System, SystemManagement, SystemStatus};
