//! Process runtime
//!
//! This crate provides the runtime side of the engine: the backend factory
//! registry, dynamic descriptor derivation, the chain store boundary, the
//! process registry and the job executor that turns chains into running
//! jobs.

mod descriptor;
mod executor;
mod processes;
mod registry;
mod runtime;
mod store;

pub use descriptor::{DescriptorFactory, ProcessDescriptor};
pub use executor::JobExecutor;
pub use processes::{ProcessInventory, ProcessRegistry, UnavailableProcess};
pub use registry::{BackendFactory, BackendMetadata, BackendRegistry};
pub use runtime::{
    DeploymentParameter, DeploymentRequest, ProcessDescription, ProcessingRuntime,
    RuntimeConfig, CONTAINER_BACKEND_KIND,
};
pub use store::{ChainStore, MemoryChainStore};
