//! Standard backend library
//!
//! Concrete execution backends that perform invocations for registered
//! processes.

mod docker;
pub mod template;

pub use docker::{DockerBackend, DockerBackendFactory};

use chainruntime::BackendRegistry;
use std::sync::Arc;

/// Register all standard backends with a registry
pub fn register_all(registry: &mut BackendRegistry) {
    registry.register(Arc::new(docker::DockerBackendFactory));
}
