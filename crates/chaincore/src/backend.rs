use crate::{BackendError, EventEmitter, JobId, Parameter, Value};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;

/// Core trait implemented by every execution backend
#[async_trait]
pub trait Backend: Send + Sync {
    /// Backend kind token (e.g. "docker.run")
    fn kind(&self) -> &str;

    /// Perform one invocation with resolved parameter values, producing at
    /// most one result value
    async fn invoke(&self, ctx: InvocationContext) -> Result<Option<Value>, BackendError>;

    /// Optional: check a deployment's fixed parameters and declared inputs
    /// before the chain is persisted, so wiring errors surface at
    /// registration time rather than on first run
    fn validate_deployment(
        &self,
        _fixed: &HashMap<String, Value>,
        _declared_inputs: &[Parameter],
    ) -> Result<(), BackendError> {
        Ok(())
    }
}

/// Resolved execution context passed to a backend invocation
#[derive(Clone)]
pub struct InvocationContext {
    pub job_id: JobId,

    /// Fixed configuration values for the backend (constants resolved from
    /// the chain, plus caller-supplied overrides)
    pub parameters: HashMap<String, Value>,

    /// Declared external inputs with their supplied values, in declaration
    /// order. This order assigns the positional placeholder indices.
    pub arguments: Vec<(Parameter, Value)>,

    /// Event emitter for real-time updates
    pub events: EventEmitter,

    /// Cancellation token; a dismissed job cancels this and the backend
    /// must terminate the external computation
    pub cancellation: CancellationToken,
}

impl InvocationContext {
    /// Get required parameter or return error
    pub fn require_parameter(&self, name: &str) -> Result<&Value, BackendError> {
        self.parameters
            .get(name)
            .ok_or_else(|| BackendError::MissingParameter(name.to_string()))
    }

    /// Get required parameter as a string
    pub fn parameter_str(&self, name: &str) -> Result<&str, BackendError> {
        self.require_parameter(name)?
            .as_str()
            .ok_or_else(|| BackendError::InvalidParameterType {
                field: name.to_string(),
                expected: "string".to_string(),
                actual: "other".to_string(),
            })
    }

    /// Look up a declared input's value by code
    pub fn argument(&self, code: &str) -> Option<&Value> {
        self.arguments
            .iter()
            .find(|(p, _)| p.code == code)
            .map(|(_, v)| v)
    }
}
