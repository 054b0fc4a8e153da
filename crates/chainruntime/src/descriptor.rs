use crate::BackendRegistry;
use chaincore::{Chain, ChainError, ElementKind, Parameter, Value, ValueType};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Runtime-derived, callable description of a chain: identifier plus
/// ordered input/output parameter specifications. Rebuilt on demand,
/// never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessDescriptor {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub inputs: Vec<Parameter>,
    pub outputs: Vec<Parameter>,
}

/// Derives callable process descriptors from chains, and compiles chains
/// back from simple deployment requests
#[derive(Clone)]
pub struct DescriptorFactory {
    backends: Arc<BackendRegistry>,
}

impl DescriptorFactory {
    pub fn new(backends: Arc<BackendRegistry>) -> Self {
        Self { backends }
    }

    /// Map a chain to its process descriptor. The backend's own fixed
    /// parameters come first; the chain's declared inputs and outputs are
    /// appended in declaration order, because callers must supply both.
    pub fn describe(&self, chain: &Chain) -> Result<ProcessDescriptor, ChainError> {
        let exec = chain.resolve_execution_element()?;
        let code = exec
            .backend_code()
            .ok_or_else(|| ChainError::Invalid("execution element has no backend code".into()))?;
        let factory = self
            .backends
            .match_code(code)
            .ok_or_else(|| ChainError::UnknownBackend(code.to_string()))?;
        let meta = factory.metadata();

        let mut inputs = meta.fixed_inputs;
        inputs.extend(chain.inputs.iter().cloned());
        let mut outputs = meta.outputs;
        outputs.extend(chain.outputs.iter().cloned());

        Ok(ProcessDescriptor {
            id: code.to_string(),
            title: chain.title.clone(),
            description: chain.description.clone(),
            inputs,
            outputs,
        })
    }

    /// Build the chain for a simple deployment request: one constant per
    /// fixed parameter, one data link per declared input and output, and
    /// Start -> execution -> End flow links. The inverse of [`describe`];
    /// this is how callers add new processes without code changes.
    pub fn compile(
        &self,
        kind: &str,
        fixed: Vec<(String, Value)>,
        inputs: Vec<Parameter>,
        outputs: Vec<Parameter>,
        title: impl Into<String>,
        description: Option<String>,
    ) -> Result<Chain, ChainError> {
        if self.backends.get(kind).is_none() {
            return Err(ChainError::UnknownBackend(kind.to_string()));
        }

        let backend_code = format!("{}-{}", kind, Uuid::new_v4());
        let mut chain = Chain::new(title);
        chain.description = description;

        let start = chain.add_element(ElementKind::Start);
        let end = chain.add_element(ElementKind::End);
        let exec = chain.add_element(ElementKind::Execution { backend_code });

        for (code, value) in fixed {
            let constant = chain.add_element(ElementKind::Constant {
                value_type: ValueType::of(&value),
                value,
            });
            chain.link_data(constant, "value", exec, code);
        }

        for input in &inputs {
            chain.link_data(start, input.code.clone(), exec, input.code.clone());
        }
        for output in &outputs {
            chain.link_data(exec, output.code.clone(), end, output.code.clone());
        }

        chain.link_flow(start, exec);
        chain.link_flow(exec, end);

        chain.inputs = inputs;
        chain.outputs = outputs;

        Ok(chain)
    }
}
