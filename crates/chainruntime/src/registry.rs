use chaincore::{Backend, BackendError, Parameter};
use std::collections::HashMap;
use std::sync::Arc;

/// Factory trait for creating backend instances
pub trait BackendFactory: Send + Sync {
    /// Backend kind token, the namespace prefix of execution element codes
    /// (e.g. "docker.run" matches "docker.run-<uuid>")
    fn kind(&self) -> &str;

    /// Create a new backend instance
    fn create(&self) -> Result<Arc<dyn Backend>, BackendError>;

    /// Optional: backend metadata (description, fixed parameters, outputs)
    fn metadata(&self) -> BackendMetadata {
        BackendMetadata::default()
    }
}

/// Metadata about a backend kind
#[derive(Debug, Clone)]
pub struct BackendMetadata {
    pub description: String,
    pub category: String,
    /// Fixed input parameters every process of this kind carries, listed
    /// before any chain-declared inputs
    pub fixed_inputs: Vec<Parameter>,
    /// Outputs produced by the backend itself
    pub outputs: Vec<Parameter>,
}

impl Default for BackendMetadata {
    fn default() -> Self {
        Self {
            description: String::new(),
            category: "general".to_string(),
            fixed_inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }
}

/// Registry of available backend kinds. Replaces ad-hoc string-prefix
/// matching with an explicit kind-to-factory map.
pub struct BackendRegistry {
    factories: HashMap<String, Arc<dyn BackendFactory>>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register a backend factory
    pub fn register(&mut self, factory: Arc<dyn BackendFactory>) {
        let kind = factory.kind().to_string();
        tracing::info!("Registering backend kind: {}", kind);
        self.factories.insert(kind, factory);
    }

    /// Look up a factory by its exact kind token
    pub fn get(&self, kind: &str) -> Option<Arc<dyn BackendFactory>> {
        self.factories.get(kind).cloned()
    }

    /// Resolve the factory whose kind token prefixes an execution element
    /// code: "docker.run-\<uuid\>" resolves the "docker.run" factory.
    pub fn match_code(&self, backend_code: &str) -> Option<Arc<dyn BackendFactory>> {
        self.factories
            .iter()
            .find_map(|(kind, factory)| match backend_code.strip_prefix(kind.as_str()) {
                Some("") => Some(Arc::clone(factory)),
                Some(rest) if rest.starts_with('-') => Some(Arc::clone(factory)),
                _ => None,
            })
    }

    /// Get all registered backend kinds
    pub fn list_kinds(&self) -> Vec<String> {
        let mut kinds: Vec<String> = self.factories.keys().cloned().collect();
        kinds.sort();
        kinds
    }

    /// Get metadata for a backend kind
    pub fn get_metadata(&self, kind: &str) -> Option<BackendMetadata> {
        self.factories.get(kind).map(|f| f.metadata())
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::new()
    }
}
