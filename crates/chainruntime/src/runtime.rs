use crate::store::ChainStore;
use crate::{
    BackendRegistry, DescriptorFactory, JobExecutor, MemoryChainStore, ProcessDescriptor,
    ProcessInventory, ProcessRegistry,
};
use chaincore::{
    ChainError, EventBus, ExecutionEvent, ExecutionMode, JobHandle, JobId, JobState, Parameter,
    Value, ValueType,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Backend kind the container-runner deployment path targets
pub const CONTAINER_BACKEND_KIND: &str = "docker.run";

/// Main runtime facade: deployment, discovery and execution of processes
pub struct ProcessingRuntime {
    backends: Arc<BackendRegistry>,
    factory: DescriptorFactory,
    registry: ProcessRegistry,
    executor: JobExecutor,
    event_bus: Arc<EventBus>,
    store: Arc<dyn ChainStore>,
}

impl ProcessingRuntime {
    /// Create a runtime with an in-memory chain store and default settings
    pub fn new(backends: Arc<BackendRegistry>) -> Self {
        Self::with_config(
            backends,
            Arc::new(MemoryChainStore::new()),
            RuntimeConfig::default(),
        )
    }

    pub fn with_config(
        backends: Arc<BackendRegistry>,
        store: Arc<dyn ChainStore>,
        config: RuntimeConfig,
    ) -> Self {
        let event_bus = Arc::new(EventBus::new(config.event_buffer_size));
        let factory = DescriptorFactory::new(Arc::clone(&backends));
        let registry = ProcessRegistry::new(Arc::clone(&store), factory.clone());
        let executor = JobExecutor::new(Arc::clone(&backends), Arc::clone(&event_bus));

        Self {
            backends,
            factory,
            registry,
            executor,
            event_bus,
            store,
        }
    }

    pub fn backends(&self) -> &Arc<BackendRegistry> {
        &self.backends
    }

    pub fn registry(&self) -> &ProcessRegistry {
        &self.registry
    }

    /// Register a new container process from a deployment request. The
    /// compiled chain is validated and the backend checks the command
    /// wiring before anything is persisted, so misdeployments fail here
    /// rather than on first run.
    pub async fn deploy(&self, request: DeploymentRequest) -> Result<String, ChainError> {
        self.deploy_kind(CONTAINER_BACKEND_KIND, request).await
    }

    pub async fn deploy_kind(
        &self,
        kind: &str,
        request: DeploymentRequest,
    ) -> Result<String, ChainError> {
        if request.image.trim().is_empty() {
            return Err(ChainError::InvalidDeployment("image must not be empty".into()));
        }

        let description = request.process_description.clone().unwrap_or_default();
        let title = description
            .title
            .clone()
            .unwrap_or_else(|| request.image.clone());
        let inputs: Vec<Parameter> = description.inputs.iter().map(Parameter::from).collect();
        let outputs: Vec<Parameter> = description.outputs.iter().map(Parameter::from).collect();

        let fixed = vec![
            ("image".to_string(), Value::String(request.image.clone())),
            (
                "command".to_string(),
                Value::String(request.run_command.clone()),
            ),
        ];

        let chain = self.factory.compile(
            kind,
            fixed.clone(),
            inputs,
            outputs,
            title,
            description.summary.clone(),
        )?;

        let report = chain.validate();
        if !report.is_valid() {
            return Err(ChainError::Invalid(report.to_string()));
        }

        let factory = self
            .backends
            .get(kind)
            .ok_or_else(|| ChainError::UnknownBackend(kind.to_string()))?;
        let backend = factory
            .create()
            .map_err(|e| ChainError::Invalid(format!("failed to create backend: {}", e)))?;
        let fixed_map: HashMap<String, Value> = fixed.into_iter().collect();
        backend
            .validate_deployment(&fixed_map, &chain.inputs)
            .map_err(|e| ChainError::InvalidDeployment(e.to_string()))?;

        let process_id = chain
            .resolve_execution_element()?
            .backend_code()
            .unwrap_or_default()
            .to_string();
        self.store.create(chain).await?;
        tracing::info!("deployed process {}", process_id);
        Ok(process_id)
    }

    pub async fn inventory(&self) -> Result<ProcessInventory, ChainError> {
        self.registry.inventory().await
    }

    pub async fn list(&self) -> Result<Vec<ProcessDescriptor>, ChainError> {
        self.registry.list().await
    }

    pub async fn describe(&self, process_id: &str) -> Result<ProcessDescriptor, ChainError> {
        self.registry.get(process_id).await
    }

    pub async fn execute(
        &self,
        process_id: &str,
        inputs: HashMap<String, Value>,
        mode: ExecutionMode,
    ) -> Result<JobHandle, ChainError> {
        let descriptor = self.registry.get(process_id).await?;
        let chain = self.registry.get_chain(process_id).await?;
        self.executor.execute(&chain, &descriptor, inputs, mode).await
    }

    pub async fn job(&self, job_id: JobId) -> Option<JobHandle> {
        self.executor.job(job_id).await
    }

    pub async fn status(&self, job_id: JobId) -> Result<Option<JobState>, ChainError> {
        let handle = self
            .job(job_id)
            .await
            .ok_or_else(|| ChainError::UnknownJob(job_id.to_string()))?;
        Ok(handle.request_status())
    }

    pub async fn dismiss(&self, job_id: JobId) -> Result<JobState, ChainError> {
        let handle = self
            .job(job_id)
            .await
            .ok_or_else(|| ChainError::UnknownJob(job_id.to_string()))?;
        Ok(handle.dismiss().await)
    }

    /// Remove every chain-backed process from the store
    pub async fn clear_all(&self) -> Result<(), ChainError> {
        self.registry.clear_all().await
    }

    /// Subscribe to execution events
    pub fn subscribe_events(&self) -> tokio::sync::broadcast::Receiver<ExecutionEvent> {
        self.event_bus.subscribe()
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }
}

/// Configuration for the runtime
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub event_buffer_size: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            event_buffer_size: 1000,
        }
    }
}

/// Deployment request for a container process: "run this image with this
/// command template and these parameters"
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentRequest {
    pub image: String,
    pub run_command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process_description: Option<ProcessDescription>,
}

impl DeploymentRequest {
    pub fn from_json(json: &str) -> Result<Self, ChainError> {
        serde_json::from_str(json).map_err(|e| ChainError::InvalidDeployment(e.to_string()))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessDescription {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, rename = "abstract")]
    pub summary: Option<String>,
    #[serde(default)]
    pub inputs: Vec<DeploymentParameter>,
    #[serde(default)]
    pub outputs: Vec<DeploymentParameter>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentParameter {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, rename = "abstract")]
    pub summary: Option<String>,
    #[serde(default = "default_occurs")]
    pub min_occurs: u32,
    #[serde(default = "default_occurs")]
    pub max_occurs: u32,
}

fn default_occurs() -> u32 {
    1
}

impl From<&DeploymentParameter> for Parameter {
    fn from(p: &DeploymentParameter) -> Self {
        Self {
            code: p.id.clone(),
            // Container arguments are strings on the command line.
            value_type: ValueType::String,
            title: p.title.clone(),
            description: p.summary.clone(),
            min_occurs: p.min_occurs,
            max_occurs: p.max_occurs,
        }
    }
}
