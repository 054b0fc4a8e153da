use crate::{BackendRegistry, ProcessDescriptor};
use chaincore::{
    BackendError, Chain, ChainError, ElementId, ElementKind, EventBus, ExecutionEvent,
    ExecutionMode, InvocationContext, JobController, JobHandle, JobId, JobOutcome, Parameter,
    Value,
};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Spawns and tracks jobs. Each job owns its own state channel, outcome
/// slot and cancellation token; no two jobs share mutable state. Job state
/// lives in memory only.
pub struct JobExecutor {
    backends: Arc<BackendRegistry>,
    event_bus: Arc<EventBus>,
    jobs: RwLock<HashMap<JobId, JobHandle>>,
}

impl JobExecutor {
    pub fn new(backends: Arc<BackendRegistry>, event_bus: Arc<EventBus>) -> Self {
        Self {
            backends,
            event_bus,
            jobs: RwLock::new(HashMap::new()),
        }
    }

    /// Launch one invocation of the given process chain. Client errors
    /// (unknown backend, missing required inputs) surface here before a
    /// job exists; execution errors surface on the returned handle, never
    /// to a caller that is merely polling.
    pub async fn execute(
        &self,
        chain: &Chain,
        descriptor: &ProcessDescriptor,
        inputs: HashMap<String, Value>,
        mode: ExecutionMode,
    ) -> Result<JobHandle, ChainError> {
        let exec = chain.resolve_execution_element()?;
        let code = exec
            .backend_code()
            .ok_or_else(|| ChainError::Invalid("execution element has no backend code".into()))?;
        let factory = self
            .backends
            .match_code(code)
            .ok_or_else(|| ChainError::UnknownBackend(code.to_string()))?;
        let backend = factory
            .create()
            .map_err(|e| ChainError::Invalid(format!("failed to create backend: {}", e)))?;

        for input in &chain.inputs {
            if input.is_required() && !inputs.contains_key(&input.code) {
                return Err(ChainError::MissingRequiredInput(input.code.clone()));
            }
        }

        let (parameters, arguments) = resolve_bindings(chain, exec.id, &inputs);

        let job_id = Uuid::new_v4();
        let (controller, handle) = JobController::new(job_id, descriptor.id.clone(), mode);
        self.jobs.write().await.insert(job_id, handle.clone());

        self.event_bus.emit(ExecutionEvent::JobAccepted {
            job_id,
            process_id: descriptor.id.clone(),
            timestamp: Utc::now(),
        });

        let ctx = InvocationContext {
            job_id,
            parameters,
            arguments,
            events: self.event_bus.create_emitter(job_id),
            cancellation: controller.cancellation(),
        };

        let event_bus = Arc::clone(&self.event_bus);
        let process_id = descriptor.id.clone();
        tokio::spawn(async move {
            let start = Instant::now();

            // Dismissed while still queued.
            if controller.is_cancelled() {
                controller.complete(JobOutcome::Dismissed);
                event_bus.emit(ExecutionEvent::JobDismissed {
                    job_id,
                    timestamp: Utc::now(),
                });
                return;
            }

            controller.mark_running();
            event_bus.emit(ExecutionEvent::JobStarted {
                job_id,
                timestamp: Utc::now(),
            });
            tracing::info!("job {} running process {}", job_id, process_id);

            let result = backend.invoke(ctx).await;
            let duration_ms = start.elapsed().as_millis() as u64;

            match result {
                Ok(value) => {
                    tracing::info!("job {} succeeded in {}ms", job_id, duration_ms);
                    event_bus.emit(ExecutionEvent::JobSucceeded {
                        job_id,
                        result: value.clone(),
                        duration_ms,
                        timestamp: Utc::now(),
                    });
                    controller.complete(JobOutcome::Succeeded(value));
                }
                Err(BackendError::Cancelled) => {
                    tracing::info!("job {} dismissed after {}ms", job_id, duration_ms);
                    event_bus.emit(ExecutionEvent::JobDismissed {
                        job_id,
                        timestamp: Utc::now(),
                    });
                    controller.complete(JobOutcome::Dismissed);
                }
                Err(err) => {
                    tracing::error!("job {} failed: {}", job_id, err);
                    event_bus.emit(ExecutionEvent::JobFailed {
                        job_id,
                        error: err.to_string(),
                        duration_ms,
                        timestamp: Utc::now(),
                    });
                    controller.complete(JobOutcome::Failed(err));
                }
            }
        });

        Ok(handle)
    }

    /// Look up a live or completed job
    pub async fn job(&self, job_id: JobId) -> Option<JobHandle> {
        self.jobs.read().await.get(&job_id).cloned()
    }
}

/// Resolve the execution element's parameter values: constant elements
/// feed it through their data links, caller inputs bind through the Start
/// links and override constants on matching codes. Declared inputs are
/// returned in declaration order for positional substitution.
fn resolve_bindings(
    chain: &Chain,
    exec_id: ElementId,
    inputs: &HashMap<String, Value>,
) -> (HashMap<String, Value>, Vec<(Parameter, Value)>) {
    let mut parameters = HashMap::new();

    for link in &chain.data_links {
        if link.target_element != exec_id {
            continue;
        }
        let Some(source) = chain.find_element(link.source_element) else {
            continue;
        };
        match &source.kind {
            ElementKind::Constant { value, .. } => {
                parameters.insert(link.target_input.clone(), value.clone());
            }
            ElementKind::Start => {
                if let Some(value) = inputs.get(&link.source_output) {
                    parameters.insert(link.target_input.clone(), value.clone());
                }
            }
            _ => {}
        }
    }

    for (code, value) in inputs {
        parameters.insert(code.clone(), value.clone());
    }

    let arguments = chain
        .inputs
        .iter()
        .map(|p| {
            let value = inputs.get(&p.code).cloned().unwrap_or(Value::Null);
            (p.clone(), value)
        })
        .collect();

    (parameters, arguments)
}
