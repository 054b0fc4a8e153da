use crate::{BackendError, JobError, Value};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

pub type JobId = Uuid;

/// Lifecycle state of one invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Accepted,
    Running,
    Succeeded,
    Failed,
    Dismissed,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobState::Succeeded | JobState::Failed | JobState::Dismissed
        )
    }
}

/// Whether the caller asked for job control (status polling) or a
/// fire-and-block invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    Sync,
    Async,
}

/// Terminal outcome of a job
#[derive(Debug, Clone)]
pub enum JobOutcome {
    Succeeded(Option<Value>),
    Failed(BackendError),
    Dismissed,
}

impl JobOutcome {
    fn state(&self) -> JobState {
        match self {
            JobOutcome::Succeeded(_) => JobState::Succeeded,
            JobOutcome::Failed(_) => JobState::Failed,
            JobOutcome::Dismissed => JobState::Dismissed,
        }
    }
}

#[derive(Debug)]
struct JobShared {
    job_id: JobId,
    process_id: String,
    mode: ExecutionMode,
    /// Written exactly once, before the terminal state is published, so any
    /// observer of a terminal state can read the outcome.
    outcome: OnceLock<JobOutcome>,
    cancellation: CancellationToken,
}

/// Executor-side control surface for one job. Dropping the controller
/// without completing abandons the job; waiters observe that instead of
/// hanging.
#[derive(Debug)]
pub struct JobController {
    shared: Arc<JobShared>,
    state_tx: watch::Sender<JobState>,
}

impl JobController {
    pub fn new(
        job_id: JobId,
        process_id: impl Into<String>,
        mode: ExecutionMode,
    ) -> (Self, JobHandle) {
        let (state_tx, state_rx) = watch::channel(JobState::Accepted);
        let shared = Arc::new(JobShared {
            job_id,
            process_id: process_id.into(),
            mode,
            outcome: OnceLock::new(),
            cancellation: CancellationToken::new(),
        });
        (
            Self {
                shared: Arc::clone(&shared),
                state_tx,
            },
            JobHandle { shared, state_rx },
        )
    }

    pub fn job_id(&self) -> JobId {
        self.shared.job_id
    }

    pub fn mark_running(&self) {
        let _ = self.state_tx.send(JobState::Running);
    }

    /// Store the outcome, then publish the matching terminal state.
    pub fn complete(&self, outcome: JobOutcome) {
        let state = outcome.state();
        if self.shared.outcome.set(outcome).is_err() {
            tracing::warn!("job {} completed more than once", self.shared.job_id);
            return;
        }
        let _ = self.state_tx.send(state);
    }

    pub fn cancellation(&self) -> CancellationToken {
        self.shared.cancellation.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.shared.cancellation.is_cancelled()
    }
}

/// Caller-side view of one in-flight or completed invocation
#[derive(Debug, Clone)]
pub struct JobHandle {
    shared: Arc<JobShared>,
    state_rx: watch::Receiver<JobState>,
}

impl JobHandle {
    pub fn job_id(&self) -> JobId {
        self.shared.job_id
    }

    pub fn process_id(&self) -> &str {
        &self.shared.process_id
    }

    /// True if the process was executed with job control, i.e. it is
    /// designed to report progress
    pub fn is_asynchronous(&self) -> bool {
        self.shared.mode == ExecutionMode::Async
    }

    pub fn state(&self) -> JobState {
        *self.state_rx.borrow()
    }

    /// Status document for pollers. Synchronous jobs cannot meaningfully
    /// report mid-flight status and return `None`.
    pub fn request_status(&self) -> Option<JobState> {
        if self.is_asynchronous() {
            Some(self.state())
        } else {
            None
        }
    }

    /// Wait until the job reaches a terminal state and return its result.
    pub async fn result(&self) -> Result<Option<Value>, JobError> {
        let mut rx = self.state_rx.clone();
        let _ = rx.wait_for(|state| state.is_terminal()).await;
        self.outcome_result()
    }

    /// Bounded wait. `None` means the deadline elapsed before a terminal
    /// state was reached; that is an expected outcome, not an error. A zero
    /// duration never blocks.
    pub async fn result_timeout(
        &self,
        timeout: Duration,
    ) -> Option<Result<Option<Value>, JobError>> {
        match tokio::time::timeout(timeout, self.result()).await {
            Ok(result) => Some(result),
            Err(_) => None,
        }
    }

    /// Non-blocking probe. `None` until the job is terminal; afterwards the
    /// answer is stable.
    pub fn try_result(&self) -> Option<Result<Option<Value>, JobError>> {
        if self.state().is_terminal() {
            Some(self.outcome_result())
        } else {
            None
        }
    }

    /// Request cancellation and wait for the executor to acknowledge with a
    /// terminal state. A no-op on an already-terminal job.
    pub async fn dismiss(&self) -> JobState {
        if self.state().is_terminal() {
            return self.state();
        }
        self.shared.cancellation.cancel();
        let mut rx = self.state_rx.clone();
        let result = match rx.wait_for(|state| state.is_terminal()).await {
            Ok(state) => *state,
            Err(_) => self.state(),
        };
        result
    }

    fn outcome_result(&self) -> Result<Option<Value>, JobError> {
        match self.shared.outcome.get() {
            Some(JobOutcome::Succeeded(value)) => Ok(value.clone()),
            Some(JobOutcome::Failed(err)) => Err(JobError::Failed(err.clone())),
            Some(JobOutcome::Dismissed) => Err(JobError::Dismissed),
            None => Err(JobError::Abandoned),
        }
    }
}
