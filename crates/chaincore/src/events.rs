use crate::{JobId, Value};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Events emitted around job execution
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ExecutionEvent {
    JobAccepted {
        job_id: JobId,
        process_id: String,
        timestamp: DateTime<Utc>,
    },
    JobStarted {
        job_id: JobId,
        timestamp: DateTime<Utc>,
    },
    JobSucceeded {
        job_id: JobId,
        result: Option<Value>,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },
    JobFailed {
        job_id: JobId,
        error: String,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },
    JobDismissed {
        job_id: JobId,
        timestamp: DateTime<Utc>,
    },
    BackendEvent {
        job_id: JobId,
        event: BackendEvent,
        timestamp: DateTime<Utc>,
    },
}

/// Events a backend can surface while a job runs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type")]
pub enum BackendEvent {
    Info { message: String },
    Warning { message: String },
    Progress { percent: f64, message: Option<String> },
}

/// Event emitter bound to one job, handed to backends for real-time updates
#[derive(Clone)]
pub struct EventEmitter {
    job_id: JobId,
    sender: broadcast::Sender<ExecutionEvent>,
}

impl EventEmitter {
    pub fn new(job_id: JobId, sender: broadcast::Sender<ExecutionEvent>) -> Self {
        Self { job_id, sender }
    }

    /// Emit a backend-specific event
    pub fn emit(&self, event: BackendEvent) {
        let _ = self.sender.send(ExecutionEvent::BackendEvent {
            job_id: self.job_id,
            event,
            timestamp: Utc::now(),
        });
    }

    /// Emit info message
    pub fn info(&self, message: impl Into<String>) {
        self.emit(BackendEvent::Info {
            message: message.into(),
        });
    }

    /// Emit warning message
    pub fn warn(&self, message: impl Into<String>) {
        self.emit(BackendEvent::Warning {
            message: message.into(),
        });
    }

    /// Emit progress update
    pub fn progress(&self, percent: f64, message: Option<String>) {
        self.emit(BackendEvent::Progress { percent, message });
    }
}

/// Global event bus
pub struct EventBus {
    sender: broadcast::Sender<ExecutionEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ExecutionEvent> {
        self.sender.subscribe()
    }

    pub fn emit(&self, event: ExecutionEvent) {
        let _ = self.sender.send(event);
    }

    pub fn create_emitter(&self, job_id: JobId) -> EventEmitter {
        EventEmitter::new(job_id, self.sender.clone())
    }
}
