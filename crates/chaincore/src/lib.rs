//! Core abstractions for the chain process engine
//!
//! This crate provides the fundamental types and traits that all other
//! components depend on: the chain graph model, the backend contract,
//! the job state machine, and the execution event bus.

mod backend;
mod chain;
mod error;
mod events;
mod job;
mod value;

pub use backend::{Backend, InvocationContext};
pub use chain::{
    Chain, ChainId, DataLink, Element, ElementId, ElementKind, FlowLink,
    Parameter, ValidationReport, Violation,
};
pub use error::{BackendError, ChainError, CoreError, JobError};
pub use events::{BackendEvent, EventBus, EventEmitter, ExecutionEvent};
pub use job::{ExecutionMode, JobController, JobHandle, JobId, JobOutcome, JobState};
pub use value::{Value, ValueType};

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, CoreError>;
