use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("Chain error: {0}")]
    Chain(#[from] ChainError),

    #[error("Job error: {0}")]
    Job(#[from] JobError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Error, Debug, Clone)]
pub enum BackendError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(String),

    #[error("Invalid parameter type for '{field}': expected {expected}, got {actual}")]
    InvalidParameterType {
        field: String,
        expected: String,
        actual: String,
    },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Placeholder ${index} has no matching declared input")]
    MissingArgument { index: usize },

    #[error("Declared input '{code}' (${index}) never occurs in the command template")]
    MissingPlaceholder { code: String, index: usize },

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Timeout after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("Cancelled")]
    Cancelled,
}

#[derive(Error, Debug)]
pub enum ChainError {
    #[error("Unknown process: {0}")]
    UnknownProcess(String),

    #[error("Unknown job: {0}")]
    UnknownJob(String),

    #[error("Invalid chain: {0}")]
    Invalid(String),

    #[error("Chain has no execution element")]
    MissingExecutionElement,

    #[error("Chain has {0} execution elements, exactly one is required")]
    MultipleExecutionElements(usize),

    #[error("No registered backend matches code: {0}")]
    UnknownBackend(String),

    #[error("Missing required input: {0}")]
    MissingRequiredInput(String),

    #[error("Invalid deployment: {0}")]
    InvalidDeployment(String),

    #[error("Store error: {0}")]
    Store(String),
}

#[derive(Error, Debug, Clone)]
pub enum JobError {
    #[error("Execution failed: {0}")]
    Failed(#[from] BackendError),

    #[error("Job was dismissed")]
    Dismissed,

    #[error("Job abandoned before reaching a terminal state")]
    Abandoned,
}
