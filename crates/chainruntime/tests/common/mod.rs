use async_trait::async_trait;
use chaincore::{Backend, BackendError, InvocationContext, Parameter, Value, ValueType};
use chainruntime::{BackendFactory, BackendMetadata, BackendRegistry};
use std::sync::Arc;

/// In-tree backend for hermetic runtime tests. Behavior is driven by the
/// "command" fixed parameter: "block" waits for cancellation,
/// "fail:<msg>" fails with that message, anything else echoes the "msg"
/// declared input back as the result.
pub struct StubBackend;

#[async_trait]
impl Backend for StubBackend {
    fn kind(&self) -> &str {
        "stub.run"
    }

    async fn invoke(&self, ctx: InvocationContext) -> Result<Option<Value>, BackendError> {
        let command = ctx
            .parameters
            .get("command")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string();

        if command == "block" {
            ctx.cancellation.cancelled().await;
            return Err(BackendError::Cancelled);
        }
        if let Some(message) = command.strip_prefix("fail:") {
            return Err(BackendError::ExecutionFailed(message.to_string()));
        }
        Ok(ctx.argument("msg").cloned())
    }
}

pub struct StubBackendFactory;

impl BackendFactory for StubBackendFactory {
    fn kind(&self) -> &str {
        "stub.run"
    }

    fn create(&self) -> Result<Arc<dyn Backend>, BackendError> {
        Ok(Arc::new(StubBackend))
    }

    fn metadata(&self) -> BackendMetadata {
        BackendMetadata {
            description: "Test backend that echoes its msg input".to_string(),
            category: "test".to_string(),
            fixed_inputs: vec![
                Parameter::required("image", ValueType::String),
                Parameter::required("command", ValueType::String),
            ],
            outputs: vec![Parameter::optional("result", ValueType::String)],
        }
    }
}

pub fn stub_registry() -> Arc<BackendRegistry> {
    let mut registry = BackendRegistry::new();
    registry.register(Arc::new(StubBackendFactory));
    Arc::new(registry)
}
