use crate::template;
use async_trait::async_trait;
use chaincore::{Backend, BackendError, InvocationContext, Parameter, Value, ValueType};
use chainruntime::{BackendFactory, BackendMetadata};
use std::collections::HashMap;
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

/// Line prefix on standard output that carries the single result value
const RESULT_MARKER: &str = "result:";

/// Backend that executes Docker containers. The command template is
/// rendered with the declared inputs, the container runs to completion,
/// and the first stdout line starting with the result marker becomes the
/// result value.
pub struct DockerBackend;

#[async_trait]
impl Backend for DockerBackend {
    fn kind(&self) -> &str {
        "docker.run"
    }

    async fn invoke(&self, ctx: InvocationContext) -> Result<Option<Value>, BackendError> {
        let image = ctx.parameter_str("image")?.to_string();
        let command_template = ctx.parameter_str("command")?;

        let rendered = template::render(command_template, &ctx.arguments)?;

        ctx.events.info(format!("Running Docker image: {}", image));

        let mut cmd = Command::new("docker");
        cmd.arg("run").arg("--rm").arg(&image);
        for part in shell_words::split(&rendered).map_err(|_| {
            BackendError::Configuration(format!("unbalanced quotes in command: {}", rendered))
        })? {
            cmd.arg(part);
        }

        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        ctx.events.info("Starting container...");

        let mut child = cmd
            .spawn()
            .map_err(|e| BackendError::ExecutionFailed(format!("Failed to spawn docker: {}", e)))?;

        // Single producer: one task drains stdout and keeps the first
        // result line while the invoking task waits for the child.
        let stdout = child.stdout.take();
        let drain = tokio::spawn(async move {
            let mut result_line = None;
            if let Some(stdout) = stdout {
                let mut lines = BufReader::new(stdout).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    if result_line.is_none() {
                        if let Some(rest) = line.strip_prefix(RESULT_MARKER) {
                            result_line = Some(rest.trim().to_string());
                        }
                    }
                }
            }
            result_line
        });

        let stderr = child.stderr.take();
        let events = ctx.events.clone();
        let stderr_task = tokio::spawn(async move {
            if let Some(stderr) = stderr {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    events.warn(format!("container stderr: {}", line));
                }
            }
        });

        let status = tokio::select! {
            _ = ctx.cancellation.cancelled() => {
                // Dismissal must terminate the container, not just stop
                // observing it.
                let _ = child.kill().await;
                drain.abort();
                stderr_task.abort();
                return Err(BackendError::Cancelled);
            }
            status = child.wait() => status.map_err(|e| {
                BackendError::ExecutionFailed(format!("Failed to wait for process: {}", e))
            })?,
        };

        let result_line = drain.await.unwrap_or(None);
        let _ = stderr_task.await;

        if !status.success() {
            return Err(BackendError::ExecutionFailed(format!(
                "Container exited with status: {}",
                status
            )));
        }

        ctx.events.info(format!(
            "Container completed successfully (exit code: {})",
            status.code().unwrap_or(0)
        ));

        Ok(result_line.map(Value::String))
    }

    fn validate_deployment(
        &self,
        fixed: &HashMap<String, Value>,
        declared_inputs: &[Parameter],
    ) -> Result<(), BackendError> {
        let command = fixed
            .get("command")
            .and_then(|v| v.as_str())
            .ok_or_else(|| BackendError::MissingParameter("command".to_string()))?;
        template::check(command, declared_inputs)
    }
}

pub struct DockerBackendFactory;

impl BackendFactory for DockerBackendFactory {
    fn kind(&self) -> &str {
        "docker.run"
    }

    fn create(&self) -> Result<Arc<dyn Backend>, BackendError> {
        Ok(Arc::new(DockerBackend))
    }

    fn metadata(&self) -> BackendMetadata {
        BackendMetadata {
            description: "Execute a Docker container and read its result line from stdout"
                .to_string(),
            category: "docker".to_string(),
            fixed_inputs: vec![
                Parameter::required("image", ValueType::String)
                    .with_description("Container image to run"),
                Parameter::required("command", ValueType::String)
                    .with_description("Command template with $1, $2, ... placeholders"),
            ],
            outputs: vec![Parameter::optional("result", ValueType::String)
                .with_description("Value of the first stdout line starting with 'result:'")],
        }
    }
}

mod shell_words {
    pub fn split(s: &str) -> Result<Vec<String>, ()> {
        let mut words = Vec::new();
        let mut current = String::new();
        let mut quote: Option<char> = None;
        let mut escape = false;

        for c in s.chars() {
            if escape {
                current.push(c);
                escape = false;
            } else if c == '\\' && quote != Some('\'') {
                escape = true;
            } else if let Some(q) = quote {
                if c == q {
                    quote = None;
                } else {
                    current.push(c);
                }
            } else if c == '"' || c == '\'' {
                quote = Some(c);
            } else if c.is_whitespace() {
                if !current.is_empty() {
                    words.push(current.clone());
                    current.clear();
                }
            } else {
                current.push(c);
            }
        }

        if quote.is_some() || escape {
            return Err(());
        }
        if !current.is_empty() {
            words.push(current);
        }

        Ok(words)
    }
}
