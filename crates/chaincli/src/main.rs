use anyhow::Result;
use chaincore::{Chain, ExecutionEvent, ExecutionMode, Value};
use chainruntime::{DeploymentRequest, ProcessingRuntime};
use clap::{Parser, Subcommand};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "chainproc")]
#[command(about = "Chain process engine CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Deploy a process from a deployment file and execute it
    Run {
        /// Path to deployment JSON file
        #[arg(short, long)]
        file: PathBuf,

        /// Input data as JSON object string
        #[arg(short, long)]
        input: Option<String>,

        /// Show verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Validate a chain definition file
    Validate {
        /// Path to chain JSON file
        file: PathBuf,
    },

    /// List available backend kinds
    Backends,

    /// Create a new example deployment file
    Init {
        /// Output file path
        #[arg(short, long, default_value = "deployment.json")]
        output: PathBuf,
    },
}

/// Convert a serde_json::Value to chaincore::Value
fn json_to_value(json: serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(b),
        serde_json::Value::Number(n) => {
            if let Some(f) = n.as_f64() {
                Value::Number(f)
            } else {
                Value::Number(n.as_i64().unwrap_or(0) as f64)
            }
        }
        serde_json::Value::String(s) => Value::String(s),
        serde_json::Value::Array(arr) => {
            Value::Array(arr.into_iter().map(json_to_value).collect())
        }
        serde_json::Value::Object(obj) => {
            let map: HashMap<String, Value> = obj
                .into_iter()
                .map(|(k, v)| (k, json_to_value(v)))
                .collect();
            Value::Object(map)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { file, input, verbose } => {
            if verbose {
                tracing_subscriber::fmt()
                    .with_max_level(tracing::Level::DEBUG)
                    .init();
            } else {
                tracing_subscriber::fmt()
                    .with_max_level(tracing::Level::WARN)
                    .init();
            }

            run_process(file, input).await?;
        }

        Commands::Validate { file } => {
            validate_chain(file)?;
        }

        Commands::Backends => {
            list_backends();
        }

        Commands::Init { output } => {
            create_example_deployment(output)?;
        }
    }

    Ok(())
}

async fn run_process(file: PathBuf, input: Option<String>) -> Result<()> {
    println!("Loading deployment from: {}", file.display());

    let deployment_json = std::fs::read_to_string(&file)?;
    let request = DeploymentRequest::from_json(&deployment_json)?;

    println!("Image:   {}", request.image);
    println!("Command: {}", request.run_command);
    println!();

    let inputs: HashMap<String, Value> = if let Some(input_str) = input {
        let json: serde_json::Value = serde_json::from_str(&input_str)?;
        if let serde_json::Value::Object(obj) = json {
            obj.into_iter()
                .map(|(k, v)| (k, json_to_value(v)))
                .collect()
        } else {
            return Err(anyhow::anyhow!("Input must be a JSON object"));
        }
    } else {
        HashMap::new()
    };

    let mut backends = chainruntime::BackendRegistry::new();
    chainbackends::register_all(&mut backends);
    let runtime = ProcessingRuntime::new(Arc::new(backends));

    let mut events = runtime.subscribe_events();
    let event_task = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                ExecutionEvent::JobAccepted { process_id, .. } => {
                    println!("Job accepted for process {}", process_id);
                }
                ExecutionEvent::JobStarted { .. } => {
                    println!("Job running");
                }
                ExecutionEvent::JobSucceeded { duration_ms, .. } => {
                    println!("Job succeeded in {}ms", duration_ms);
                }
                ExecutionEvent::JobFailed { error, duration_ms, .. } => {
                    println!("Job failed after {}ms: {}", duration_ms, error);
                }
                ExecutionEvent::JobDismissed { .. } => {
                    println!("Job dismissed");
                }
                ExecutionEvent::BackendEvent { event, .. } => match event {
                    chaincore::BackendEvent::Info { message } => {
                        println!("  {}", message);
                    }
                    chaincore::BackendEvent::Warning { message } => {
                        println!("  warning: {}", message);
                    }
                    chaincore::BackendEvent::Progress { percent, message } => {
                        if let Some(msg) = message {
                            println!("  {}% - {}", percent, msg);
                        } else {
                            println!("  {}%", percent);
                        }
                    }
                },
            }
        }
    });

    let process_id = runtime.deploy(request).await?;
    println!("Deployed process: {}", process_id);
    println!();

    let handle = runtime
        .execute(&process_id, inputs, ExecutionMode::Sync)
        .await?;
    let outcome = handle.result().await;

    // Let the event printer catch up before summarizing.
    tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
    event_task.abort();

    println!();
    match outcome {
        Ok(Some(value)) => println!("Result: {}", value.to_argument_string()),
        Ok(None) => println!("Result: (none)"),
        Err(e) => {
            println!("Execution failed: {}", e);
            std::process::exit(1);
        }
    }

    Ok(())
}

fn validate_chain(file: PathBuf) -> Result<()> {
    println!("Validating chain: {}", file.display());

    let chain_json = std::fs::read_to_string(&file)?;
    let chain: Chain = serde_json::from_str(&chain_json)?;

    let report = chain.validate();
    if report.is_valid() {
        println!("Chain is valid:");
        println!("   Title:      {}", chain.title);
        println!("   Elements:   {}", chain.elements.len());
        println!("   Data links: {}", chain.data_links.len());
        println!("   Flow links: {}", chain.flow_links.len());
        Ok(())
    } else {
        println!("Chain is invalid:");
        for violation in &report.violations {
            println!("   - {}", violation);
        }
        std::process::exit(1);
    }
}

fn list_backends() {
    println!("Available backend kinds:");
    println!();

    let mut backends = chainruntime::BackendRegistry::new();
    chainbackends::register_all(&mut backends);

    for kind in backends.list_kinds() {
        if let Some(metadata) = backends.get_metadata(&kind) {
            println!("  - {} ({})", kind, metadata.category);
            println!("    {}", metadata.description);
        } else {
            println!("  - {}", kind);
        }
    }
}

fn create_example_deployment(output: PathBuf) -> Result<()> {
    let example = serde_json::json!({
        "image": "alpine",
        "runCommand": "echo result:$1",
        "processDescription": {
            "title": "Echo",
            "abstract": "Echoes a message back through the result marker",
            "inputs": [
                { "id": "msg", "title": "Message", "minOccurs": 1, "maxOccurs": 1 }
            ],
            "outputs": [
                { "id": "out", "title": "Echoed message" }
            ]
        }
    });

    std::fs::write(&output, serde_json::to_string_pretty(&example)?)?;

    println!("Created example deployment: {}", output.display());
    println!();
    println!("Run it with:");
    println!(
        "  chainproc run --file {} --input '{{\"msg\": \"hello\"}}'",
        output.display()
    );

    Ok(())
}
