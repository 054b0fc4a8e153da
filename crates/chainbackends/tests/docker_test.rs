use chainbackends::DockerBackend;
use chaincore::{
    Backend, BackendError, EventBus, InvocationContext, Parameter, Value, ValueType,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

fn create_test_context(
    parameters: HashMap<String, Value>,
    arguments: Vec<(Parameter, Value)>,
) -> InvocationContext {
    let event_bus = Arc::new(EventBus::new(100));
    let job_id = uuid::Uuid::new_v4();

    InvocationContext {
        job_id,
        parameters,
        arguments,
        events: event_bus.create_emitter(job_id),
        cancellation: CancellationToken::new(),
    }
}

fn docker_params(image: &str, command: &str) -> HashMap<String, Value> {
    let mut parameters = HashMap::new();
    parameters.insert("image".to_string(), Value::from(image));
    parameters.insert("command".to_string(), Value::from(command));
    parameters
}

#[tokio::test]
async fn missing_image_parameter_fails_before_spawning() {
    let backend = DockerBackend;
    let mut parameters = HashMap::new();
    parameters.insert("command".to_string(), Value::from("echo hi"));

    let ctx = create_test_context(parameters, Vec::new());
    match backend.invoke(ctx).await {
        Err(BackendError::MissingParameter(name)) => assert_eq!(name, "image"),
        other => panic!("expected missing parameter, got {:?}", other),
    }
}

#[tokio::test]
async fn unmatched_placeholder_fails_before_spawning() {
    let backend = DockerBackend;
    let ctx = create_test_context(docker_params("alpine", "echo $1 $2"), vec![(
        Parameter::required("msg", ValueType::String),
        Value::from("hello"),
    )]);

    assert!(matches!(
        backend.invoke(ctx).await,
        Err(BackendError::MissingArgument { index: 2 })
    ));
}

#[tokio::test]
async fn deployment_validation_checks_command_wiring() {
    let backend = DockerBackend;
    let fixed = docker_params("alpine", "echo result:$1");
    let inputs = vec![Parameter::required("msg", ValueType::String)];
    backend.validate_deployment(&fixed, &inputs).unwrap();

    let unused = vec![
        Parameter::required("msg", ValueType::String),
        Parameter::required("extra", ValueType::String),
    ];
    assert!(matches!(
        backend.validate_deployment(&fixed, &unused),
        Err(BackendError::MissingPlaceholder { index: 2, .. })
    ));
}

#[tokio::test]
#[ignore = "requires a docker daemon"]
async fn result_marker_line_becomes_the_result_value() {
    let backend = DockerBackend;
    let ctx = create_test_context(docker_params("alpine", "echo result:$1"), vec![(
        Parameter::required("msg", ValueType::String),
        Value::from("hello"),
    )]);

    let result = backend.invoke(ctx).await.unwrap();
    assert_eq!(result, Some(Value::from("hello")));
}

#[tokio::test]
#[ignore = "requires a docker daemon"]
async fn output_without_result_marker_yields_no_value() {
    let backend = DockerBackend;
    let ctx = create_test_context(docker_params("alpine", "echo plain output"), Vec::new());

    let result = backend.invoke(ctx).await.unwrap();
    assert_eq!(result, None);
}

#[tokio::test]
#[ignore = "requires a docker daemon"]
async fn only_the_first_result_line_is_used() {
    let backend = DockerBackend;
    let ctx = create_test_context(
        docker_params("alpine", "sh -c \"echo result:first; echo result:second\""),
        Vec::new(),
    );

    let result = backend.invoke(ctx).await.unwrap();
    assert_eq!(result, Some(Value::from("first")));
}

#[tokio::test]
#[ignore = "requires a docker daemon"]
async fn nonzero_exit_surfaces_as_execution_failure() {
    let backend = DockerBackend;
    let ctx = create_test_context(docker_params("alpine", "sh -c \"exit 3\""), Vec::new());

    assert!(matches!(
        backend.invoke(ctx).await,
        Err(BackendError::ExecutionFailed(_))
    ));
}

#[tokio::test]
#[ignore = "requires a docker daemon"]
async fn deployed_echo_process_succeeds_end_to_end() {
    use chaincore::ExecutionMode;
    use chainruntime::{
        DeploymentParameter, DeploymentRequest, ProcessDescription, ProcessingRuntime,
    };

    let mut backends = chainruntime::BackendRegistry::new();
    chainbackends::register_all(&mut backends);
    let runtime = ProcessingRuntime::new(Arc::new(backends));

    let process_id = runtime
        .deploy(DeploymentRequest {
            image: "alpine".to_string(),
            run_command: "echo result:$1".to_string(),
            process_description: Some(ProcessDescription {
                title: Some("Echo".to_string()),
                summary: None,
                inputs: vec![DeploymentParameter {
                    id: "msg".to_string(),
                    title: None,
                    summary: None,
                    min_occurs: 1,
                    max_occurs: 1,
                }],
                outputs: Vec::new(),
            }),
        })
        .await
        .unwrap();

    let mut inputs = HashMap::new();
    inputs.insert("msg".to_string(), Value::from("hello"));

    let handle = runtime
        .execute(&process_id, inputs, ExecutionMode::Sync)
        .await
        .unwrap();

    let result = handle.result().await.unwrap();
    assert_eq!(result, Some(Value::from("hello")));
    assert_eq!(handle.state(), chaincore::JobState::Succeeded);
}

#[tokio::test]
#[ignore = "requires a docker daemon"]
async fn cancellation_kills_the_container() {
    let backend = DockerBackend;
    let ctx = create_test_context(docker_params("alpine", "sleep 30"), Vec::new());
    let token = ctx.cancellation.clone();

    let invocation = tokio::spawn(async move { backend.invoke(ctx).await });

    tokio::time::sleep(std::time::Duration::from_millis(500)).await;
    token.cancel();

    let result = tokio::time::timeout(std::time::Duration::from_secs(5), invocation)
        .await
        .expect("cancellation must not hang")
        .unwrap();
    assert!(matches!(result, Err(BackendError::Cancelled)));
}
