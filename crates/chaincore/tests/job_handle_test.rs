use chaincore::{
    BackendError, ExecutionMode, JobController, JobError, JobOutcome, JobState, Value,
};
use std::time::Duration;
use uuid::Uuid;

fn new_job(mode: ExecutionMode) -> (JobController, chaincore::JobHandle) {
    JobController::new(Uuid::new_v4(), "docker.run-test", mode)
}

#[tokio::test]
async fn job_starts_accepted() {
    let (_controller, handle) = new_job(ExecutionMode::Async);
    assert_eq!(handle.state(), JobState::Accepted);
    assert!(!handle.state().is_terminal());
}

#[tokio::test]
async fn status_is_only_reported_for_asynchronous_jobs() {
    let (_controller, handle) = new_job(ExecutionMode::Async);
    assert_eq!(handle.request_status(), Some(JobState::Accepted));

    let (_controller, handle) = new_job(ExecutionMode::Sync);
    assert!(!handle.is_asynchronous());
    assert_eq!(handle.request_status(), None);
}

#[tokio::test]
async fn try_result_is_empty_until_terminal_then_stable() {
    let (controller, handle) = new_job(ExecutionMode::Async);

    assert!(handle.try_result().is_none());
    controller.mark_running();
    assert!(handle.try_result().is_none());

    controller.complete(JobOutcome::Succeeded(Some(Value::from("42"))));

    for _ in 0..3 {
        match handle.try_result() {
            Some(Ok(Some(Value::String(s)))) => assert_eq!(s, "42"),
            other => panic!("expected stable result, got {:?}", other),
        }
    }
}

#[tokio::test]
async fn zero_timeout_never_blocks() {
    let (controller, handle) = new_job(ExecutionMode::Async);

    assert!(handle.result_timeout(Duration::ZERO).await.is_none());

    controller.complete(JobOutcome::Succeeded(None));
    let result = handle.result_timeout(Duration::ZERO).await;
    assert!(matches!(result, Some(Ok(None))));
}

#[tokio::test]
async fn bounded_wait_returns_empty_on_deadline() {
    let (_controller, handle) = new_job(ExecutionMode::Async);
    let result = handle.result_timeout(Duration::from_millis(20)).await;
    assert!(result.is_none());
}

#[tokio::test]
async fn blocking_result_waits_for_completion() {
    let (controller, handle) = new_job(ExecutionMode::Sync);

    tokio::spawn(async move {
        controller.mark_running();
        tokio::time::sleep(Duration::from_millis(10)).await;
        controller.complete(JobOutcome::Succeeded(Some(Value::from("done"))));
    });

    let result = handle.result().await.unwrap();
    assert_eq!(result, Some(Value::from("done")));
    assert_eq!(handle.state(), JobState::Succeeded);
}

#[tokio::test]
async fn failure_is_surfaced_to_every_waiter() {
    let (controller, handle) = new_job(ExecutionMode::Async);
    let second = handle.clone();

    controller.complete(JobOutcome::Failed(BackendError::ExecutionFailed(
        "exit status 1".to_string(),
    )));

    for h in [handle, second] {
        match h.result().await {
            Err(JobError::Failed(BackendError::ExecutionFailed(msg))) => {
                assert_eq!(msg, "exit status 1");
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }
}

#[tokio::test]
async fn dismiss_cancels_a_running_job() {
    let (controller, handle) = new_job(ExecutionMode::Async);
    let token = controller.cancellation();

    tokio::spawn(async move {
        controller.mark_running();
        token.cancelled().await;
        controller.complete(JobOutcome::Dismissed);
    });

    // Let the spawned task reach Running before dismissing.
    tokio::time::sleep(Duration::from_millis(5)).await;

    let state = handle.dismiss().await;
    assert_eq!(state, JobState::Dismissed);
    assert!(matches!(handle.result().await, Err(JobError::Dismissed)));
}

#[tokio::test]
async fn dismiss_on_terminal_job_is_a_noop() {
    let (controller, handle) = new_job(ExecutionMode::Async);
    controller.complete(JobOutcome::Succeeded(None));

    assert_eq!(handle.dismiss().await, JobState::Succeeded);
    assert!(matches!(handle.result().await, Ok(None)));
}

#[tokio::test]
async fn abandoned_job_does_not_hang_waiters() {
    let (controller, handle) = new_job(ExecutionMode::Async);
    drop(controller);

    match handle.result().await {
        Err(JobError::Abandoned) => {}
        other => panic!("expected abandoned job error, got {:?}", other),
    }
}
