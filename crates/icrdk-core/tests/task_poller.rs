//! Task poller behaviour: retry on STARTED only, bounded by policy.

mod support;

use std::time::Duration;

use icrdk_core::DeployError;
use icrdk_core::progress::{NoProgress, ProgressEvent};
use icrdk_core::task::{PollPolicy, TaskHandle, TaskPoller, TaskState};
use icrdk_core::transport::{ApiClient, Method};
use tokio_util::sync::CancellationToken;

use support::{RecordingProgress, ScriptedTransport};

fn handle() -> TaskHandle {
    TaskHandle {
        id: "t-1".to_string(),
        poll_path: "/mgmt/shared/iapp/package-management-tasks/t-1".to_string(),
    }
}

fn policy(interval: Duration) -> PollPolicy {
    PollPolicy {
        interval,
        deadline: None,
    }
}

#[tokio::test(start_paused = true)]
async fn polls_until_finished_with_fixed_spacing() {
    let transport = ScriptedTransport::new()
        .task_status("STARTED")
        .task_status("STARTED")
        .task_status("STARTED")
        .task_status("FINISHED");

    let status = TaskPoller::new(PollPolicy::default())
        .poll(&ApiClient::new(&transport), &handle(), &NoProgress, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(status.state, TaskState::Finished);

    let recorded = transport.recorded();
    assert_eq!(recorded.len(), 4);
    for pair in recorded.windows(2) {
        assert!(pair[1].at.duration_since(pair[0].at) >= Duration::from_secs(2));
    }
    for entry in &recorded {
        assert_eq!(entry.request.method, Method::GET);
        assert_eq!(entry.request.path, handle().poll_path);
    }
}

#[tokio::test(start_paused = true)]
async fn failed_status_is_returned_as_data() {
    let transport = ScriptedTransport::new()
        .task_status("STARTED")
        .task_failed("Package f5-ext is already installed");

    let status = TaskPoller::new(policy(Duration::from_millis(500)))
        .poll(&ApiClient::new(&transport), &handle(), &NoProgress, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(status.state, TaskState::Failed);
    assert_eq!(
        status.error_message.as_deref(),
        Some("Package f5-ext is already installed")
    );
}

#[tokio::test(start_paused = true)]
async fn unknown_status_is_terminal() {
    let transport = ScriptedTransport::new().task_status("CANCELED").task_status("FINISHED");

    let status = TaskPoller::default()
        .poll(&ApiClient::new(&transport), &handle(), &NoProgress, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(status.state, TaskState::Other("CANCELED".to_string()));
    assert_eq!(transport.request_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn http_error_aborts_polling() {
    let transport = ScriptedTransport::new()
        .task_status("STARTED")
        .respond(503, "service unavailable")
        .task_status("FINISHED");

    let err = TaskPoller::default()
        .poll(&ApiClient::new(&transport), &handle(), &NoProgress, &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err.http_status(), Some(503));
    assert_eq!(transport.request_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn transport_error_is_not_retried() {
    let transport = ScriptedTransport::new().fail("tls handshake failed").task_status("FINISHED");

    let err = TaskPoller::default()
        .poll(&ApiClient::new(&transport), &handle(), &NoProgress, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(err.is_transport());
    assert_eq!(transport.request_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn deadline_stops_a_task_that_never_settles() {
    let transport = (0..10).fold(ScriptedTransport::new(), |t, _| t.task_status("STARTED"));

    let err = TaskPoller::new(PollPolicy {
        interval: Duration::from_secs(2),
        deadline: Some(Duration::from_secs(5)),
    })
    .poll(&ApiClient::new(&transport), &handle(), &NoProgress, &CancellationToken::new())
    .await
    .unwrap_err();

    assert!(matches!(err, DeployError::DeadlineExceeded(d) if d == Duration::from_secs(5)));
    // polls at t=0, 2 and 4; a fourth at t=6 would overrun
    assert_eq!(transport.request_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn cancellation_interrupts_the_wait() {
    let transport = (0..10).fold(ScriptedTransport::new(), |t, _| t.task_status("STARTED"));
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(3)).await;
        trigger.cancel();
    });

    let err = TaskPoller::default()
        .poll(&ApiClient::new(&transport), &handle(), &NoProgress, &cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, DeployError::Cancelled));
    assert_eq!(transport.request_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn reports_each_pending_poll() {
    let transport = ScriptedTransport::new()
        .task_status("STARTED")
        .task_status("STARTED")
        .task_status("FINISHED");
    let progress = RecordingProgress::default();

    TaskPoller::default()
        .poll(&ApiClient::new(&transport), &handle(), &progress, &CancellationToken::new())
        .await
        .unwrap();

    let events = progress.events();
    assert_eq!(events.len(), 3);
    assert!(matches!(&events[0], ProgressEvent::TaskPolled { attempt: 1, .. }));
    assert!(matches!(&events[1], ProgressEvent::TaskPolled { attempt: 2, .. }));
    assert!(matches!(
        &events[2],
        ProgressEvent::TaskFinished { state: TaskState::Finished, .. }
    ));
}
