//! Action selection and subscription lifecycle through the controller handle.

mod common;

use common::{Harness, template_fixture};
use printpi_capture::{
    CaptureError, ControllerHandle, RecordingSink, SessionController, SessionOutcome,
    SessionResult,
};
use printpi_core::CaptureMode;
use printpi_hardware::AnySensorDriver;
use printpi_hardware::mock::{MockSensorHandle, SensorVerb};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn start(default_action: CaptureMode) -> (ControllerHandle, MockSensorHandle, TempDir) {
    let h = Harness::new();
    let context = h.context();
    let handle = SessionController::new(AnySensorDriver::Mock(h.sensor), context)
        .with_default_action(default_action)
        .start();
    (handle, h.script, h.dir)
}

#[tokio::test]
async fn test_select_action_last_write_wins() {
    let (handle, _script, _dir) = start(CaptureMode::Identification);

    assert_eq!(handle.current_action().await.unwrap(), CaptureMode::Identification);
    assert_eq!(handle.select_action(b"A").await.unwrap(), CaptureMode::Enrollment);
    assert_eq!(handle.select_action(b"B").await.unwrap(), CaptureMode::Identification);
    assert_eq!(handle.select_action(b"A").await.unwrap(), CaptureMode::Enrollment);
    assert_eq!(handle.current_action().await.unwrap(), CaptureMode::Enrollment);
}

#[tokio::test]
async fn test_invalid_action_keeps_selection() {
    let (handle, _script, _dir) = start(CaptureMode::Enrollment);

    for value in [b"Z".as_slice(), b"".as_slice(), b"a".as_slice()] {
        let err = handle.select_action(value).await.unwrap_err();
        assert!(matches!(
            err,
            CaptureError::Core(printpi_core::Error::InvalidActionCode(_))
        ));
    }
    assert_eq!(handle.current_action().await.unwrap(), CaptureMode::Enrollment);
}

#[tokio::test(start_paused = true)]
async fn test_subscribe_runs_selected_action() {
    let (handle, script, _dir) = start(CaptureMode::Enrollment);
    script.reply(SensorVerb::Identify, "SUCCESS ::3");
    handle.select_action(b"B").await.unwrap();

    let sink = RecordingSink::new();
    let ticket = handle.subscribe(Arc::new(sink.clone())).await.unwrap();
    assert_eq!(ticket.mode(), CaptureMode::Identification);

    let report = ticket.report().await.unwrap();
    assert_eq!(
        report.outcome,
        SessionOutcome::Succeeded(SessionResult::Identified { id: 3 })
    );
    assert_eq!(sink.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_mode_is_snapshotted_at_subscribe() {
    let (handle, script, _dir) = start(CaptureMode::Identification);

    let ticket = handle
        .subscribe(Arc::new(RecordingSink::new()))
        .await
        .unwrap();
    handle.select_action(b"A").await.unwrap();

    let report = ticket.report().await.unwrap();
    assert_eq!(report.mode, CaptureMode::Identification);
    assert_eq!(script.count(SensorVerb::Start), 0);
    assert_eq!(script.count(SensorVerb::Identify), 1);
}

#[tokio::test(start_paused = true)]
async fn test_unsubscribe_cancels_and_closes_once() {
    let (handle, script, _dir) = start(CaptureMode::Enrollment);
    let sink = RecordingSink::new();
    let ticket = handle.subscribe(Arc::new(sink.clone())).await.unwrap();

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(handle.unsubscribe().await.unwrap());
    assert!(!handle.unsubscribe().await.unwrap());

    let report = ticket.report().await.unwrap();
    assert_eq!(report.outcome, SessionOutcome::Cancelled);
    assert_eq!(script.count(SensorVerb::Close), 1);
    assert_eq!(script.count(SensorVerb::Step), 0);
    assert_eq!(sink.messages(), vec!["CAPTURE CANCELLED".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_unsubscribe_after_terminal_state_is_noop() {
    let (handle, script, _dir) = start(CaptureMode::Identification);
    let sink = RecordingSink::new();
    let ticket = handle.subscribe(Arc::new(sink.clone())).await.unwrap();
    let report = ticket.report().await.unwrap();
    assert!(report.final_state().is_terminal());
    let messages = sink.messages();

    assert!(!handle.unsubscribe().await.unwrap());
    assert_eq!(script.count(SensorVerb::Close), 0);
    assert_eq!(sink.messages(), messages);
}

#[tokio::test(start_paused = true)]
async fn test_unsubscribe_without_session() {
    let (handle, script, _dir) = start(CaptureMode::Identification);

    assert!(!handle.unsubscribe().await.unwrap());
    assert!(script.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_subscribe_preempts_running_session() {
    let (handle, script, _dir) = start(CaptureMode::Enrollment);
    let first_sink = RecordingSink::new();
    let first = handle
        .subscribe(Arc::new(first_sink.clone()))
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_secs(1)).await;
    handle.select_action(b"B").await.unwrap();
    let second_sink = RecordingSink::new();
    let second = handle
        .subscribe(Arc::new(second_sink.clone()))
        .await
        .unwrap();

    assert_eq!(first.report().await.unwrap().outcome, SessionOutcome::Cancelled);
    assert!(matches!(
        second.report().await.unwrap().outcome,
        SessionOutcome::Succeeded(SessionResult::Identified { .. })
    ));

    assert_eq!(
        script.verbs(),
        vec![
            SensorVerb::Open,
            SensorVerb::Finger,
            SensorVerb::Close,
            SensorVerb::Open,
            SensorVerb::Finger,
            SensorVerb::Identify,
        ]
    );
    assert_eq!(first_sink.messages(), vec!["CAPTURE CANCELLED".to_string()]);
    assert_eq!(second_sink.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_sequential_enrollments_reuse_driver() {
    let (handle, script, dir) = start(CaptureMode::Enrollment);
    let template = template_fixture(25);

    for _ in 0..2 {
        script.produce_template(dir.path().join("tpl.bin"), template.clone());
        let sink = RecordingSink::new();
        let ticket = handle.subscribe(Arc::new(sink.clone())).await.unwrap();
        let report = ticket.report().await.unwrap();

        assert!(matches!(
            report.outcome,
            SessionOutcome::Succeeded(SessionResult::Enrolled { bytes: 25, chunks: 2, .. })
        ));
    }
    assert_eq!(script.count(SensorVerb::Step), 6);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_cancels_and_returns_driver() {
    let (handle, script, _dir) = start(CaptureMode::Enrollment);
    let ticket = handle
        .subscribe(Arc::new(RecordingSink::new()))
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_secs(1)).await;
    let driver = handle.shutdown().await.unwrap();

    assert_eq!(driver.map(|d| d.kind()), Some("mock"));
    assert_eq!(script.count(SensorVerb::Close), 1);
    assert_eq!(ticket.report().await.unwrap().outcome, SessionOutcome::Cancelled);
    assert!(matches!(
        handle.current_action().await,
        Err(CaptureError::ControllerStopped)
    ));
}
