//! Listener isolation and delivery guarantees.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use rstest::rstest;
use serde_json::json;

use workbench_core::{AppState, ProjectId};
use workbench_events::testing::RecordingListener;
use workbench_events::{
    listener_fn, AppStatusChanged, EventEmitter, EventKind, EventSink, ListenerError,
    NewProjectAdded, ProjectEvent,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}

fn app_started(project: &str) -> ProjectEvent {
    ProjectEvent::AppStatusChanged(AppStatusChanged {
        project_id: ProjectId::from(project),
        app_status: AppState::Started,
        app_error_status: None,
        detailed_app_status: None,
    })
}

#[test]
fn every_listener_receives_the_payload() {
    init_tracing();
    let emitter = EventEmitter::new();
    let ui = RecordingListener::new();
    let audit = RecordingListener::new();
    emitter.register_listener("ui", ui.clone());
    emitter.register_listener("audit", audit.clone());

    let report = emitter.emit(&app_started("p1"));

    assert_eq!(report.delivered, 2);
    for rec in [&ui, &audit] {
        assert_eq!(
            rec.received(),
            vec![(
                EventKind::AppStatusChanged,
                json!({"projectID": "p1", "appStatus": "started"})
            )]
        );
    }
}

#[rstest]
#[case::returns_error(false)]
#[case::panics(true)]
fn failing_listener_does_not_block_others(#[case] panic: bool) {
    init_tracing();
    let emitter = EventEmitter::new();
    let healthy = RecordingListener::new();
    emitter.register_listener(
        "broken",
        listener_fn(move |_, _| {
            if panic {
                panic!("listener blew up");
            }
            Err(ListenerError::Rejected("socket closed".to_string()))
        }),
    );
    emitter.register_listener("healthy", healthy.clone());

    let report = emitter.emit(&app_started("p1"));

    assert_eq!(report.delivered, 1);
    assert_eq!(report.failed, vec!["broken".to_string()]);
    assert_eq!(healthy.kinds(), vec![EventKind::AppStatusChanged]);

    // The broken listener stays registered and keeps being isolated.
    let report = emitter.emit(&app_started("p1"));
    assert_eq!(report.delivered, 1);
}

#[test]
fn removed_listener_stops_receiving() {
    let emitter = EventEmitter::new();
    let rec = RecordingListener::new();
    emitter.register_listener("ui", rec.clone());
    emitter.publish(app_started("p1"));

    assert!(emitter.remove_listener("ui"));
    assert!(!emitter.remove_listener("ui"));
    emitter.publish(app_started("p1"));

    assert_eq!(rec.received().len(), 1);
    assert!(emitter.listener_names().is_empty());
}

#[test]
fn events_reach_a_listener_in_emission_order() {
    let emitter = EventEmitter::new();
    let rec = RecordingListener::new();
    emitter.register_listener("ui", rec.clone());

    emitter.emit(&ProjectEvent::NewProjectAdded(NewProjectAdded {
        project_id: ProjectId::from("p1"),
        ignored_paths: vec!["*/node_modules*".to_string()],
    }));
    emitter.emit(&app_started("p1"));

    assert_eq!(
        rec.kinds(),
        vec![EventKind::NewProjectAdded, EventKind::AppStatusChanged]
    );
    assert_eq!(
        rec.of_kind(EventKind::NewProjectAdded)[0]["ignoredPaths"],
        json!(["*/node_modules*"])
    );
}

#[test]
fn clones_share_one_registry() {
    let emitter = EventEmitter::new();
    let other = emitter.clone();
    let count = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&count);
    other.register_listener(
        "counter",
        listener_fn(move |_, _| {
            c.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }),
    );

    emitter.emit(&app_started("p1"));
    assert_eq!(count.load(Ordering::SeqCst), 1);
}
