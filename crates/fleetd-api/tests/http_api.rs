//! Handler-level tests over a real temp-backed store.

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::Json;
use serde_json::json;

use fleetd_api::handlers::admin::{self, DeviceListFilter};
use fleetd_api::handlers::device;
use fleetd_api::models::{
    CreateNoteRequest, EnqueueCommandRequest, HeartbeatRequest, PollRequest, PollResultEntry,
    RegisterRequest, SetStatusRequest,
};
use fleetd_api::server::{ServerState, check_admin_auth};
use fleetd_storage::FleetStore;

const SECRET: &str = "device-secret-123";
const ADMIN_TOKEN: &str = "test-admin-token";

fn test_state() -> (tempfile::TempDir, ServerState) {
    let dir = tempfile::tempdir().unwrap();
    let store = FleetStore::open(dir.path().join("fleet.redb")).unwrap();
    let state = ServerState::with_store(store, Some(ADMIN_TOKEN.to_string()), 8, 20);
    (dir, state)
}

fn register_req(device_id: &str) -> RegisterRequest {
    RegisterRequest {
        device_id: device_id.to_string(),
        secret: SECRET.to_string(),
        name: format!("Device {}", device_id),
        platform: Some("linux".to_string()),
        app_version: Some("1.2.3".to_string()),
    }
}

async fn register(state: &ServerState, device_id: &str) {
    device::register_handler(State(state.clone()), Json(register_req(device_id)))
        .await
        .unwrap();
}

fn poll_req(device_id: &str, max_count: usize, results: Vec<PollResultEntry>) -> PollRequest {
    PollRequest {
        device_id: device_id.to_string(),
        secret: SECRET.to_string(),
        max_count: Some(max_count),
        results,
    }
}

#[tokio::test]
async fn register_claims_then_verifies() {
    let (_dir, state) = test_state();

    let Json(first) = device::register_handler(State(state.clone()), Json(register_req("dev-1")))
        .await
        .unwrap();
    assert!(first.claimed);

    let Json(second) = device::register_handler(State(state.clone()), Json(register_req("dev-1")))
        .await
        .unwrap();
    assert!(!second.claimed);

    let mut bad = register_req("dev-1");
    bad.secret = "a-different-secret".to_string();
    let err = device::register_handler(State(state), Json(bad))
        .await
        .unwrap_err();
    assert_eq!(err.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn register_rejects_missing_fields() {
    let (_dir, state) = test_state();

    let mut req = register_req("dev-1");
    req.name = String::new();
    let err = device::register_handler(State(state), Json(req))
        .await
        .unwrap_err();
    assert_eq!(err.status, StatusCode::BAD_REQUEST);
    assert_eq!(err.code, "INVALID_ARGUMENT");
}

#[tokio::test]
async fn heartbeat_requires_known_device() {
    let (_dir, state) = test_state();

    let err = device::heartbeat_handler(
        State(state.clone()),
        Json(HeartbeatRequest {
            device_id: "ghost".to_string(),
            secret: SECRET.to_string(),
            ip: None,
        }),
    )
    .await
    .unwrap_err();
    assert_eq!(err.status, StatusCode::UNAUTHORIZED);

    register(&state, "dev-1").await;
    let Json(resp) = device::heartbeat_handler(
        State(state),
        Json(HeartbeatRequest {
            device_id: "dev-1".to_string(),
            secret: SECRET.to_string(),
            ip: Some("10.0.0.7".to_string()),
        }),
    )
    .await
    .unwrap();
    assert_eq!(resp.status, "active");
}

#[tokio::test]
async fn enqueue_poll_report_roundtrip() {
    let (_dir, state) = test_state();
    register(&state, "dev-1").await;

    let Json(enqueued) = admin::enqueue_command_handler(
        State(state.clone()),
        Path("dev-1".to_string()),
        Json(EnqueueCommandRequest {
            kind: "ping".to_string(),
            payload: Some(json!({"timeout": 5})),
        }),
    )
    .await
    .unwrap();
    assert_eq!(enqueued.status, "queued");

    let Json(delivered) =
        device::poll_handler(State(state.clone()), Json(poll_req("dev-1", 5, vec![])))
            .await
            .unwrap();
    assert_eq!(delivered.commands.len(), 1);
    assert_eq!(delivered.commands[0].kind, "ping");
    assert_eq!(delivered.commands[0].payload["timeout"], 5);

    // Report success; nothing further is delivered.
    let Json(after) = device::poll_handler(
        State(state.clone()),
        Json(poll_req(
            "dev-1",
            5,
            vec![PollResultEntry {
                id: delivered.commands[0].id.clone(),
                succeeded: true,
                error: None,
            }],
        )),
    )
    .await
    .unwrap();
    assert!(after.commands.is_empty());

    let Json(history) =
        admin::list_commands_handler(State(state), Path("dev-1".to_string()))
            .await
            .unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].status, "done");
    assert!(history[0].done_at.is_some());
}

#[tokio::test]
async fn enqueue_for_unknown_device_is_404() {
    let (_dir, state) = test_state();

    let err = admin::enqueue_command_handler(
        State(state),
        Path("ghost".to_string()),
        Json(EnqueueCommandRequest {
            kind: "ping".to_string(),
            payload: None,
        }),
    )
    .await
    .unwrap_err();
    assert_eq!(err.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn device_list_filters_and_paginates() {
    let (_dir, state) = test_state();
    register(&state, "alpha-1").await;
    register(&state, "alpha-2").await;
    register(&state, "beta-1").await;

    let filter = |query: Option<&str>, status: Option<&str>, page_size: usize| DeviceListFilter {
        query: query.map(str::to_string),
        status: status.map(str::to_string),
        page: 1,
        page_size,
    };

    let Json(all) = admin::list_devices_handler(State(state.clone()), Query(filter(None, None, 20)))
        .await
        .unwrap();
    assert_eq!(all.total, 3);

    let Json(alphas) =
        admin::list_devices_handler(State(state.clone()), Query(filter(Some("alpha"), None, 20)))
            .await
            .unwrap();
    assert_eq!(alphas.total, 2);

    let Json(first_page) =
        admin::list_devices_handler(State(state.clone()), Query(filter(None, None, 2)))
            .await
            .unwrap();
    assert_eq!(first_page.devices.len(), 2);
    assert_eq!(first_page.total, 3);

    let err = admin::list_devices_handler(
        State(state),
        Query(filter(None, Some("bogus"), 20)),
    )
    .await
    .unwrap_err();
    assert_eq!(err.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn status_changes_are_validated_and_audited() {
    let (_dir, state) = test_state();
    register(&state, "dev-1").await;

    let err = admin::set_status_handler(
        State(state.clone()),
        Path("dev-1".to_string()),
        Json(SetStatusRequest {
            status: "broken".to_string(),
        }),
    )
    .await
    .unwrap_err();
    assert_eq!(err.status, StatusCode::BAD_REQUEST);

    let Json(updated) = admin::set_status_handler(
        State(state.clone()),
        Path("dev-1".to_string()),
        Json(SetStatusRequest {
            status: "disabled".to_string(),
        }),
    )
    .await
    .unwrap();
    assert_eq!(updated.status, "disabled");

    let Json(events) =
        admin::list_events_handler(State(state), Path("dev-1".to_string()))
            .await
            .unwrap();
    assert_eq!(events[0].kind, "status_changed");
}

#[tokio::test]
async fn notes_roundtrip() {
    let (_dir, state) = test_state();
    register(&state, "dev-1").await;

    admin::create_note_handler(
        State(state.clone()),
        Path("dev-1".to_string()),
        Json(CreateNoteRequest {
            author: "ops".to_string(),
            text: "replaced power supply".to_string(),
        }),
    )
    .await
    .unwrap();

    let Json(notes) = admin::list_notes_handler(State(state), Path("dev-1".to_string()))
        .await
        .unwrap();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].author, "ops");
}

#[test]
fn admin_auth_checks_bearer_token() {
    let dir = tempfile::tempdir().unwrap();
    let store = FleetStore::open(dir.path().join("fleet.redb")).unwrap();

    let open = ServerState::with_store(store.clone(), None, 8, 20);
    let err = check_admin_auth(&open, &HeaderMap::new()).unwrap_err();
    assert_eq!(err.status, StatusCode::SERVICE_UNAVAILABLE);

    let guarded = ServerState::with_store(store, Some(ADMIN_TOKEN.to_string()), 8, 20);
    assert_eq!(
        check_admin_auth(&guarded, &HeaderMap::new())
            .unwrap_err()
            .status,
        StatusCode::UNAUTHORIZED
    );

    let mut wrong = HeaderMap::new();
    wrong.insert("authorization", HeaderValue::from_static("Bearer nope"));
    assert_eq!(
        check_admin_auth(&guarded, &wrong).unwrap_err().status,
        StatusCode::UNAUTHORIZED
    );

    let mut good = HeaderMap::new();
    good.insert(
        "authorization",
        HeaderValue::from_static("Bearer test-admin-token"),
    );
    assert!(check_admin_auth(&guarded, &good).is_ok());
}
