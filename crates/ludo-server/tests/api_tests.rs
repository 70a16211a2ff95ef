//! Integration tests for the room lifecycle endpoints.
//!
//! Tests use Axum's `Router` directly via `tower::ServiceExt` without
//! starting a TCP server. Room state is inspected through the shared
//! [`AppState`] the router was built with.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use ludo_server::{AppState, build_router};
use ludo_types::{ClientAction, PlayerId, RoomId};
use serde_json::Value;
use tower::ServiceExt;

async fn body_to_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn send(state: &Arc<AppState>, method: &str, uri: &str) -> (StatusCode, Value) {
    let app = build_router(Arc::clone(state));
    let response = app
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    (status, body_to_json(response).await)
}

async fn create(state: &Arc<AppState>, name: &str) -> (String, String) {
    let (status, json) = send(state, "POST", &format!("/create-room?player_name={name}")).await;
    assert_eq!(status, StatusCode::OK);
    (
        json["room_id"].as_str().unwrap().to_owned(),
        json["player_id"].as_str().unwrap().to_owned(),
    )
}

// =========================================================================
// GET / and GET /health
// =========================================================================

#[tokio::test]
async fn index_returns_banner() {
    let state = Arc::new(AppState::default());
    let app = build_router(state);
    let response = app
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("Ludo game server is running"));
}

#[tokio::test]
async fn health_counts_rooms() {
    let state = Arc::new(AppState::default());
    let (status, json) = send(&state, "GET", "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["rooms"], 0);

    create(&state, "Ana").await;
    let (_, json) = send(&state, "GET", "/health").await;
    assert_eq!(json["rooms"], 1);
}

// =========================================================================
// POST /create-room
// =========================================================================

#[tokio::test]
async fn create_room_seats_creator_as_red() {
    let state = Arc::new(AppState::default());
    let (status, json) = send(&state, "POST", "/create-room?player_name=Ana").await;
    assert_eq!(status, StatusCode::OK);

    let room_id = json["room_id"].as_str().unwrap();
    assert_eq!(room_id.len(), 8);
    assert!(room_id.chars().all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
    assert!(json["message"].as_str().unwrap().contains(room_id));

    let (status, json) = send(&state, "GET", &format!("/room/{room_id}")).await;
    assert_eq!(status, StatusCode::OK);
    let room = &json["room"];
    assert_eq!(room["phase"], "waiting");
    assert_eq!(room["players"][0]["name"], "Ana");
    assert_eq!(room["players"][0]["color"], "red");
    assert_eq!(room["players"][0]["pieces"].as_array().unwrap().len(), 4);
    assert_eq!(room["players"][0]["pieces"][0]["track_index"], 0);
}

#[tokio::test]
async fn create_room_rejects_blank_name() {
    let state = Arc::new(AppState::default());
    let (status, json) = send(&state, "POST", "/create-room?player_name=%20%20").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["status"], 400);
    assert!(json["error"].is_string());

    let (status, _) = send(&state, "POST", "/create-room").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn get_requests_to_create_room_are_not_allowed() {
    let state = Arc::new(AppState::default());
    let app = build_router(state);
    let response = app
        .oneshot(
            Request::get("/create-room?player_name=Ana")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

// =========================================================================
// POST /join-room
// =========================================================================

#[tokio::test]
async fn join_room_assigns_next_color_case_insensitively() {
    let state = Arc::new(AppState::default());
    let (room_id, host_id) = create(&state, "Ana").await;

    let lower = room_id.to_ascii_lowercase();
    let (status, json) = send(
        &state,
        "POST",
        &format!("/join-room?room_id={lower}&player_name=Ben"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["room_id"], room_id.as_str());
    assert_ne!(json["player_id"], host_id.as_str());

    let (_, json) = send(&state, "GET", &format!("/room/{room_id}")).await;
    assert_eq!(json["room"]["players"][1]["name"], "Ben");
    assert_eq!(json["room"]["players"][1]["color"], "blue");
}

#[tokio::test]
async fn join_unknown_room_is_not_found() {
    let state = Arc::new(AppState::default());
    let (status, json) = send(&state, "POST", "/join-room?room_id=ABCD1234&player_name=Ben").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["status"], 404);
}

#[tokio::test]
async fn join_with_malformed_code_is_bad_request() {
    let state = Arc::new(AppState::default());
    let (status, _) = send(&state, "POST", "/join-room?room_id=AB-CD&player_name=Ben").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn join_full_room_is_bad_request() {
    let state = Arc::new(AppState::default());
    let (room_id, _) = create(&state, "Ana").await;
    for name in ["Ben", "Cy", "Di"] {
        let (status, _) = send(
            &state,
            "POST",
            &format!("/join-room?room_id={room_id}&player_name={name}"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, json) = send(
        &state,
        "POST",
        &format!("/join-room?room_id={room_id}&player_name=Eve"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("full"));
}

#[tokio::test]
async fn join_after_start_is_conflict() {
    let state = Arc::new(AppState::default());
    let (room_id, _) = create(&state, "Ana").await;
    send(
        &state,
        "POST",
        &format!("/join-room?room_id={room_id}&player_name=Ben"),
    )
    .await;

    let id = RoomId::parse(&room_id).unwrap();
    state
        .coordinator
        .handle(&id, ClientAction::StartGame)
        .await
        .unwrap();

    let (status, json) = send(
        &state,
        "POST",
        &format!("/join-room?room_id={room_id}&player_name=Cy"),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["status"], 409);

    let (_, json) = send(&state, "GET", &format!("/room/{room_id}")).await;
    assert_eq!(json["room"]["phase"], "playing");
    assert_eq!(json["room"]["players"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn join_is_pushed_to_connected_viewers() {
    let state = Arc::new(AppState::default());
    let (room_id, _) = create(&state, "Ana").await;
    let id = RoomId::parse(&room_id).unwrap();

    let (tx, mut rx) = tokio::sync::mpsc::channel(8);
    state.coordinator.connect(&id, tx).await.unwrap();
    let snapshot: Value = serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
    assert_eq!(snapshot["type"], "room_update");

    let (_, json) = send(
        &state,
        "POST",
        &format!("/join-room?room_id={room_id}&player_name=Ben"),
    )
    .await;
    let joined: PlayerId = serde_json::from_value(json["player_id"].clone()).unwrap();

    let update: Value = serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
    assert_eq!(update["type"], "room_update");
    assert_eq!(update["room"]["players"][1]["id"], joined.to_string());
}

// =========================================================================
// GET /room/{room_id} and GET /ws/{room_id}
// =========================================================================

#[tokio::test]
async fn get_unknown_room_is_not_found() {
    let state = Arc::new(AppState::default());
    let (status, json) = send(&state, "GET", "/room/ZZZZ0000").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(json["error"].as_str().unwrap().contains("ZZZZ0000"));
}

#[tokio::test]
async fn websocket_to_unknown_room_is_refused_before_upgrade() {
    let state = Arc::new(AppState::default());
    let (status, json) = send(&state, "GET", "/ws/ZZZZ0000").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["status"], 404);
}
