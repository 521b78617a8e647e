//! In-process tests for the helper routes.

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use inventory_helper::config::Config;
use inventory_helper::devices::{parse_device_list, DeviceRegistry};
use inventory_helper::{app, AppState};
use serde_json::Value;
use tower::ServiceExt;

fn test_state() -> AppState {
    let devices = DeviceRegistry::new(parse_device_list(
        "tv|Living Room|http://tv.local/play;radio||http://radio.local/play",
    ));
    AppState::new(Config::default(), devices)
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_healthz() {
    let (status, body) = get(app(test_state()), "/healthz").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, serde_json::json!({ "ok": true }));
}

#[tokio::test]
async fn test_health_reports_version() {
    let (status, body) = get(app(test_state()), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_devices_listing() {
    let (status, body) = get(app(test_state()), "/devices").await;
    assert_eq!(status, StatusCode::OK);
    let devices = body.as_array().unwrap();
    assert_eq!(devices.len(), 2);
    assert_eq!(devices[0]["id"], "tv");
    assert_eq!(devices[0]["playUrl"], "http://tv.local/play");
    assert_eq!(devices[1]["name"], "DLNA radio");
}

#[tokio::test]
async fn test_play_queues_request() {
    let state = test_state();
    let (status, body) = get(
        app(state.clone()),
        "/play?deviceId=tv&target=http%3A%2F%2Ffiles%2Fmovie.mkv&name=Movie",
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["ok"], true);
    assert_eq!(body["device"], "tv");
    assert_eq!(body["queued"], "Movie");

    let request_id = body["requestId"].as_str().unwrap();
    let queued = state.playback.get(request_id).unwrap();
    assert_eq!(queued.target, "http://files/movie.mkv");

    let (status, body) = get(app(state), "/playback").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["id"], request_id);
}

#[tokio::test]
async fn test_play_name_defaults_to_target() {
    let (status, body) = get(app(test_state()), "/play?deviceId=radio&target=song.mp3").await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["queued"], "song.mp3");
}

#[tokio::test]
async fn test_play_missing_parameters() {
    let state = test_state();
    for uri in ["/play", "/play?deviceId=tv", "/play?target=x", "/play?deviceId=&target=x"] {
        let (status, body) = get(app(state.clone()), uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
        assert_eq!(body["ok"], false);
        assert!(body["error"].is_string());
    }
    assert!(state.playback.is_empty());
}

#[tokio::test]
async fn test_play_unknown_device() {
    let state = test_state();
    let (status, body) = get(app(state.clone()), "/play?deviceId=nope&target=x").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["ok"], false);
    assert!(state.playback.is_empty());
}

#[tokio::test]
async fn test_unknown_route() {
    let (status, body) = get(app(test_state()), "/nowhere").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["ok"], false);
}

#[tokio::test]
async fn test_cors_preflight() {
    let response = app(test_state())
        .oneshot(
            Request::builder()
                .method(Method::OPTIONS)
                .uri("/devices")
                .header(header::ORIGIN, "http://example.com")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert!(response.status().is_success());
    let headers = response.headers();
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    let methods = headers[header::ACCESS_CONTROL_ALLOW_METHODS].to_str().unwrap();
    assert!(methods.contains("GET"));
}
