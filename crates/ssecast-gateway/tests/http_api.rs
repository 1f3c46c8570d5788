#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use futures_util::StreamExt;
use serde_json::{json, Value};
use tokio::time::{sleep, timeout, Duration};
use tower::ServiceExt;

use ssecast_gateway::{app_state::AppState, config, router};

fn state() -> AppState {
    let cfg = config::load_from_str("version: 1\ngateway:\n  keep_alive_ms: 0\n").unwrap();
    AppState::new(cfg).unwrap()
}

fn app() -> Router {
    router::build_router(state())
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

fn send(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(resp: axum::response::Response) -> Value {
    let bytes = to_bytes(resp.into_body(), 64 * 1024).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn stream_receives_group_events() {
    let app = app();

    let resp = app.clone().oneshot(get("/v1/stream/a")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[header::CONTENT_TYPE], "text/event-stream");
    assert_eq!(resp.headers()[header::CACHE_CONTROL], "no-cache");
    assert_eq!(resp.headers()[header::CONNECTION], "keep-alive");
    let mut body = resp.into_body().into_data_stream();

    let _b = app.clone().oneshot(get("/v1/stream/b")).await.unwrap();

    let resp = app
        .clone()
        .oneshot(send(Method::PUT, "/v1/groups/vip/members/a", Value::Null))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = app
        .clone()
        .oneshot(send(
            Method::POST,
            "/v1/groups/vip/events",
            json!({ "event": "promo", "id": "7", "data": "hello" }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await, json!({ "delivered": 1, "failed": [] }));

    let frame = body.next().await.unwrap().unwrap();
    assert_eq!(&frame[..], b"event: promo\nid: 7\ndata: hello\n\n");

    let resp = app.clone().oneshot(get("/v1/clients")).await.unwrap();
    assert_eq!(json_body(resp).await, json!({ "count": 2, "clients": ["a", "b"] }));
}

#[tokio::test]
async fn duplicate_stream_is_a_conflict() {
    let app = app();
    let _first = app.clone().oneshot(get("/v1/stream/a")).await.unwrap();
    let resp = app.clone().oneshot(get("/v1/stream/a")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    assert_eq!(json_body(resp).await["code"], "CONFLICT");
}

#[tokio::test]
async fn send_to_unknown_client_is_not_found() {
    let resp = app()
        .oneshot(send(Method::POST, "/v1/clients/ghost/events", json!({ "data": "x" })))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(resp).await["code"], "UNKNOWN_RECIPIENT");
}

#[tokio::test]
async fn json_data_is_sent_compact() {
    let app = app();
    let resp = app.clone().oneshot(get("/v1/stream/a")).await.unwrap();
    let mut body = resp.into_body().into_data_stream();

    let resp = app
        .clone()
        .oneshot(send(Method::POST, "/v1/broadcast", json!({ "data": { "n": 1 } })))
        .await
        .unwrap();
    assert_eq!(json_body(resp).await["delivered"], 1);

    let frame = body.next().await.unwrap().unwrap();
    assert_eq!(&frame[..], b"data: {\"n\":1}\n\n");
}

#[tokio::test]
async fn dropped_stream_leaves_the_registry() {
    let app = app();
    let resp = app.clone().oneshot(get("/v1/stream/a")).await.unwrap();
    drop(resp);

    // the stream task notices the closed body and unregisters
    let mut count = Value::Null;
    for _ in 0..50 {
        let resp = app.clone().oneshot(get("/v1/clients")).await.unwrap();
        count = json_body(resp).await["count"].clone();
        if count == 0 {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    assert_eq!(count, 0);

    let resp = app.clone().oneshot(get("/v1/groups/*")).await.unwrap();
    assert_eq!(json_body(resp).await, json!({ "group": "*", "members": [] }));
}

#[tokio::test]
async fn reserved_group_and_missing_membership() {
    let app = app();
    let _a = app.clone().oneshot(get("/v1/stream/a")).await.unwrap();

    let resp = app
        .clone()
        .oneshot(send(Method::PUT, "/v1/groups/*/members/a", Value::Null))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = app
        .clone()
        .oneshot(send(Method::DELETE, "/v1/groups/vip/members/a", Value::Null))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test(start_paused = true)]
async fn clock_stream_ticks_until_the_body_is_dropped() {
    let state = state();
    let app = router::build_router(state.clone());

    let resp = app.oneshot(get("/v1/clock")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[header::CONTENT_TYPE], "text/event-stream");
    assert_eq!(resp.headers()[header::CACHE_CONTROL], "no-cache");
    assert_eq!(state.clock_streams(), 1);

    let mut body = resp.into_body().into_data_stream();
    for _ in 0..3 {
        let frame = body.next().await.unwrap().unwrap();
        let text = std::str::from_utf8(&frame).unwrap();
        let secs = text
            .strip_prefix("data: ")
            .and_then(|t| t.strip_suffix("\n\n"))
            .unwrap_or_else(|| panic!("unexpected frame {text:?}"));
        secs.parse::<u64>().unwrap();
    }

    drop(body);
    timeout(Duration::from_secs(5), async {
        while state.clock_streams() > 0 {
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("ticker and stream loop must both end");
    assert_eq!(state.broker().client_count().await.unwrap(), 0);
}
