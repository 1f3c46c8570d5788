//! Axum router wiring.
//!
//! `/v1/stream/:client_id` is the broker-backed event stream; the rest is
//! the publish/membership API and the single-client clock stream.

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::{app_state::AppState, transport};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/v1/stream/:client_id", get(transport::sse::stream_events))
        .route("/v1/clock", get(transport::sse::stream_clock))
        .route("/v1/clients", get(transport::api::list_clients))
        .route("/v1/clients/:client_id/events", post(transport::api::send_to_client))
        .route("/v1/groups", get(transport::api::list_groups))
        .route("/v1/groups/:group", get(transport::api::group_members))
        .route("/v1/groups/:group/events", post(transport::api::send_to_group))
        .route(
            "/v1/groups/:group/members/:client_id",
            put(transport::api::join_group).delete(transport::api::leave_group),
        )
        .route("/v1/broadcast", post(transport::api::broadcast))
        .with_state(state)
}
