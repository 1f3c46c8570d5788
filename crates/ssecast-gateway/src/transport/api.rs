//! Publish and membership endpoints.
//!
//! Thin JSON wrappers over the broker operations; presence is polled here,
//! never pushed.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};

use ssecast_core::error::SseCastError;

use crate::app_state::AppState;
use crate::broker::Fanout;
use crate::notice::Notice;
use crate::transport::ApiError;

type ApiResult<T> = std::result::Result<T, ApiError>;

fn fanout_json(f: &Fanout) -> Value {
    let failed: Vec<Value> = f
        .failed
        .iter()
        .map(|(client, e)| json!({ "client": client, "code": e.client_code().as_str() }))
        .collect();
    json!({ "delivered": f.delivered, "failed": failed })
}

/// `GET /v1/clients`
pub async fn list_clients(State(app): State<AppState>) -> ApiResult<Json<Value>> {
    let clients = app.broker().clients().await?;
    Ok(Json(json!({ "count": clients.len(), "clients": clients })))
}

/// `GET /v1/groups`
pub async fn list_groups(State(app): State<AppState>) -> ApiResult<Json<Value>> {
    let groups = app.broker().groups().await?;
    Ok(Json(json!({ "groups": groups })))
}

/// `GET /v1/groups/:group`
pub async fn group_members(
    State(app): State<AppState>,
    Path(group): Path<String>,
) -> ApiResult<Json<Value>> {
    let members = app
        .broker()
        .group_clients(&group)
        .await?
        .ok_or_else(|| SseCastError::BadRequest(format!("unknown group: {group}")))?;
    Ok(Json(json!({ "group": group, "members": members })))
}

/// `PUT /v1/groups/:group/members/:client_id`
pub async fn join_group(
    State(app): State<AppState>,
    Path((group, client_id)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    app.broker().add_to_group(&client_id, &group).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /v1/groups/:group/members/:client_id`
pub async fn leave_group(
    State(app): State<AppState>,
    Path((group, client_id)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    if app.broker().remove_from_group(&client_id, &group).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Ok(StatusCode::NOT_FOUND)
    }
}

/// `POST /v1/clients/:client_id/events`
pub async fn send_to_client(
    State(app): State<AppState>,
    Path(client_id): Path<String>,
    Json(notice): Json<Notice>,
) -> ApiResult<StatusCode> {
    app.broker().send_to_client(&client_id, notice).await?;
    Ok(StatusCode::ACCEPTED)
}

/// `POST /v1/groups/:group/events`
pub async fn send_to_group(
    State(app): State<AppState>,
    Path(group): Path<String>,
    Json(notice): Json<Notice>,
) -> ApiResult<Json<Value>> {
    let fanout = app.broker().send_to_group(&group, notice).await?;
    Ok(Json(fanout_json(&fanout)))
}

/// `POST /v1/broadcast`
pub async fn broadcast(
    State(app): State<AppState>,
    Json(notice): Json<Notice>,
) -> ApiResult<Json<Value>> {
    let fanout = app.broker().broadcast(notice).await?;
    Ok(Json(fanout_json(&fanout)))
}
