use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use ssecast_core::error::{ClientCode, SseCastError};

/// `SseCastError` rendered as `{code, msg}` with a matching status.
#[derive(Debug)]
pub struct ApiError(pub SseCastError);

impl From<SseCastError> for ApiError {
    fn from(e: SseCastError) -> Self {
        Self(e)
    }
}

fn status_for(code: ClientCode) -> StatusCode {
    match code {
        ClientCode::BadRequest => StatusCode::BAD_REQUEST,
        ClientCode::UnknownRecipient => StatusCode::NOT_FOUND,
        ClientCode::Conflict => StatusCode::CONFLICT,
        ClientCode::Overloaded => StatusCode::SERVICE_UNAVAILABLE,
        ClientCode::Unprocessable => StatusCode::UNPROCESSABLE_ENTITY,
        ClientCode::UnsupportedVersion | ClientCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = self.0.client_code();
        let body = json!({
            "code": code.as_str(),
            "msg": self.0.to_string(),
        });
        (status_for(code), Json(body)).into_response()
    }
}
