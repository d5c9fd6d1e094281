/*
 * Responsibility
 * - GET /whoami (JWT filter の内側)
 * - filter が X-USER に載せた claims をそのまま JSON で返す
 */
use axum::{Json, http::HeaderMap, http::StatusCode};
use serde_json::{Value, json};

use crate::middleware::auth::USER_HEADER;

pub async fn whoami(headers: HeaderMap) -> Result<Json<Value>, StatusCode> {
    // Only reachable behind the filter, which always sets the header.
    let raw = headers.get(USER_HEADER).ok_or(StatusCode::FORBIDDEN)?;

    let claims: Value = serde_json::from_slice(raw.as_bytes()).map_err(|err| {
        tracing::error!(error = %err, "X-USER header is not JSON");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok(Json(json!({ "claims": claims })))
}
