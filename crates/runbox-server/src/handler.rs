use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use runbox_types::{endpoints, HealthResponse};
use serde::Deserialize;

use crate::error::ServerResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct StoreParams {
    #[serde(rename = "writeKey")]
    pub write_key: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ImportParams {
    pub files: Option<String>,
}

fn content_type(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
}

/// `GET /store/{readKey}`
pub async fn fetch_handler(
    State(state): State<AppState>,
    Path(read_key): Path<String>,
) -> ServerResult<impl IntoResponse> {
    let body = state.gateway.fetch(&read_key).await?;
    Ok(([(header::CONTENT_TYPE, "application/json")], body))
}

/// `POST /store/new` and `POST /store/{readKey}?writeKey={W}`
pub async fn store_handler(
    State(state): State<AppState>,
    Path(read_key): Path<String>,
    Query(params): Query<StoreParams>,
    headers: HeaderMap,
    body: Bytes,
) -> ServerResult<axum::response::Response> {
    let ct = content_type(&headers);
    if read_key == endpoints::STORE_NEW_SEGMENT {
        let created = state.gateway.create_new(ct, body).await?;
        return Ok((StatusCode::CREATED, Json(created)).into_response());
    }
    state
        .gateway
        .update(&read_key, params.write_key.as_deref(), ct, body)
        .await?;
    Ok("ok".into_response())
}

/// `GET /new?files={payload}`
pub async fn import_handler(
    State(state): State<AppState>,
    Query(params): Query<ImportParams>,
) -> ServerResult<impl IntoResponse> {
    let read_key = state.importer.import(params.files.as_deref()).await?;
    Ok((
        StatusCode::FOUND,
        [(header::LOCATION, endpoints::store_path(&read_key))],
    ))
}

pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::default())
}

pub async fn info_handler() -> String {
    format!("Release version {}", env!("CARGO_PKG_VERSION"))
}
