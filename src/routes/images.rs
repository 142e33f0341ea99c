use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};

use super::AppState;
use crate::error::{AppError, AppResult};

/// Full-size image URL for a proxied path
pub fn upstream_url(image_base_url: &str, path: &str) -> String {
    format!("{}/original/{}", image_base_url, path.trim_start_matches('/'))
}

/// Serves `/image-proxy/{path}` from the image CDN's original-size bucket
pub async fn proxy(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> AppResult<Response> {
    let url = upstream_url(&state.image_base_url, &path);
    let response = state.http_client.get(&url).send().await?;

    let status = response.status();
    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(AppError::NotFound(format!("Image {}", path)));
    }
    if !status.is_success() {
        tracing::warn!(url = %url, status = %status, "Image fetch failed");
        return Err(AppError::Network(format!(
            "Image CDN returned status {}",
            status
        )));
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| HeaderValue::from_str(v).ok())
        .unwrap_or(HeaderValue::from_static("application/octet-stream"));
    let bytes = response.bytes().await?;

    tracing::debug!(path = %path, size = bytes.len(), "Image proxied");
    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, content_type)],
        Body::from(bytes),
    )
        .into_response())
}
