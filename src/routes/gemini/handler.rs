use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::Value;

use super::model::{MAX_ERROR_DETAILS, build_payload, generate_content_url, parse_body};
use crate::{AppState, error::ProxyError, utils::truncate_chars};

pub async fn proxy_generate(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Response, ProxyError> {
    // 没有密钥时直接失败，不转发
    let Some(api_key) = state.config.gemini_api_key.as_deref() else {
        tracing::error!("GEMINI_API_KEY is not configured");
        return Err(ProxyError::MissingApiKey);
    };

    let payload = build_payload(parse_body(&body)?)?;

    let url = generate_content_url(&state.config.gemini_base_url, &state.config.gemini_model);
    let upstream = state
        .http
        .post(&url)
        .query(&[("key", api_key)])
        .json(&payload)
        .send()
        .await
        .map_err(|e| {
            // 错误信息里的 URL 带着密钥
            tracing::error!("gemini upstream unreachable: {}", e.without_url());
            ProxyError::Proxy
        })?;

    let status = StatusCode::from_u16(upstream.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
    if !status.is_success() {
        let text = upstream.text().await.unwrap_or_default();
        tracing::warn!("gemini upstream returned {}", status);
        return Err(ProxyError::Gemini {
            status,
            details: truncate_chars(&text, MAX_ERROR_DETAILS),
        });
    }

    let data: Value = upstream.json().await.map_err(|e| {
        tracing::error!("gemini upstream sent unreadable JSON: {}", e.without_url());
        ProxyError::Proxy
    })?;

    Ok((StatusCode::OK, Json(data)).into_response())
}
