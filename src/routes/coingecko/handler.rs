use axum::{
    extract::{Path, Query, State, rejection::PathRejection},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};

use super::model::{CachedUpstream, forwarded_params, is_allowed_path, normalize_path, upstream_url};
use crate::{AppState, cache::keys::PROXY_PREFIX, cache::cache_key, error::ProxyError};

pub async fn proxy_root() -> ProxyError {
    ProxyError::InvalidPath
}

pub async fn proxy_market_data(
    State(state): State<AppState>,
    raw_path: Result<Path<String>, PathRejection>,
    Query(query): Query<Vec<(String, String)>>,
) -> Result<Response, ProxyError> {
    // 路径解码失败 (比如非法的 UTF-8 转义) 也按非法路径处理
    let Path(raw_path) = raw_path.map_err(|e| {
        tracing::warn!("rejecting undecodable market-data path: {}", e);
        ProxyError::InvalidPath
    })?;
    let path = normalize_path(&raw_path);
    if !is_allowed_path(&path) {
        tracing::warn!("rejecting market-data path {:?}", path);
        return Err(ProxyError::InvalidPath);
    }

    let params = forwarded_params(query);

    let ttl = state.config.market_cache_ttl();
    let key = cache_key(PROXY_PREFIX, &path, &params);
    if !ttl.is_zero() {
        if let Some(cached) = state.market_cache.get::<CachedUpstream>(&key).await {
            tracing::debug!("serving {} from proxy cache", path);
            return Ok(relay(cached));
        }
    }

    let url = upstream_url(&state.config.coingecko_base_url, &path);
    let upstream = state
        .http
        .get(&url)
        .query(&params)
        .header(header::ACCEPT, "application/json")
        .send()
        .await
        .map_err(|e| {
            tracing::error!("market-data upstream unreachable: {}", e);
            ProxyError::Proxy
        })?;

    let status = upstream.status().as_u16();
    let content_type = upstream
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = upstream.text().await.map_err(|e| {
        tracing::error!("failed to read market-data upstream body: {}", e);
        ProxyError::Proxy
    })?;

    tracing::info!("GET {} -> {}", path, status);

    let response = CachedUpstream {
        status,
        content_type,
        body,
    };
    if !ttl.is_zero() && (200..300).contains(&status) {
        state.market_cache.set(&key, &response, ttl).await;
    }

    Ok(relay(response))
}

/// 原样转发上游状态码和响应体
fn relay(upstream: CachedUpstream) -> Response {
    let status = StatusCode::from_u16(upstream.status).unwrap_or(StatusCode::BAD_GATEWAY);
    let mut response = (status, upstream.body).into_response();
    if let Some(value) = upstream
        .content_type
        .and_then(|ct| HeaderValue::from_str(&ct).ok())
    {
        response.headers_mut().insert(header::CONTENT_TYPE, value);
    }
    response
}
