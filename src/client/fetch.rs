use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;

use crate::error::ErrorKind;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FetchError {
    /// 对方返回 429，需要退避
    #[error("rate_limited")]
    RateLimited,
    #[error("api_error: upstream answered {status}")]
    Api { status: u16 },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("unexpected payload: {0}")]
    Decode(String),
}

impl FetchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FetchError::RateLimited => ErrorKind::RateLimited,
            FetchError::Api { .. } | FetchError::Decode(_) => ErrorKind::UpstreamError,
            FetchError::Transport(_) => ErrorKind::TransportError,
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, FetchError::RateLimited)
    }

    pub fn from_status(status: u16) -> Option<Self> {
        match status {
            429 => Some(FetchError::RateLimited),
            s if (200..300).contains(&s) => None,
            s => Some(FetchError::Api { status: s }),
        }
    }
}

/// 网络层接缝，测试时替换成假实现
#[async_trait]
pub trait JsonFetcher: Send + Sync {
    async fn get_json(&self, path: &str, params: &[(String, String)]) -> Result<Value, FetchError>;
    async fn post_json(&self, path: &str, body: &Value) -> Result<Value, FetchError>;
}

/// 通过代理网关访问上游
#[derive(Clone)]
pub struct HttpFetcher {
    http: reqwest::Client,
    base_url: String,
}

impl HttpFetcher {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn read_json(response: reqwest::Response) -> Result<Value, FetchError> {
        if let Some(err) = FetchError::from_status(response.status().as_u16()) {
            if response.status() == StatusCode::TOO_MANY_REQUESTS {
                tracing::warn!("{} answered 429", response.url().path());
            }
            return Err(err);
        }
        response
            .json()
            .await
            .map_err(|e| FetchError::Decode(e.to_string()))
    }
}

#[async_trait]
impl JsonFetcher for HttpFetcher {
    async fn get_json(&self, path: &str, params: &[(String, String)]) -> Result<Value, FetchError> {
        let response = self
            .http
            .get(self.url(path))
            .query(params)
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        Self::read_json(response).await
    }

    async fn post_json(&self, path: &str, body: &Value) -> Result<Value, FetchError> {
        let response = self
            .http
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        Self::read_json(response).await
    }
}
