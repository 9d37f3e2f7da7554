use axum::Json;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::utils::error_codes;

/// 错误大类，客户端据此区分退避和失败
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    RateLimited,
    InvalidInput,
    UpstreamError,
    TransportError,
    MissingConfiguration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProxyError {
    MethodNotAllowed,
    RateLimited,
    InvalidPath,
    InvalidJson,
    MissingPrompt,
    MissingApiKey,
    Gemini { status: StatusCode, details: String },
    Proxy,
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl ProxyError {
    pub fn code(&self) -> &'static str {
        match self {
            ProxyError::MethodNotAllowed => error_codes::METHOD_NOT_ALLOWED,
            ProxyError::RateLimited => error_codes::RATE_LIMITED,
            ProxyError::InvalidPath => error_codes::INVALID_PATH,
            ProxyError::InvalidJson => error_codes::INVALID_JSON,
            ProxyError::MissingPrompt => error_codes::MISSING_PROMPT,
            ProxyError::MissingApiKey => error_codes::MISSING_API_KEY,
            ProxyError::Gemini { .. } => error_codes::GEMINI_ERROR,
            ProxyError::Proxy => error_codes::PROXY_ERROR,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ProxyError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ProxyError::InvalidPath | ProxyError::InvalidJson | ProxyError::MissingPrompt => {
                StatusCode::BAD_REQUEST
            }
            ProxyError::MissingApiKey | ProxyError::Proxy => StatusCode::INTERNAL_SERVER_ERROR,
            ProxyError::Gemini { status, .. } => *status,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = self.code();
        let details = match self {
            ProxyError::Gemini { details, .. } => Some(details),
            _ => None,
        };

        (status, Json(ErrorBody { error, details })).into_response()
    }
}
