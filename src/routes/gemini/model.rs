use serde_json::{Value, json};

use crate::error::ProxyError;

/// 上游错误详情最多转发的字符数
pub const MAX_ERROR_DETAILS: usize = 500;

/// 请求体可能是 JSON，也可能是再套一层字符串的 JSON；空请求体视为没有输入
pub fn parse_body(bytes: &[u8]) -> Result<Value, ProxyError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    let body: Value = serde_json::from_slice(bytes).map_err(|_| ProxyError::InvalidJson)?;
    match body {
        Value::String(inner) => serde_json::from_str(&inner).map_err(|_| ProxyError::InvalidJson),
        other => Ok(other),
    }
}

/// 客户端发 `{"prompt": "..."}`，或者发一个完整的 generateContent 请求体
/// (`{"contents": [...], "generationConfig": {...}, ...}`)。
/// 有 `contents` 时原样转发整个请求体 (去掉 `prompt`)，否则把 `prompt` 包成单轮用户消息
pub fn build_payload(body: Value) -> Result<Value, ProxyError> {
    let Value::Object(mut fields) = body else {
        return Err(ProxyError::MissingPrompt);
    };

    let has_contents = fields.get("contents").is_some_and(|c| !c.is_null());
    let prompt = fields
        .get("prompt")
        .and_then(Value::as_str)
        .filter(|p| !p.is_empty())
        .map(str::to_string);

    if has_contents {
        fields.remove("prompt");
        return Ok(Value::Object(fields));
    }

    match prompt {
        Some(text) => Ok(json!({
            "contents": [
                {
                    "role": "user",
                    "parts": [{ "text": text }]
                }
            ]
        })),
        None => Err(ProxyError::MissingPrompt),
    }
}

pub fn generate_content_url(base_url: &str, model: &str) -> String {
    format!(
        "{}/models/{}:generateContent",
        base_url.trim_end_matches('/'),
        model
    )
}
