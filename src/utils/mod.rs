pub mod clock;

pub use clock::{Clock, ManualClock, MonotonicClock, SharedClock, SystemClock};

/// 按字符截断，不会切断多字节字符
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

pub mod error_codes {
    pub const METHOD_NOT_ALLOWED: &str = "method_not_allowed";
    pub const RATE_LIMITED: &str = "rate_limited";
    pub const INVALID_PATH: &str = "invalid_path";
    pub const INVALID_JSON: &str = "invalid_json";
    pub const MISSING_PROMPT: &str = "missing_prompt";
    pub const MISSING_API_KEY: &str = "missing_api_key";
    pub const GEMINI_ERROR: &str = "gemini_error";
    pub const PROXY_ERROR: &str = "proxy_error";
}
