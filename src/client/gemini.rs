use std::sync::Arc;

use serde_json::{Value, json};

use super::fetch::{FetchError, JsonFetcher};

pub const GEMINI_PROXY_PATH: &str = "/api/gemini";

#[derive(Clone)]
pub struct GeminiClient {
    fetcher: Arc<dyn JsonFetcher>,
}

impl GeminiClient {
    pub fn new(fetcher: Arc<dyn JsonFetcher>) -> Self {
        Self { fetcher }
    }

    pub async fn call_gemini_proxy(&self, prompt: &str) -> Result<Value, FetchError> {
        self.fetcher
            .post_json(GEMINI_PROXY_PATH, &json!({ "prompt": prompt }))
            .await
    }
}

/// 拼出第一个候选回答的全部文本片段
pub fn generated_text(response: &Value) -> Option<String> {
    let parts = response
        .get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .as_array()?;
    let text: String = parts
        .iter()
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .collect();
    (!text.is_empty()).then_some(text)
}
