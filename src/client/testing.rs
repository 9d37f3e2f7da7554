use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use super::fetch::{FetchError, JsonFetcher};

/// 按路径返回预设结果的假网络层，记录每一次调用
#[derive(Default)]
pub struct FakeFetcher {
    responses: Mutex<HashMap<String, Vec<Result<Value, FetchError>>>>,
    delays: Mutex<HashMap<String, Vec<Duration>>>,
    calls: Mutex<Vec<(String, Vec<(String, String)>)>>,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// 同一路径可排多个结果，按顺序返回；最后一个会一直重复
    pub fn respond(&self, path: &str, result: Result<Value, FetchError>) -> &Self {
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(path.to_string())
            .or_default()
            .push(result);
        self
    }

    /// 给该路径接下来的一次调用加延迟，可排多个
    pub fn delay(&self, path: &str, delay: Duration) -> &Self {
        self.delays
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(path.to_string())
            .or_default()
            .push(delay);
        self
    }

    pub fn calls(&self) -> Vec<(String, Vec<(String, String)>)> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn call_count(&self, path: &str) -> usize {
        self.calls().iter().filter(|(p, _)| p == path).count()
    }

    fn next(&self, path: &str) -> Result<Value, FetchError> {
        let mut responses = self.responses.lock().unwrap_or_else(PoisonError::into_inner);
        match responses.get_mut(path) {
            Some(queue) if queue.len() > 1 => queue.remove(0),
            Some(queue) if queue.len() == 1 => queue[0].clone(),
            _ => Err(FetchError::Api { status: 404 }),
        }
    }
}

#[async_trait]
impl JsonFetcher for FakeFetcher {
    async fn get_json(&self, path: &str, params: &[(String, String)]) -> Result<Value, FetchError> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((path.to_string(), params.to_vec()));
        let result = self.next(path);
        let delay = self
            .delays
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(path)
            .filter(|queue| !queue.is_empty())
            .map(|queue| queue.remove(0));
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        result
    }

    async fn post_json(&self, path: &str, _body: &Value) -> Result<Value, FetchError> {
        self.get_json(path, &[]).await
    }
}
