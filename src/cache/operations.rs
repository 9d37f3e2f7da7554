use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::models::CacheEnvelope;
use super::store::DurableStore;
use crate::utils::{Clock, SharedClock, SystemClock};

/// 快速层条目数超过它时，写入顺带清掉已过期的条目
const PRUNE_THRESHOLD: usize = 4096;

/// 带过期时间的两层缓存
///
/// 读取先查进程内的快速层，未命中再查持久层，持久层命中且未过期时回填快速层。
/// 写入同时写两层。过期条目读到时按不存在处理；快速层超过阈值后，
/// 下一次写入会把已过期的条目一起清掉，持久层不清理。
#[derive(Clone)]
pub struct TtlCache {
    fast: Arc<Mutex<HashMap<String, CacheEnvelope>>>,
    durable: Option<Arc<dyn DurableStore>>,
    clock: SharedClock,
    prune_threshold: usize,
}

impl TtlCache {
    /// 只有内存一层，服务端用
    pub fn in_memory() -> Self {
        Self::with_clock(None, Arc::new(SystemClock))
    }

    pub fn two_tier(durable: Arc<dyn DurableStore>) -> Self {
        Self::with_clock(Some(durable), Arc::new(SystemClock))
    }

    pub fn with_clock(durable: Option<Arc<dyn DurableStore>>, clock: SharedClock) -> Self {
        Self {
            fast: Arc::new(Mutex::new(HashMap::new())),
            durable,
            clock,
            prune_threshold: PRUNE_THRESHOLD,
        }
    }

    pub fn with_prune_threshold(mut self, prune_threshold: usize) -> Self {
        self.prune_threshold = prune_threshold;
        self
    }

    pub async fn get_value(&self, key: &str) -> Option<Value> {
        let now = self.clock.now_millis();

        let cached = self.fast_tier().get(key).cloned();
        if let Some(envelope) = cached {
            if envelope.is_valid(now) {
                tracing::debug!("cache hit (memory): {}", key);
                return Some(envelope.value);
            }
        }

        let durable = self.durable.as_ref()?;
        let raw = match durable.get(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!("durable cache read failed for {}: {}", key, e);
                return None;
            }
        };

        let envelope: CacheEnvelope = match serde_json::from_str(&raw) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::debug!("ignoring unreadable cache entry {}: {}", key, e);
                return None;
            }
        };
        if !envelope.is_valid(now) {
            tracing::debug!("cache entry expired: {}", key);
            return None;
        }

        tracing::debug!("cache hit (durable): {}", key);
        let value = envelope.value.clone();
        self.fast_tier().insert(key.to_string(), envelope);
        Some(value)
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.get_value(key).await?;
        match serde_json::from_value(value) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                tracing::debug!("cached value for {} has unexpected shape: {}", key, e);
                None
            }
        }
    }

    /// 持久层写失败不算错误，只会让下次读取未命中
    pub async fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T, ttl: Duration) {
        let value = match serde_json::to_value(value) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("value for {} is not serializable: {}", key, e);
                return;
            }
        };
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        let now = self.clock.now_millis();
        let envelope = CacheEnvelope::new(value, now, ttl_ms);

        let raw = serde_json::to_string(&envelope);
        {
            let mut fast = self.fast_tier();
            fast.insert(key.to_string(), envelope);
            if fast.len() > self.prune_threshold {
                let before = fast.len();
                fast.retain(|_, entry| entry.is_valid(now));
                tracing::debug!("pruned {} expired cache entries", before - fast.len());
            }
        }

        if let Some(durable) = &self.durable {
            match raw {
                Ok(raw) => {
                    if let Err(e) = durable.set(key, raw).await {
                        tracing::warn!("durable cache write failed for {}: {}", key, e);
                    }
                }
                Err(e) => tracing::warn!("failed to encode cache envelope for {}: {}", key, e),
            }
        }
    }

    fn fast_tier(&self) -> std::sync::MutexGuard<'_, HashMap<String, CacheEnvelope>> {
        self.fast.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
