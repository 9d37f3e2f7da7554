use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 两层缓存共用的序列化信封，过期时间是 Unix 毫秒
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEnvelope {
    pub value: Value,
    pub expires_at: i64,
}

impl CacheEnvelope {
    pub fn new(value: Value, now: i64, ttl_ms: i64) -> Self {
        Self {
            value,
            expires_at: now.saturating_add(ttl_ms),
        }
    }

    pub fn is_valid(&self, now: i64) -> bool {
        now <= self.expires_at
    }
}
