// 缓存模块
// 键生成、序列化信封、持久层、两层读写

pub mod keys;
pub mod models;
pub mod operations;
pub mod store;

pub use keys::cache_key;
pub use models::CacheEnvelope;
pub use operations::TtlCache;
pub use store::{DurableStore, MemoryStore, RedisStore, StoreError};
