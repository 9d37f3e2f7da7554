// 固定窗口限流
// 服务端按客户端地址计数，客户端按操作类型各自计数

pub mod keyed;
pub mod window;

pub use keyed::KeyedRateLimiter;
pub use window::{FixedWindow, RateLimiter};
