use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crate::utils::{Clock, MonotonicClock, SharedClock};

/// 固定窗口计数状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedWindow {
    pub window_start: i64,
    pub count: u32,
    pub window_ms: i64,
    pub max_calls: u32,
}

impl FixedWindow {
    pub fn new(now: i64, window_ms: i64, max_calls: u32) -> Self {
        Self {
            window_start: now,
            count: 0,
            window_ms,
            max_calls,
        }
    }

    /// 窗口过期只在下一次调用时重置；正好落在边界上的调用仍属于旧窗口
    pub fn admit(&mut self, now: i64) -> bool {
        if now - self.window_start > self.window_ms {
            self.window_start = now;
            self.count = 0;
        }
        if self.count >= self.max_calls {
            return false;
        }
        self.count += 1;
        true
    }

    pub fn is_expired(&self, now: i64) -> bool {
        now - self.window_start > self.window_ms
    }

    /// 距离下一次可能放行还要等多少毫秒
    pub fn retry_after(&self, now: i64) -> i64 {
        if self.is_expired(now) || self.count < self.max_calls {
            return 0;
        }
        self.window_start + self.window_ms + 1 - now
    }
}

/// 单个调用点的限流器，每种操作各建一个实例，互不挤占配额
#[derive(Debug, Clone)]
pub struct RateLimiter {
    state: Arc<Mutex<FixedWindow>>,
    clock: SharedClock,
}

impl RateLimiter {
    pub fn new(interval: Duration, max_calls: u32) -> Self {
        Self::with_clock(interval, max_calls, Arc::new(MonotonicClock::default()))
    }

    pub fn with_clock(interval: Duration, max_calls: u32, clock: SharedClock) -> Self {
        let window_ms = i64::try_from(interval.as_millis()).unwrap_or(i64::MAX);
        let state = FixedWindow::new(clock.now_millis(), window_ms, max_calls);
        Self {
            state: Arc::new(Mutex::new(state)),
            clock,
        }
    }

    pub fn admit(&self) -> bool {
        let now = self.clock.now_millis();
        let admitted = self.lock().admit(now);
        if !admitted {
            tracing::debug!("rate limiter rejected call at {}", now);
        }
        admitted
    }

    /// 等到窗口里有空位再放行；配额为 0 时直接返回 false
    pub async fn acquire(&self) -> bool {
        loop {
            let wait_ms = {
                let mut state = self.lock();
                if state.max_calls == 0 {
                    return false;
                }
                let now = self.clock.now_millis();
                if state.admit(now) {
                    return true;
                }
                state.retry_after(now).max(1)
            };
            tracing::debug!("rate limiter saturated, waiting {}ms", wait_ms);
            tokio::time::sleep(Duration::from_millis(wait_ms as u64)).await;
        }
    }

    pub fn snapshot(&self) -> FixedWindow {
        *self.lock()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FixedWindow> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
