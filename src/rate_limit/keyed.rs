use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use super::window::FixedWindow;
use crate::utils::{Clock, SharedClock, SystemClock};

const PRUNE_THRESHOLD: usize = 4096;

/// 按客户端地址分别计数的固定窗口限流器，状态只在本进程内存中
#[derive(Debug, Clone)]
pub struct KeyedRateLimiter {
    windows: Arc<Mutex<HashMap<String, FixedWindow>>>,
    window_ms: i64,
    max_calls: u32,
    clock: SharedClock,
}

impl KeyedRateLimiter {
    pub fn new(window: Duration, max_calls: u32) -> Self {
        Self::with_clock(window, max_calls, Arc::new(SystemClock))
    }

    pub fn with_clock(window: Duration, max_calls: u32, clock: SharedClock) -> Self {
        Self {
            windows: Arc::new(Mutex::new(HashMap::new())),
            window_ms: i64::try_from(window.as_millis()).unwrap_or(i64::MAX),
            max_calls,
            clock,
        }
    }

    pub fn check(&self, key: &str) -> bool {
        let now = self.clock.now_millis();
        let mut windows = self.windows.lock().unwrap_or_else(PoisonError::into_inner);

        if windows.len() >= PRUNE_THRESHOLD && !windows.contains_key(key) {
            windows.retain(|_, w| !w.is_expired(now));
        }

        let (window_ms, max_calls) = (self.window_ms, self.max_calls);
        windows
            .entry(key.to_string())
            .or_insert_with(|| FixedWindow::new(now, window_ms, max_calls))
            .admit(now)
    }

    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms as u64)
    }

    pub fn max_calls(&self) -> u32 {
        self.max_calls
    }

    pub fn tracked_clients(&self) -> usize {
        self.windows
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
