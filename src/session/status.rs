use serde::Serialize;

use crate::client::FetchError;
use crate::error::ErrorKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationStatus {
    #[default]
    Idle,
    Loading,
    RateLimited,
    Error,
}

impl OperationStatus {
    pub fn from_error(err: &FetchError) -> Self {
        match err.kind() {
            ErrorKind::RateLimited => OperationStatus::RateLimited,
            _ => OperationStatus::Error,
        }
    }

    /// rate_limited 和 error 会在延迟后自动回到 idle
    pub fn reverts(&self) -> bool {
        matches!(self, OperationStatus::RateLimited | OperationStatus::Error)
    }

    fn weight(&self) -> u8 {
        match self {
            OperationStatus::Idle => 0,
            OperationStatus::RateLimited => 1,
            OperationStatus::Error => 2,
            OperationStatus::Loading => 3,
        }
    }

    /// 合并多个状态：仍在加载的优先，其次是错误，再次是限流
    pub fn combine<I: IntoIterator<Item = OperationStatus>>(statuses: I) -> Self {
        statuses
            .into_iter()
            .max_by_key(OperationStatus::weight)
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    #[default]
    Idle,
    Loading,
    Done,
}

/// 状态加修订号；延迟回退时只有修订号没变才回到默认值，
/// 期间被别的操作改过就不动
#[derive(Debug, Clone, Copy, Default)]
pub struct StatusCell<S> {
    status: S,
    revision: u64,
}

impl<S: Copy + Default + PartialEq> StatusCell<S> {
    pub fn get(&self) -> S {
        self.status
    }

    pub fn set(&mut self, status: S) -> u64 {
        self.status = status;
        self.revision += 1;
        self.revision
    }

    pub fn revert_if_unchanged(&mut self, revision: u64) -> bool {
        if self.revision != revision {
            return false;
        }
        self.set(S::default());
        true
    }
}
