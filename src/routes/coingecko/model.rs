use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// 内部用来选择上游路径的查询参数，不转发
pub const PATH_SELECTOR: &str = "path";

/// 服务端缓存的上游响应，只缓存成功的 GET
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedUpstream {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
}

/// 只放行 `/search` 和 `/coins/...`，任何含 `..` 的路径都拒绝
pub fn is_allowed_path(path: &str) -> bool {
    if path.is_empty() || path.contains("..") {
        return false;
    }
    path == "/search" || path.starts_with("/coins/")
}

pub fn normalize_path(raw: &str) -> String {
    format!("/{}", raw.trim_start_matches('/'))
}

/// 去掉 `path`，同名参数以最后一个为准并按名字排序。
/// 转发给上游的参数和缓存键都由它生成，两者描述的是同一个请求。
pub fn forwarded_params(query: Vec<(String, String)>) -> Vec<(String, String)> {
    query
        .into_iter()
        .filter(|(key, _)| key != PATH_SELECTOR)
        .collect::<BTreeMap<_, _>>()
        .into_iter()
        .collect()
}

pub fn upstream_url(base_url: &str, path: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), path)
}
