use std::collections::BTreeMap;

/// 行情数据缓存键前缀
pub const MARKET_PREFIX: &str = "cg";

/// 服务端代理响应缓存键前缀
pub const PROXY_PREFIX: &str = "proxy:cg";

/// 由 (操作路径, 参数) 生成缓存键；参数先按键排序，插入顺序不影响结果。
/// 重复的参数名以最后一个为准，和拼接查询串时的覆盖行为一致。
pub fn cache_key<K, V>(prefix: &str, path: &str, params: &[(K, V)]) -> String
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    let normalized: BTreeMap<&str, &str> = params
        .iter()
        .map(|(k, v)| (k.as_ref(), v.as_ref()))
        .collect();
    let params_json = serde_json::to_string(&normalized).unwrap_or_else(|_| "{}".to_string());
    format!("{}:{}:{}", prefix, path, params_json)
}
