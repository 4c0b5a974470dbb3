use serde::{Deserialize, Serialize};

use super::news::Article;

/// 持久化自选列表使用的存储键
pub const WATCHLIST_KEY: &str = "watchList";

/// 自选代码在展示端的单条结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WatchHeadline {
    /// 按抓取顺序第一条 High Impact 新闻
    Article(Article),
    NoHighImpact,
}

/// Parse the persisted watchlist blob. Blank and duplicate entries are dropped,
/// first occurrence wins.
pub fn parse_watchlist_blob(data: &str) -> Result<Vec<String>, serde_json::Error> {
    let raw: Vec<String> = serde_json::from_str(data)?;
    let mut symbols: Vec<String> = Vec::with_capacity(raw.len());
    for entry in raw {
        let entry = entry.trim().to_string();
        if entry.is_empty() || symbols.contains(&entry) {
            continue;
        }
        symbols.push(entry);
    }
    Ok(symbols)
}
