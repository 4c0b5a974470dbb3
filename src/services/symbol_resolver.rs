use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::TransportError;
use crate::models::settings::AppSettings;
use crate::utils::http::build_finnhub_client;

/// 代码搜索返回的候选项
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolCandidate {
    pub symbol: String,
    pub description: String,
}

/// 外部代码搜索服务
#[async_trait]
pub trait SymbolSearch: Send + Sync {
    /// 返回按相关度排序的候选列表；响应无法识别时返回空列表
    async fn search(&self, query: &str) -> Result<Vec<SymbolCandidate>, TransportError>;
}

pub struct FinnhubSymbolSearch {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl FinnhubSymbolSearch {
    pub fn new(settings: &AppSettings) -> anyhow::Result<Self> {
        Ok(Self {
            client: build_finnhub_client(settings.request_timeout_secs)?,
            base_url: settings.finnhub_base_url.trim_end_matches('/').to_string(),
            token: settings.finnhub_token.clone(),
        })
    }
}

#[async_trait]
impl SymbolSearch for FinnhubSymbolSearch {
    async fn search(&self, query: &str) -> Result<Vec<SymbolCandidate>, TransportError> {
        let url = format!(
            "{}/search?q={}&token={}",
            self.base_url,
            urlencoding::encode(query),
            urlencoding::encode(&self.token)
        );

        let resp = self.client.get(&url).send().await?;
        if !resp.status().is_success() {
            return Err(TransportError::Status(resp.status().as_u16()));
        }
        let text = resp.text().await?;
        Ok(parse_search_candidates(&text))
    }
}

/// 解析 `{"count": n, "result": [{"symbol": ..., "description": ...}]}`
pub fn parse_search_candidates(body: &str) -> Vec<SymbolCandidate> {
    let json: Value = match serde_json::from_str(body) {
        Ok(v) => v,
        Err(e) => {
            log::warn!("symbol search response is not JSON: {}", e);
            return Vec::new();
        }
    };

    let mut candidates = Vec::new();
    if let Some(result) = json["result"].as_array() {
        for item in result {
            let symbol = item["symbol"].as_str().unwrap_or("").to_string();
            let description = item["description"].as_str().unwrap_or("").to_string();
            candidates.push(SymbolCandidate { symbol, description });
        }
    }
    candidates
}

/// 把自由文本查询映射成股票代码
pub struct SymbolResolver {
    search: Arc<dyn SymbolSearch>,
}

impl SymbolResolver {
    pub fn new(search: Arc<dyn SymbolSearch>) -> Self {
        Self { search }
    }

    /// 只有传输失败才会返回错误；没有候选时把查询本身当作代码
    pub async fn resolve(&self, query: &str) -> Result<String, TransportError> {
        let candidates = self.search.search(query).await?;
        match pick_candidate(&candidates) {
            Some(c) => {
                let symbol = c.symbol.trim().to_string();
                log::debug!("resolved {:?} -> {} ({})", query, symbol, c.description);
                Ok(symbol)
            }
            None => {
                let symbol = query.trim().to_uppercase();
                log::debug!("no usable candidate for {:?}, using {}", query, symbol);
                Ok(symbol)
            }
        }
    }
}

/// 只看第一个候选；代码为空视为没有候选
fn pick_candidate(candidates: &[SymbolCandidate]) -> Option<&SymbolCandidate> {
    candidates.first().filter(|c| !c.symbol.trim().is_empty())
}
