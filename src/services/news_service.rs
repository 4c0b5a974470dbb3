use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde_json::Value;

use crate::error::TransportError;
use crate::models::news::Article;
use crate::models::settings::AppSettings;
use crate::utils::http::build_finnhub_client;

/// 外部公司新闻服务
#[async_trait]
pub trait NewsSource: Send + Sync {
    async fn company_news(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Article>, TransportError>;
}

pub struct FinnhubNewsSource {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl FinnhubNewsSource {
    pub fn new(settings: &AppSettings) -> anyhow::Result<Self> {
        Ok(Self {
            client: build_finnhub_client(settings.request_timeout_secs)?,
            base_url: settings.finnhub_base_url.trim_end_matches('/').to_string(),
            token: settings.finnhub_token.clone(),
        })
    }
}

#[async_trait]
impl NewsSource for FinnhubNewsSource {
    async fn company_news(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Article>, TransportError> {
        let url = format!(
            "{}/company-news?symbol={}&from={}&to={}&token={}",
            self.base_url,
            urlencoding::encode(symbol),
            from.format("%Y-%m-%d"),
            to.format("%Y-%m-%d"),
            urlencoding::encode(&self.token)
        );

        let resp = self.client.get(&url).send().await?;
        if !resp.status().is_success() {
            return Err(TransportError::Status(resp.status().as_u16()));
        }
        let text = resp.text().await?;
        let json: Value = serde_json::from_str(&text)
            .map_err(|e| TransportError::decode(format!("company news for {}: {}", symbol, e)))?;
        Ok(parse_company_news(&json))
    }
}

/// 解析 `[{"headline": ..., "url": ..., "datetime": <unix 秒>}]`
///
/// 非数组视为没有数据；缺失字段取空值，非对象条目跳过。
pub fn parse_company_news(json: &Value) -> Vec<Article> {
    let mut items = Vec::new();
    if let Some(list) = json.as_array() {
        for item in list {
            if !item.is_object() {
                continue;
            }
            let headline = item["headline"].as_str().unwrap_or("").to_string();
            let url = item["url"].as_str().unwrap_or("").to_string();
            let published_at = item["datetime"]
                .as_i64()
                .and_then(|ts| DateTime::from_timestamp(ts, 0))
                .unwrap_or(DateTime::UNIX_EPOCH);

            items.push(Article {
                headline,
                url,
                published_at,
            });
        }
    }
    items
}

pub const DEFAULT_WINDOW_DAYS: i64 = 7;

/// 截止到 `now` 的回看窗口，两端都是日历日期
///
/// 天数为负或超出范围时退回 7 天。
pub fn news_window(now: DateTime<Utc>, days: i64) -> (NaiveDate, NaiveDate) {
    let to = now.date_naive();
    let start = Duration::try_days(days)
        .filter(|d| *d >= Duration::zero())
        .and_then(|d| now.checked_sub_signed(d))
        .unwrap_or_else(|| {
            log::warn!("invalid news window of {} days, using {}", days, DEFAULT_WINDOW_DAYS);
            now - Duration::days(DEFAULT_WINDOW_DAYS)
        });
    (start.date_naive(), to)
}

pub struct NewsFetcher {
    source: Arc<dyn NewsSource>,
    window_days: i64,
}

impl NewsFetcher {
    pub fn new(source: Arc<dyn NewsSource>, window_days: i64) -> Self {
        Self { source, window_days }
    }

    /// 原样返回服务端给出的新闻，不过滤不排序；空列表不是错误
    pub async fn fetch(&self, symbol: &str) -> Result<Vec<Article>, TransportError> {
        self.fetch_at(symbol, Utc::now()).await
    }

    pub async fn fetch_at(
        &self,
        symbol: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<Article>, TransportError> {
        let (from, to) = news_window(now, self.window_days);
        log::debug!("fetching news for {} from {} to {}", symbol, from, to);
        self.source.company_news(symbol, from, to).await
    }
}
