use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::TransportError;
use crate::models::news::SentimentVerdict;
use crate::models::settings::AppSettings;
use crate::utils::http::build_sentiment_client;

/// 外部情绪分类服务，返回原始判定字符串
#[async_trait]
pub trait SentimentSource: Send + Sync {
    async fn analyze(&self, text: &str) -> Result<String, TransportError>;
}

pub struct SentimHttpSource {
    client: reqwest::Client,
    url: String,
}

impl SentimHttpSource {
    pub fn new(settings: &AppSettings) -> anyhow::Result<Self> {
        Ok(Self {
            client: build_sentiment_client(settings.request_timeout_secs)?,
            url: settings.sentiment_url.clone(),
        })
    }
}

#[async_trait]
impl SentimentSource for SentimHttpSource {
    async fn analyze(&self, text: &str) -> Result<String, TransportError> {
        let body = serde_json::json!({ "text": text });
        let resp = self.client.post(&self.url).json(&body).send().await?;
        if !resp.status().is_success() {
            return Err(TransportError::Status(resp.status().as_u16()));
        }
        let text = resp.text().await?;
        parse_sentiment_body(&text)
    }
}

/// 响应体不是 JSON 时报 `Decode`
pub fn parse_sentiment_body(body: &str) -> Result<String, TransportError> {
    let json: Value = serde_json::from_str(body)
        .map_err(|e| TransportError::decode(format!("sentiment response: {}", e)))?;
    parse_sentiment_type(&json)
}

/// 响应格式 `{"result": {"polarity": 0.5, "type": "positive"}, "sentences": [...]}`
pub fn parse_sentiment_type(json: &Value) -> Result<String, TransportError> {
    json["result"]["type"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| TransportError::decode("sentiment response has no result.type"))
}

/// 对单条 FYI 标题做情绪判定，失败时的兜底由调用方决定
pub struct SentimentEnricher {
    source: Arc<dyn SentimentSource>,
}

impl SentimentEnricher {
    pub fn new(source: Arc<dyn SentimentSource>) -> Self {
        Self { source }
    }

    pub async fn enrich(&self, headline: &str) -> Result<SentimentVerdict, TransportError> {
        let raw = self.source.analyze(headline).await?;
        let verdict = SentimentVerdict::from_raw(&raw);
        if verdict == SentimentVerdict::Neutral && !raw.eq_ignore_ascii_case("neutral") {
            log::debug!("unrecognized sentiment verdict {:?}, using neutral", raw);
        }
        Ok(verdict)
    }
}
