use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppSettings {
    #[serde(default = "default_finnhub_base_url")]
    pub finnhub_base_url: String,
    #[serde(default)]
    pub finnhub_token: String,
    #[serde(default = "default_sentiment_url")]
    pub sentiment_url: String,
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,
    /// 新闻回看天数
    #[serde(default = "default_window_days")]
    pub news_window_days: i64,
    /// 搜索面板最多展示的卡片数
    #[serde(default = "default_max_visible")]
    pub max_visible_articles: usize,
}

fn default_finnhub_base_url() -> String { "https://finnhub.io/api/v1".to_string() }
fn default_sentiment_url() -> String { "https://sentim-api.herokuapp.com/api/v1/".to_string() }
fn default_timeout() -> u64 { 15 }
fn default_window_days() -> i64 { 7 }
fn default_max_visible() -> usize { 5 }

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            finnhub_base_url: default_finnhub_base_url(),
            finnhub_token: String::new(),
            sentiment_url: default_sentiment_url(),
            request_timeout_secs: default_timeout(),
            news_window_days: default_window_days(),
            max_visible_articles: default_max_visible(),
        }
    }
}
