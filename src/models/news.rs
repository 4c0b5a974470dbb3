use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 单条公司新闻
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub headline: String,
    pub url: String,
    /// 发布时间 (UTC)
    pub published_at: DateTime<Utc>,
}

/// 标题的市场影响等级
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ImpactLabel {
    HighImpact,
    Neutral,
    Fyi,
}

impl ImpactLabel {
    /// 按影响排序时的优先级，数值越小越靠前
    pub fn rank(self) -> u8 {
        match self {
            ImpactLabel::HighImpact => 0,
            ImpactLabel::Neutral => 1,
            ImpactLabel::Fyi => 2,
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            ImpactLabel::HighImpact => "High Impact",
            ImpactLabel::Neutral => "Neutral",
            ImpactLabel::Fyi => "FYI",
        }
    }
}

/// FYI 标题的情绪判定
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentVerdict {
    Positive,
    Negative,
    Neutral,
}

impl SentimentVerdict {
    /// 未识别的取值一律按 Neutral 处理
    pub fn from_raw(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "positive" => SentimentVerdict::Positive,
            "negative" => SentimentVerdict::Negative,
            _ => SentimentVerdict::Neutral,
        }
    }
}

impl std::fmt::Display for SentimentVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SentimentVerdict::Positive => write!(f, "positive"),
            SentimentVerdict::Negative => write!(f, "negative"),
            SentimentVerdict::Neutral => write!(f, "neutral"),
        }
    }
}

/// 异步情绪结果回传到具体卡片用的路由令牌
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(Uuid);

impl CorrelationId {
    pub fn mint() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 已分类的新闻，FYI 条目携带情绪回传令牌
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifiedArticle {
    #[serde(flatten)]
    pub article: Article,
    pub label: ImpactLabel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<CorrelationId>,
}

/// 搜索结果的排序方式（仅影响展示顺序）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortMode {
    #[default]
    #[serde(rename = "date")]
    ByDate,
    #[serde(rename = "impact")]
    ByImpact,
}

impl std::str::FromStr for SortMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "date" => Ok(SortMode::ByDate),
            "impact" => Ok(SortMode::ByImpact),
            other => Err(format!("unknown sort mode: {}", other)),
        }
    }
}

/// 单次查询的流水线结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PipelineResult {
    Articles {
        symbol: String,
        articles: Vec<ClassifiedArticle>,
    },
    Empty {
        symbol: String,
    },
    Error,
}
