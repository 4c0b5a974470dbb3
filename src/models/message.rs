use serde::{Deserialize, Serialize};

use super::news::{CorrelationId, PipelineResult, SentimentVerdict};
use super::watchlist::WatchHeadline;

/// 展示端 -> 后台 的请求
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Request {
    Search { query: String },
    WatchRefresh,
    WatchAdd { symbol: String },
    WatchRemove { symbol: String },
    WatchClear,
}

/// 后台 -> 展示端 的事件
///
/// 搜索结果只有一个槽位（后到者覆盖），自选结果按 `symbol` 路由，
/// 情绪结果按 `correlation_id` 路由。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Event {
    #[serde(rename_all = "camelCase")]
    SearchResult {
        for_query: String,
        result: PipelineResult,
    },
    #[serde(rename_all = "camelCase")]
    WatchUpdate {
        symbol: String,
        headline: WatchHeadline,
    },
    #[serde(rename_all = "camelCase")]
    Sentiment {
        correlation_id: CorrelationId,
        verdict: SentimentVerdict,
    },
    /// 自选列表变更后的完整快照
    Watchlist { symbols: Vec<String> },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inbound_request_shapes() {
        let req: Request = serde_json::from_str(r#"{"type":"search","query":"tesla"}"#).unwrap();
        assert_eq!(req, Request::Search { query: "tesla".to_string() });

        let req: Request = serde_json::from_str(r#"{"type":"watchRefresh"}"#).unwrap();
        assert_eq!(req, Request::WatchRefresh);

        let req: Request = serde_json::from_str(r#"{"type":"watchAdd","symbol":"AAPL"}"#).unwrap();
        assert_eq!(req, Request::WatchAdd { symbol: "AAPL".to_string() });

        let req: Request = serde_json::from_str(r#"{"type":"watchClear"}"#).unwrap();
        assert_eq!(req, Request::WatchClear);
    }

    #[test]
    fn test_unknown_request_type_is_rejected() {
        assert!(serde_json::from_str::<Request>(r#"{"type":"launch"}"#).is_err());
    }

    #[test]
    fn test_outbound_event_tags() {
        let event = Event::SearchResult {
            for_query: "tesla".to_string(),
            result: PipelineResult::Error,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "searchResult");
        assert_eq!(json["forQuery"], "tesla");
        assert_eq!(json["result"], "error");

        let event = Event::WatchUpdate {
            symbol: "AAPL".to_string(),
            headline: WatchHeadline::NoHighImpact,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "watchUpdate");
        assert_eq!(json["symbol"], "AAPL");
    }
}
