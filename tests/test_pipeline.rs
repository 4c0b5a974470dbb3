//! 流水线 + 自选列表 + 展示端 的端到端测试
//!
//! 外部服务全部用内存假实现替换，数据库使用内存 SQLite，不访问网络：
//!   cargo test --test test_pipeline -- --nocapture

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use tokio::io::AsyncReadExt;
use tokio::sync::mpsc::UnboundedReceiver;

use insights_lib::bridge;
use insights_lib::channel::EventSink;
use insights_lib::commands;
use insights_lib::db::database::Database;
use insights_lib::db::BlobStore;
use insights_lib::display::{DisplayState, SearchSlot, WatchSlot};
use insights_lib::error::TransportError;
use insights_lib::models::message::{Event, Request};
use insights_lib::models::news::{Article, ImpactLabel, PipelineResult, SentimentVerdict};
use insights_lib::models::settings::AppSettings;
use insights_lib::models::watchlist::{WatchHeadline, WATCHLIST_KEY};
use insights_lib::services::news_service::NewsSource;
use insights_lib::services::sentiment_service::SentimentSource;
use insights_lib::services::symbol_resolver::{SymbolCandidate, SymbolSearch};
use insights_lib::{AppState, Collaborators};

// ==================== 假的外部服务 ====================

/// 把查询直接大写当作代码；`failing` 中的查询返回传输错误
struct FakeSearch {
    failing: Vec<&'static str>,
}

#[async_trait]
impl SymbolSearch for FakeSearch {
    async fn search(&self, query: &str) -> Result<Vec<SymbolCandidate>, TransportError> {
        if self.failing.contains(&query) {
            return Err(TransportError::Status(502));
        }
        Ok(vec![SymbolCandidate {
            symbol: query.trim().to_uppercase(),
            description: format!("{} INC", query.to_uppercase()),
        }])
    }
}

/// 按代码返回预置新闻；未预置的代码返回空列表，`Err` 表示服务失败
struct FakeNews {
    by_symbol: Mutex<HashMap<&'static str, Result<Vec<Article>, u16>>>,
    calls: Mutex<Vec<String>>,
}

impl FakeNews {
    fn new(entries: Vec<(&'static str, Result<Vec<Article>, u16>)>) -> Self {
        Self {
            by_symbol: Mutex::new(entries.into_iter().collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn set(&self, symbol: &'static str, response: Result<Vec<Article>, u16>) {
        self.by_symbol.lock().unwrap().insert(symbol, response);
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl NewsSource for FakeNews {
    async fn company_news(
        &self,
        symbol: &str,
        _from: NaiveDate,
        _to: NaiveDate,
    ) -> Result<Vec<Article>, TransportError> {
        self.calls.lock().unwrap().push(symbol.to_string());
        let response = self.by_symbol.lock().unwrap().get(symbol).cloned();
        tokio::time::sleep(Duration::from_millis(10)).await;
        match response {
            Some(Ok(articles)) => Ok(articles),
            Some(Err(status)) => Err(TransportError::Status(status)),
            None => Ok(Vec::new()),
        }
    }
}

struct FakeSentiment {
    verdict: Option<&'static str>,
}

#[async_trait]
impl SentimentSource for FakeSentiment {
    async fn analyze(&self, _text: &str) -> Result<String, TransportError> {
        tokio::time::sleep(Duration::from_millis(20)).await;
        match self.verdict {
            Some(v) => Ok(v.to_string()),
            None => Err(TransportError::Status(500)),
        }
    }
}

// ==================== 工具函数 ====================

fn article(headline: &str, ts: i64) -> Article {
    Article {
        headline: headline.to_string(),
        url: format!("https://news.example/{}", ts),
        published_at: DateTime::<Utc>::from_timestamp(ts, 0).unwrap(),
    }
}

fn apple_news() -> Vec<Article> {
    vec![
        article("Apple opens flagship store in Mumbai", 1_700_000_100),
        article("Apple earnings beat expectations", 1_700_000_000),
    ]
}

struct Harness {
    app: Arc<AppState>,
    events: UnboundedReceiver<Event>,
    news: Arc<FakeNews>,
    db: Arc<Database>,
}

fn harness(
    watched: &[&str],
    news: FakeNews,
    failing_search: Vec<&'static str>,
    verdict: Option<&'static str>,
) -> Harness {
    let db = Arc::new(Database::open_in_memory().unwrap());
    if !watched.is_empty() {
        db.put_blob(WATCHLIST_KEY, &serde_json::to_string(watched).unwrap())
            .unwrap();
    }
    let news = Arc::new(news);
    let collaborators = Collaborators {
        search: Arc::new(FakeSearch {
            failing: failing_search,
        }),
        news: news.clone(),
        sentiment: Arc::new(FakeSentiment { verdict }),
    };
    let (sink, events) = EventSink::channel();
    let app = Arc::new(AppState::new(
        AppSettings::default(),
        db.clone(),
        collaborators,
        sink,
    ));
    Harness {
        app,
        events,
        news,
        db,
    }
}

fn drain(events: &mut UnboundedReceiver<Event>) -> Vec<Event> {
    let mut out = Vec::new();
    while let Ok(event) = events.try_recv() {
        out.push(event);
    }
    out
}

async fn next_event(events: &mut UnboundedReceiver<Event>) -> Option<Event> {
    tokio::time::timeout(Duration::from_secs(2), events.recv())
        .await
        .ok()
        .flatten()
}

async fn run(app: &Arc<AppState>, request: Request) {
    if let Some(handle) = commands::dispatch(app, request) {
        handle.await.unwrap();
    }
}

// ==================== 自选模式 ====================

#[tokio::test]
async fn test_watch_refresh_isolates_failing_symbol() {
    let mut h = harness(
        &["AAPL", "TSLA"],
        FakeNews::new(vec![("AAPL", Ok(apple_news())), ("TSLA", Err(503))]),
        vec![],
        Some("positive"),
    );

    run(&h.app, Request::WatchRefresh).await;
    let events = drain(&mut h.events);

    assert_eq!(
        events[0],
        Event::Watchlist {
            symbols: vec!["AAPL".to_string(), "TSLA".to_string()]
        }
    );
    let updates: Vec<&Event> = events
        .iter()
        .filter(|e| matches!(e, Event::WatchUpdate { .. }))
        .collect();
    assert_eq!(updates.len(), 1, "失败的代码不应发出更新");

    let mut display = DisplayState::new(5);
    for event in &events {
        display.apply(event);
    }
    match display.watch_slot("AAPL") {
        Some(WatchSlot::Headline(a)) => assert_eq!(a.headline, "Apple earnings beat expectations"),
        other => panic!("unexpected AAPL slot {:?}", other),
    }
    assert_eq!(display.watch_slot("TSLA"), Some(&WatchSlot::Pending));
}

#[tokio::test]
async fn test_failed_refresh_keeps_previous_headline() {
    let mut h = harness(
        &["AAPL", "TSLA"],
        FakeNews::new(vec![
            ("AAPL", Ok(apple_news())),
            ("TSLA", Ok(vec![article("Tesla recall widens", 1_700_000_000)])),
        ]),
        vec![],
        Some("positive"),
    );
    let mut display = DisplayState::new(5);

    run(&h.app, Request::WatchRefresh).await;
    for event in drain(&mut h.events) {
        display.apply(&event);
    }
    let before = display.watch_slot("TSLA").cloned();
    match &before {
        Some(WatchSlot::Headline(a)) => assert_eq!(a.headline, "Tesla recall widens"),
        other => panic!("unexpected TSLA slot {:?}", other),
    }

    // 第二轮 TSLA 服务失败，AAPL 改为无重大新闻
    h.news.set("TSLA", Err(503));
    h.news.set("AAPL", Ok(vec![]));
    run(&h.app, Request::WatchRefresh).await;
    for event in drain(&mut h.events) {
        display.apply(&event);
    }

    assert_eq!(display.watch_slot("TSLA").cloned(), before);
    assert_eq!(display.watch_slot("AAPL"), Some(&WatchSlot::NoHighImpact));
}

#[tokio::test]
async fn test_watch_refresh_reports_no_high_impact() {
    let mut h = harness(
        &["MSFT"],
        FakeNews::new(vec![(
            "MSFT",
            Ok(vec![article("Microsoft hosts developer meetup", 1_700_000_000)]),
        )]),
        vec![],
        Some("positive"),
    );

    run(&h.app, Request::WatchRefresh).await;
    let events = drain(&mut h.events);

    assert!(events.contains(&Event::WatchUpdate {
        symbol: "MSFT".to_string(),
        headline: WatchHeadline::NoHighImpact,
    }));
}

#[tokio::test]
async fn test_resolution_failure_does_not_block_other_symbols() {
    let mut h = harness(
        &["BAD", "AAPL"],
        FakeNews::new(vec![("AAPL", Ok(apple_news()))]),
        vec!["BAD"],
        Some("positive"),
    );

    run(&h.app, Request::WatchRefresh).await;
    let events = drain(&mut h.events);

    let symbols: Vec<&str> = events
        .iter()
        .filter_map(|e| match e {
            Event::WatchUpdate { symbol, .. } => Some(symbol.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(symbols, vec!["AAPL"]);
    assert_eq!(h.news.calls(), vec!["AAPL".to_string()]);
}

#[tokio::test]
async fn test_add_is_idempotent_and_refreshes_only_new_symbol() {
    let mut h = harness(
        &["AAPL"],
        FakeNews::new(vec![("AAPL", Ok(apple_news())), ("TSLA", Ok(vec![]))]),
        vec![],
        Some("positive"),
    );

    run(
        &h.app,
        Request::WatchAdd {
            symbol: " TSLA ".to_string(),
        },
    )
    .await;
    let events = drain(&mut h.events);
    assert_eq!(
        events,
        vec![
            Event::Watchlist {
                symbols: vec!["AAPL".to_string(), "TSLA".to_string()]
            },
            Event::WatchUpdate {
                symbol: "TSLA".to_string(),
                headline: WatchHeadline::NoHighImpact,
            },
        ]
    );
    assert_eq!(h.news.calls(), vec!["TSLA".to_string()]);

    assert!(commands::dispatch(
        &h.app,
        Request::WatchAdd {
            symbol: "TSLA".to_string()
        }
    )
    .is_none());
    assert!(drain(&mut h.events).is_empty());
    assert_eq!(
        h.db.get_blob(WATCHLIST_KEY).unwrap().as_deref(),
        Some(r#"["AAPL","TSLA"]"#)
    );
}

#[tokio::test]
async fn test_late_update_for_removed_symbol_is_dropped() {
    let mut h = harness(
        &["AAPL", "TSLA"],
        FakeNews::new(vec![("AAPL", Ok(apple_news()))]),
        vec![],
        Some("positive"),
    );
    let mut display = DisplayState::new(5);

    run(&h.app, Request::WatchRefresh).await;
    let refresh_events = drain(&mut h.events);

    // 刷新结果到达前先移除 AAPL
    run(
        &h.app,
        Request::WatchRemove {
            symbol: "AAPL".to_string(),
        },
    )
    .await;
    for event in drain(&mut h.events) {
        assert!(display.apply(&event));
    }
    assert_eq!(display.watch_slot("AAPL"), None);

    let aapl_update = refresh_events
        .iter()
        .find(|e| matches!(e, Event::WatchUpdate { symbol, .. } if symbol == "AAPL"))
        .unwrap();
    assert!(!display.apply(aapl_update));
    assert_eq!(display.watch_slots().len(), 1);
}

#[tokio::test]
async fn test_clear_publishes_empty_snapshot() {
    let mut h = harness(&["AAPL", "TSLA"], FakeNews::new(vec![]), vec![], None);

    run(&h.app, Request::WatchClear).await;

    assert_eq!(
        drain(&mut h.events),
        vec![Event::Watchlist { symbols: vec![] }]
    );
    assert!(h.app.watchlist.store().symbols().is_empty());
    assert_eq!(h.db.get_blob(WATCHLIST_KEY).unwrap().as_deref(), Some("[]"));
}

// ==================== 搜索模式 ====================

#[tokio::test]
async fn test_search_emits_result_then_sentiment_for_fyi() {
    let mut h = harness(
        &[],
        FakeNews::new(vec![("AAPL", Ok(apple_news()))]),
        vec![],
        Some("POSITIVE"),
    );
    let mut display = DisplayState::new(5);
    display.begin_search("aapl");

    run(
        &h.app,
        Request::Search {
            query: "aapl".to_string(),
        },
    )
    .await;

    let first = next_event(&mut h.events).await.unwrap();
    let fyi_id = match &first {
        Event::SearchResult {
            for_query,
            result: PipelineResult::Articles { symbol, articles },
        } => {
            assert_eq!(for_query, "aapl");
            assert_eq!(symbol, "AAPL");
            assert_eq!(articles.len(), 2);
            let high = articles
                .iter()
                .find(|a| a.label == ImpactLabel::HighImpact)
                .unwrap();
            assert!(high.correlation_id.is_none());
            articles
                .iter()
                .find(|a| a.label == ImpactLabel::Fyi)
                .and_then(|a| a.correlation_id)
                .unwrap()
        }
        other => panic!("unexpected first event {:?}", other),
    };
    assert!(display.apply(&first));

    let second = next_event(&mut h.events).await.unwrap();
    assert_eq!(
        second,
        Event::Sentiment {
            correlation_id: fyi_id,
            verdict: SentimentVerdict::Positive,
        }
    );
    assert!(display.apply(&second));

    let badges: Vec<String> = display.visible_cards().iter().map(|c| c.badge()).collect();
    // 默认按时间倒序：FYI 那条更新
    assert_eq!(badges, vec!["FYI - Positive".to_string(), "High Impact".to_string()]);
}

#[tokio::test]
async fn test_sentiment_failure_leaves_card_as_fyi() {
    let mut h = harness(
        &[],
        FakeNews::new(vec![("AAPL", Ok(apple_news()))]),
        vec![],
        None,
    );
    let mut display = DisplayState::new(5);

    run(
        &h.app,
        Request::Search {
            query: "aapl".to_string(),
        },
    )
    .await;
    let first = next_event(&mut h.events).await.unwrap();
    assert!(display.apply(&first));

    let late = tokio::time::timeout(Duration::from_millis(200), h.events.recv()).await;
    assert!(late.is_err(), "情绪失败时不应发出任何事件");

    let badges: Vec<String> = display.visible_cards().iter().map(|c| c.badge()).collect();
    assert!(badges.contains(&"FYI".to_string()));
}

#[tokio::test]
async fn test_search_failure_and_empty_are_distinct() {
    let mut h = harness(
        &[],
        FakeNews::new(vec![("TSLA", Err(429))]),
        vec!["broken"],
        Some("neutral"),
    );

    let failed = h.app.pipeline.run("TSLA").await;
    assert_eq!(failed, PipelineResult::Error);

    let unresolved = h.app.pipeline.run("broken").await;
    assert_eq!(unresolved, PipelineResult::Error);

    let empty = h.app.pipeline.run("nvda").await;
    assert_eq!(
        empty,
        PipelineResult::Empty {
            symbol: "NVDA".to_string()
        }
    );

    let mut display = DisplayState::new(5);
    for event in drain(&mut h.events) {
        display.apply(&event);
    }
    assert_eq!(
        display.search_slot(),
        &SearchSlot::Empty {
            query: "nvda".to_string(),
            symbol: "NVDA".to_string()
        }
    );
}

#[tokio::test]
async fn test_blank_search_is_ignored() {
    let mut h = harness(&[], FakeNews::new(vec![]), vec![], None);

    assert!(commands::dispatch(
        &h.app,
        Request::Search {
            query: "   ".to_string()
        }
    )
    .is_none());
    assert!(drain(&mut h.events).is_empty());
    assert!(h.news.calls().is_empty());
}

// ==================== JSON-lines 传输 ====================

#[tokio::test]
async fn test_json_lines_finishes_requests_after_input_closes() {
    let Harness { app, events, .. } = harness(
        &["AAPL"],
        FakeNews::new(vec![("AAPL", Ok(apple_news()))]),
        vec![],
        Some("negative"),
    );
    let input: &[u8] = b"{\"type\":\"search\",\"query\":\"aapl\"}\nnot json\n";
    let (mut client, server) = tokio::io::duplex(64 * 1024);

    tokio::time::timeout(
        Duration::from_secs(5),
        bridge::serve_json_lines_on(app, events, input, server),
    )
    .await
    .expect("transport did not finish")
    .unwrap();

    let mut output = String::new();
    client.read_to_string(&mut output).await.unwrap();
    let events: Vec<Event> = output
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();

    assert!(events.contains(&Event::Watchlist {
        symbols: vec!["AAPL".to_string()]
    }));
    assert!(events
        .iter()
        .any(|e| matches!(e, Event::WatchUpdate { symbol, .. } if symbol == "AAPL")));

    let result_at = events
        .iter()
        .position(|e| matches!(e, Event::SearchResult { for_query, .. } if for_query == "aapl"))
        .expect("search result was not written");
    let sentiment_at = events
        .iter()
        .position(|e| {
            matches!(
                e,
                Event::Sentiment {
                    verdict: SentimentVerdict::Negative,
                    ..
                }
            )
        })
        .expect("sentiment verdict was not written");
    assert!(result_at < sentiment_at);
}
