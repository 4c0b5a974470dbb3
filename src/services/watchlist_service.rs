use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::Result;
use futures::future::join_all;

use crate::channel::EventSink;
use crate::db::BlobStore;
use crate::models::message::Event;
use crate::models::news::{ClassifiedArticle, ImpactLabel};
use crate::models::watchlist::{parse_watchlist_blob, WatchHeadline, WATCHLIST_KEY};
use crate::services::pipeline::PipelineOrchestrator;

/// 自选列表：有序、无重复，内存与持久化副本在同一把锁内更新
pub struct WatchlistStore {
    symbols: Mutex<Vec<String>>,
    blobs: Arc<dyn BlobStore>,
}

impl WatchlistStore {
    /// 启动时读取一次；数据缺失或损坏都按空列表处理
    pub fn load(blobs: Arc<dyn BlobStore>) -> Self {
        let symbols = match blobs.get_blob(WATCHLIST_KEY) {
            Ok(Some(data)) => parse_watchlist_blob(&data).unwrap_or_else(|e| {
                log::warn!("stored watchlist is corrupt, starting empty: {}", e);
                Vec::new()
            }),
            Ok(None) => Vec::new(),
            Err(e) => {
                log::warn!("failed to read stored watchlist, starting empty: {}", e);
                Vec::new()
            }
        };
        Self {
            symbols: Mutex::new(symbols),
            blobs,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<String>> {
        self.symbols.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn symbols(&self) -> Vec<String> {
        self.lock().clone()
    }

    /// 已存在或为空时返回 `Ok(false)`，不写存储
    pub fn add(&self, symbol: &str) -> Result<bool> {
        let symbol = symbol.trim();
        if symbol.is_empty() {
            return Ok(false);
        }
        let mut guard = self.lock();
        if guard.iter().any(|s| s == symbol) {
            return Ok(false);
        }
        let mut next = guard.clone();
        next.push(symbol.to_string());
        self.commit(&mut guard, next)?;
        Ok(true)
    }

    pub fn remove(&self, symbol: &str) -> Result<bool> {
        let symbol = symbol.trim();
        let mut guard = self.lock();
        if !guard.iter().any(|s| s == symbol) {
            return Ok(false);
        }
        let next: Vec<String> = guard.iter().filter(|s| *s != symbol).cloned().collect();
        self.commit(&mut guard, next)?;
        Ok(true)
    }

    pub fn clear(&self) -> Result<()> {
        let mut guard = self.lock();
        self.commit(&mut guard, Vec::new())
    }

    // 先落盘再改内存，写失败时内存保持原样
    fn commit(&self, guard: &mut MutexGuard<'_, Vec<String>>, next: Vec<String>) -> Result<()> {
        let data = serde_json::to_string(&next)?;
        self.blobs.put_blob(WATCHLIST_KEY, &data)?;
        **guard = next;
        Ok(())
    }
}

/// 从一次抓取中挑出要展示的那一条：抓取顺序中第一条 High Impact
pub fn select_headline(articles: &[ClassifiedArticle]) -> WatchHeadline {
    articles
        .iter()
        .find(|item| item.label == ImpactLabel::HighImpact)
        .map(|item| WatchHeadline::Article(item.article.clone()))
        .unwrap_or(WatchHeadline::NoHighImpact)
}

/// 自选模式：对每个代码独立跑一次流水线，单个失败不影响其他代码
pub struct WatchlistOrchestrator {
    store: Arc<WatchlistStore>,
    pipeline: Arc<PipelineOrchestrator>,
    sink: EventSink,
}

impl WatchlistOrchestrator {
    pub fn new(store: Arc<WatchlistStore>, pipeline: Arc<PipelineOrchestrator>, sink: EventSink) -> Self {
        Self { store, pipeline, sink }
    }

    pub fn store(&self) -> &WatchlistStore {
        &self.store
    }

    /// 发送当前列表快照，展示端据此增删槽位
    pub fn publish_watchlist(&self) {
        self.sink.emit(Event::Watchlist {
            symbols: self.store.symbols(),
        });
    }

    /// 每个代码完成后立即发出各自的更新，完成顺序不定
    pub async fn refresh_all(&self, watchlist: &[String]) {
        join_all(watchlist.iter().map(|symbol| self.refresh_one(symbol))).await;
    }

    pub async fn refresh_tracked(&self) {
        self.publish_watchlist();
        let symbols = self.store.symbols();
        self.refresh_all(&symbols).await;
    }

    async fn refresh_one(&self, symbol: &str) {
        match self.pipeline.retrieve(symbol).await {
            Ok((resolved, articles)) => {
                let headline = select_headline(&articles);
                log::debug!(
                    "watch {} -> {} ({} articles, high impact: {})",
                    symbol,
                    resolved,
                    articles.len(),
                    matches!(headline, WatchHeadline::Article(_))
                );
                self.sink.emit(Event::WatchUpdate {
                    symbol: symbol.to_string(),
                    headline,
                });
            }
            // 槽位保持原状态
            Err(e) => log::warn!("watch refresh failed for {}: {}", symbol, e),
        }
    }

    /// 新增后由调用方只刷新这一个代码
    pub fn add(&self, symbol: &str) -> Result<bool> {
        let added = self.store.add(symbol)?;
        if added {
            self.publish_watchlist();
        }
        Ok(added)
    }

    pub fn remove(&self, symbol: &str) -> Result<bool> {
        let removed = self.store.remove(symbol)?;
        if removed {
            self.publish_watchlist();
        }
        Ok(removed)
    }

    pub fn clear(&self) -> Result<()> {
        self.store.clear()?;
        self.publish_watchlist();
        Ok(())
    }
}
