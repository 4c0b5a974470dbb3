//! Display-side consumer of backend events.
//!
//! Holds the state a rendering layer needs and decides whether an incoming
//! event still has a live slot to land in. Events whose tag matches nothing
//! (a removed watch symbol, a card from an older search) are dropped.

use chrono::{DateTime, Utc};

use crate::models::message::Event;
use crate::models::news::{
    Article, ClassifiedArticle, CorrelationId, ImpactLabel, PipelineResult, SentimentVerdict,
    SortMode,
};
use crate::models::watchlist::WatchHeadline;
use crate::services::presentation::{self, Presentable};

#[derive(Debug, Clone, PartialEq)]
pub struct Card {
    pub item: ClassifiedArticle,
    pub verdict: Option<SentimentVerdict>,
}

impl Card {
    pub fn badge(&self) -> String {
        match (self.item.label, self.verdict) {
            (ImpactLabel::Fyi, Some(verdict)) => {
                let name = verdict.to_string();
                format!("FYI - {}{}", name[..1].to_uppercase(), &name[1..])
            }
            (label, _) => label.display_name().to_string(),
        }
    }
}

impl Presentable for Card {
    fn published_at(&self) -> DateTime<Utc> {
        self.item.article.published_at
    }

    fn label(&self) -> ImpactLabel {
        self.item.label
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SearchSlot {
    Idle,
    Loading { query: String },
    Results { query: String, symbol: String, cards: Vec<Card> },
    Empty { query: String, symbol: String },
    Failed { query: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum WatchSlot {
    Pending,
    Headline(Article),
    NoHighImpact,
}

pub struct DisplayState {
    search: SearchSlot,
    sort_mode: SortMode,
    max_visible: usize,
    watch: Vec<(String, WatchSlot)>,
}

impl DisplayState {
    pub fn new(max_visible: usize) -> Self {
        Self {
            search: SearchSlot::Idle,
            sort_mode: SortMode::default(),
            max_visible,
            watch: Vec::new(),
        }
    }

    pub fn begin_search(&mut self, query: &str) {
        self.search = SearchSlot::Loading {
            query: query.to_string(),
        };
    }

    pub fn clear_search(&mut self) {
        self.search = SearchSlot::Idle;
    }

    pub fn search_slot(&self) -> &SearchSlot {
        &self.search
    }

    pub fn sort_mode(&self) -> SortMode {
        self.sort_mode
    }

    /// 只改变展示顺序，不触发任何请求
    pub fn set_sort_mode(&mut self, mode: SortMode) {
        self.sort_mode = mode;
    }

    pub fn visible_cards(&self) -> Vec<&Card> {
        match &self.search {
            SearchSlot::Results { cards, .. } => {
                presentation::visible(cards, self.sort_mode, self.max_visible)
            }
            _ => Vec::new(),
        }
    }

    pub fn watch_slots(&self) -> &[(String, WatchSlot)] {
        &self.watch
    }

    pub fn watch_slot(&self, symbol: &str) -> Option<&WatchSlot> {
        self.watch.iter().find(|(s, _)| s == symbol).map(|(_, slot)| slot)
    }

    /// Returns `false` when the event had no live slot and was dropped.
    pub fn apply(&mut self, event: &Event) -> bool {
        let applied = match event {
            Event::SearchResult { for_query, result } => {
                self.apply_search(for_query, result);
                true
            }
            Event::WatchUpdate { symbol, headline } => self.apply_watch(symbol, headline),
            Event::Sentiment {
                correlation_id,
                verdict,
            } => self.apply_sentiment(*correlation_id, *verdict),
            Event::Watchlist { symbols } => {
                self.reconcile_watch(symbols);
                true
            }
        };
        if !applied {
            log::debug!("dropping event with no live slot: {:?}", event);
        }
        applied
    }

    // 后到的搜索结果直接覆盖
    fn apply_search(&mut self, query: &str, result: &PipelineResult) {
        let query = query.to_string();
        self.search = match result {
            PipelineResult::Articles { symbol, articles } => SearchSlot::Results {
                query,
                symbol: symbol.clone(),
                cards: articles
                    .iter()
                    .map(|item| Card {
                        item: item.clone(),
                        verdict: None,
                    })
                    .collect(),
            },
            PipelineResult::Empty { symbol } => SearchSlot::Empty {
                query,
                symbol: symbol.clone(),
            },
            PipelineResult::Error => SearchSlot::Failed { query },
        };
    }

    fn apply_watch(&mut self, symbol: &str, headline: &WatchHeadline) -> bool {
        let Some((_, slot)) = self.watch.iter_mut().find(|(s, _)| s == symbol) else {
            return false;
        };
        *slot = match headline {
            WatchHeadline::Article(article) => WatchSlot::Headline(article.clone()),
            WatchHeadline::NoHighImpact => WatchSlot::NoHighImpact,
        };
        true
    }

    fn apply_sentiment(&mut self, id: CorrelationId, verdict: SentimentVerdict) -> bool {
        let SearchSlot::Results { cards, .. } = &mut self.search else {
            return false;
        };
        match cards.iter_mut().find(|c| c.item.correlation_id == Some(id)) {
            Some(card) => {
                card.verdict = Some(verdict);
                true
            }
            None => false,
        }
    }

    /// 按快照增删槽位，已有代码保留原状态
    fn reconcile_watch(&mut self, symbols: &[String]) {
        let mut previous = std::mem::take(&mut self.watch);
        self.watch = symbols
            .iter()
            .map(|symbol| match previous.iter().position(|(s, _)| s == symbol) {
                Some(idx) => previous.swap_remove(idx),
                None => (symbol.clone(), WatchSlot::Pending),
            })
            .collect();
    }

    /// 控制台模式下的纯文本渲染
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str("== Search ==\n");
        match &self.search {
            SearchSlot::Idle => out.push_str("Highlight text or search to fetch news\n"),
            SearchSlot::Loading { query } => out.push_str(&format!("Fetching {} ...\n", query)),
            SearchSlot::Failed { .. } => out.push_str("Error fetching news.\n"),
            SearchSlot::Empty { symbol, .. } => out.push_str(&format!("No news found for {}.\n", symbol)),
            SearchSlot::Results { symbol, cards, .. } => {
                out.push_str(&format!(
                    "{} ({} articles, sorted by {:?})\n",
                    symbol,
                    cards.len(),
                    self.sort_mode
                ));
                for card in self.visible_cards() {
                    out.push_str(&format!(
                        "  [{}] {}  {}\n      {}\n",
                        card.badge(),
                        card.item.article.headline,
                        card.item.article.published_at.format("%Y-%m-%d %H:%M"),
                        card.item.article.url
                    ));
                }
            }
        }

        out.push_str("== Updates ==\n");
        if self.watch.is_empty() {
            out.push_str("Add companies to watch for high-impact updates\n");
        }
        for (symbol, slot) in &self.watch {
            match slot {
                WatchSlot::Pending => out.push_str(&format!("  {}: loading ...\n", symbol)),
                WatchSlot::NoHighImpact => out.push_str(&format!("  {}: no high-impact news.\n", symbol)),
                WatchSlot::Headline(article) => out.push_str(&format!(
                    "  {}: [High Impact] {}\n      {}\n",
                    symbol, article.headline, article.url
                )),
            }
        }
        out
    }
}
