use std::sync::Arc;

use futures::future::join_all;
use tokio::task::JoinHandle;

use crate::channel::EventSink;
use crate::error::TransportError;
use crate::models::message::Event;
use crate::models::news::{ClassifiedArticle, CorrelationId, ImpactLabel, PipelineResult};
use crate::services::classifier;
use crate::services::news_service::NewsFetcher;
use crate::services::sentiment_service::SentimentEnricher;
use crate::services::symbol_resolver::SymbolResolver;

/// 单次查询：解析代码 -> 拉新闻 -> 分类 -> FYI 情绪补充
pub struct PipelineOrchestrator {
    resolver: SymbolResolver,
    fetcher: NewsFetcher,
    enricher: Arc<SentimentEnricher>,
    sink: EventSink,
}

impl PipelineOrchestrator {
    pub fn new(
        resolver: SymbolResolver,
        fetcher: NewsFetcher,
        enricher: SentimentEnricher,
        sink: EventSink,
    ) -> Self {
        Self {
            resolver,
            fetcher,
            enricher: Arc::new(enricher),
            sink,
        }
    }

    /// 解析 + 拉取 + 分类，不做情绪补充。自选模式也走这里。
    pub async fn retrieve(
        &self,
        query: &str,
    ) -> Result<(String, Vec<ClassifiedArticle>), TransportError> {
        let symbol = self.resolver.resolve(query).await?;
        let articles = self.fetcher.fetch(&symbol).await?;
        let classified = articles
            .into_iter()
            .map(|article| {
                let label = classifier::classify(&article.headline);
                ClassifiedArticle {
                    article,
                    label,
                    correlation_id: None,
                }
            })
            .collect();
        Ok((symbol, classified))
    }

    /// 执行一次搜索并把结果发给展示端。
    ///
    /// 主结果先发出，随后每条 FYI 新闻各自异步请求情绪，结果按
    /// `CorrelationId` 单独回传。返回时所有情绪任务都已结束。
    /// 同一查询重复执行不去重，各自独立完成。
    pub async fn run(&self, query: &str) -> PipelineResult {
        let result = match self.retrieve(query).await {
            Ok((symbol, articles)) if articles.is_empty() => {
                log::info!("no news for {} ({:?})", symbol, query);
                PipelineResult::Empty { symbol }
            }
            Ok((symbol, mut articles)) => {
                for item in articles.iter_mut().filter(|i| i.label == ImpactLabel::Fyi) {
                    item.correlation_id = Some(CorrelationId::mint());
                }
                log::info!("{} articles for {} ({:?})", articles.len(), symbol, query);
                PipelineResult::Articles { symbol, articles }
            }
            Err(e) => {
                log::warn!("news lookup failed for {:?}: {}", query, e);
                PipelineResult::Error
            }
        };

        self.sink.emit(Event::SearchResult {
            for_query: query.to_string(),
            result: result.clone(),
        });

        if let PipelineResult::Articles { articles, .. } = &result {
            for joined in join_all(self.spawn_enrichment(articles)).await {
                if let Err(e) = joined {
                    log::error!("sentiment task for {:?} did not finish: {}", query, e);
                }
            }
        }
        result
    }

    fn spawn_enrichment(&self, articles: &[ClassifiedArticle]) -> Vec<JoinHandle<()>> {
        let mut handles = Vec::new();
        for item in articles {
            let Some(correlation_id) = item.correlation_id else {
                continue;
            };
            let enricher = self.enricher.clone();
            let sink = self.sink.clone();
            let headline = item.article.headline.clone();

            handles.push(tokio::spawn(async move {
                match enricher.enrich(&headline).await {
                    Ok(verdict) => sink.emit(Event::Sentiment {
                        correlation_id,
                        verdict,
                    }),
                    // 卡片保持 FYI
                    Err(e) => log::warn!("sentiment lookup failed for {}: {}", correlation_id, e),
                }
            }));
        }
        handles
    }
}
