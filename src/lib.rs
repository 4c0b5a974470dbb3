pub mod bridge;
pub mod channel;
pub mod commands;
pub mod db;
pub mod display;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

use std::path::PathBuf;
use std::sync::Arc;

use channel::EventSink;
use db::database::Database;
use db::BlobStore;
use models::settings::AppSettings;
use services::news_service::{FinnhubNewsSource, NewsFetcher, NewsSource};
use services::pipeline::PipelineOrchestrator;
use services::sentiment_service::{SentimHttpSource, SentimentEnricher, SentimentSource};
use services::symbol_resolver::{FinnhubSymbolSearch, SymbolResolver, SymbolSearch};
use services::watchlist_service::{WatchlistOrchestrator, WatchlistStore};

#[derive(Debug, clap::Parser)]
#[command(name = "portfolio-insights")]
#[command(about = "Company news lookup with impact tags and a watchlist of high-impact updates")]
pub struct RunOptions {
    /// Directory holding the SQLite database
    #[arg(long, default_value = "./data")]
    pub data_dir: PathBuf,

    /// Finnhub API token, overrides the stored setting
    #[arg(long, env = "FINNHUB_TOKEN")]
    pub token: Option<String>,

    /// json: JSON lines on stdin/stdout; console: text commands with rendered output
    #[arg(long, value_enum, default_value_t = Mode::Json)]
    pub mode: Mode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Mode {
    Json,
    Console,
}

/// 外部服务
pub struct Collaborators {
    pub search: Arc<dyn SymbolSearch>,
    pub news: Arc<dyn NewsSource>,
    pub sentiment: Arc<dyn SentimentSource>,
}

impl Collaborators {
    pub fn http(settings: &AppSettings) -> anyhow::Result<Self> {
        Ok(Self {
            search: Arc::new(FinnhubSymbolSearch::new(settings)?),
            news: Arc::new(FinnhubNewsSource::new(settings)?),
            sentiment: Arc::new(SentimHttpSource::new(settings)?),
        })
    }
}

pub struct AppState {
    pub settings: AppSettings,
    pub pipeline: Arc<PipelineOrchestrator>,
    pub watchlist: Arc<WatchlistOrchestrator>,
}

impl AppState {
    pub fn new(
        settings: AppSettings,
        blobs: Arc<dyn BlobStore>,
        collaborators: Collaborators,
        sink: EventSink,
    ) -> Self {
        let pipeline = Arc::new(PipelineOrchestrator::new(
            SymbolResolver::new(collaborators.search),
            NewsFetcher::new(collaborators.news, settings.news_window_days),
            SentimentEnricher::new(collaborators.sentiment),
            sink.clone(),
        ));
        let store = Arc::new(WatchlistStore::load(blobs));
        let watchlist = Arc::new(WatchlistOrchestrator::new(store, pipeline.clone(), sink));

        Self {
            settings,
            pipeline,
            watchlist,
        }
    }
}

pub fn run(options: RunOptions) -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(serve(options))
}

async fn serve(options: RunOptions) -> anyhow::Result<()> {
    let database = Arc::new(Database::new(options.data_dir.clone())?);
    let mut settings = database.load_settings()?;
    if let Some(token) = options.token.filter(|t| !t.trim().is_empty()) {
        settings.finnhub_token = token.trim().to_string();
    }
    if settings.finnhub_token.is_empty() {
        log::warn!("no Finnhub token configured, lookups will be rejected upstream");
    }

    let (sink, events) = EventSink::channel();
    let collaborators = Collaborators::http(&settings)?;
    let app = Arc::new(AppState::new(settings, database, collaborators, sink));
    log::info!(
        "data dir {}, {} watched symbols, mode {:?}",
        options.data_dir.display(),
        app.watchlist.store().symbols().len(),
        options.mode
    );

    match options.mode {
        Mode::Json => bridge::serve_json_lines(app, events).await,
        Mode::Console => bridge::serve_console(app, events).await,
    }
}
