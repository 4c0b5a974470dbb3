pub mod classifier;
pub mod news_service;
pub mod pipeline;
pub mod presentation;
pub mod sentiment_service;
pub mod symbol_resolver;
pub mod watchlist_service;
