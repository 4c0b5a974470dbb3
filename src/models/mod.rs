pub mod message;
pub mod news;
pub mod settings;
pub mod watchlist;
