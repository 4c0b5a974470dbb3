use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::AppState;

pub fn refresh(app: &Arc<AppState>) -> Option<JoinHandle<()>> {
    let watchlist = app.watchlist.clone();
    Some(tokio::spawn(async move {
        watchlist.refresh_tracked().await;
    }))
}

/// 新增成功后只刷新新加的代码，其他槽位不动
pub fn add(app: &Arc<AppState>, symbol: String) -> Option<JoinHandle<()>> {
    let symbol = symbol.trim().to_string();
    match app.watchlist.add(&symbol) {
        Ok(true) => {
            log::info!("watching {}", symbol);
            let watchlist = app.watchlist.clone();
            Some(tokio::spawn(async move {
                watchlist.refresh_all(&[symbol]).await;
            }))
        }
        Ok(false) => None,
        Err(e) => {
            log::error!("failed to save watchlist after adding {}: {}", symbol, e);
            None
        }
    }
}

pub fn remove(app: &Arc<AppState>, symbol: String) -> Option<JoinHandle<()>> {
    match app.watchlist.remove(&symbol) {
        Ok(true) => log::info!("stopped watching {}", symbol.trim()),
        Ok(false) => {}
        Err(e) => log::error!("failed to save watchlist after removing {}: {}", symbol, e),
    }
    None
}

pub fn clear(app: &Arc<AppState>) -> Option<JoinHandle<()>> {
    if let Err(e) = app.watchlist.clear() {
        log::error!("failed to save cleared watchlist: {}", e);
    }
    None
}
