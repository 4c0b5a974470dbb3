pub mod news_cmd;
pub mod watchlist_cmd;

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::models::message::Request;
use crate::AppState;

/// 处理展示端发来的一条请求。
///
/// 自选列表的增删在这里同步完成，网络请求放到后台任务中，
/// 返回该任务的句柄（没有后台任务时为 `None`）。
pub fn dispatch(app: &Arc<AppState>, request: Request) -> Option<JoinHandle<()>> {
    log::debug!("request: {:?}", request);
    match request {
        Request::Search { query } => news_cmd::search(app, query),
        Request::WatchRefresh => watchlist_cmd::refresh(app),
        Request::WatchAdd { symbol } => watchlist_cmd::add(app, symbol),
        Request::WatchRemove { symbol } => watchlist_cmd::remove(app, symbol),
        Request::WatchClear => watchlist_cmd::clear(app),
    }
}
