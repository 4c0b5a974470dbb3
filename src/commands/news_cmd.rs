use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::AppState;

/// 搜索一个公司/代码的新闻；空查询忽略。刷新就是再调用一次。
pub fn search(app: &Arc<AppState>, query: String) -> Option<JoinHandle<()>> {
    let query = query.trim().to_string();
    if query.is_empty() {
        return None;
    }

    let pipeline = app.pipeline.clone();
    Some(tokio::spawn(async move {
        pipeline.run(&query).await;
    }))
}
