use chrono::{DateTime, Utc};

use crate::models::news::{ClassifiedArticle, ImpactLabel, SortMode};

/// 可以参与搜索结果排序的条目
pub trait Presentable {
    fn published_at(&self) -> DateTime<Utc>;
    fn label(&self) -> ImpactLabel;
}

impl Presentable for ClassifiedArticle {
    fn published_at(&self) -> DateTime<Utc> {
        self.article.published_at
    }

    fn label(&self) -> ImpactLabel {
        self.label
    }
}

/// 稳定排序：按日期时新的在前；按影响时 High Impact < Neutral < FYI，同级保持原顺序
pub fn sort_for_display<T: Presentable>(items: &[T], mode: SortMode) -> Vec<&T> {
    let mut sorted: Vec<&T> = items.iter().collect();
    match mode {
        SortMode::ByDate => sorted.sort_by(|a, b| b.published_at().cmp(&a.published_at())),
        SortMode::ByImpact => sorted.sort_by_key(|item| item.label().rank()),
    }
    sorted
}

/// 排序后只取前 `limit` 条展示，原始列表保持不动
pub fn visible<T: Presentable>(items: &[T], mode: SortMode, limit: usize) -> Vec<&T> {
    let mut sorted = sort_for_display(items, mode);
    sorted.truncate(limit);
    sorted
}
