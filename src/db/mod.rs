pub mod database;

use anyhow::Result;

/// 按键存取不透明字符串的持久化存储
pub trait BlobStore: Send + Sync {
    fn get_blob(&self, key: &str) -> Result<Option<String>>;
    fn put_blob(&self, key: &str, data: &str) -> Result<()>;
}
