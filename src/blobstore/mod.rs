mod object;

pub use object::ObjectBlobStore;

use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    // 对象不存在，清理时视为删除成功
    #[error("blob not found: {0}")]
    NotFound(String),
    // 网络抖动、限流等，下次运行可能成功
    #[error("transient blob store error: {0}")]
    Transient(String),
    // 权限、路径等无法自行恢复的错误
    #[error("permanent blob store error: {0}")]
    Permanent(String),
}

pub type BlobResult<T> = std::result::Result<T, BlobError>;

/// 以键寻址的持久化对象存储，存放导出文件的内容。
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// 删除一个对象。失败仅针对这一个键。
    async fn delete(&self, key: &str) -> BlobResult<()>;
}
