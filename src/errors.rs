use std::time::Duration;

use crate::repository::RepoError;

pub type Result<T> = std::result::Result<T, Error>;

// 错误分类：
//  - 配置错误：缺少数据库或对象存储、配置值非法，阻止服务创建
//  - 列举错误：无法枚举过期批次，整次运行失败
//  - 单个批次的删除错误不在此列，它们被收集进 CleanupOutcome
// 沿用的 HTTP 状态码：
//  - 401: 未授权
//  - 409: 已有清理任务在运行
//  - 其余错误一律映射到 HTTP 500

#[derive(Debug, thiserror::Error, strum_macros::EnumProperty)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Error {
    // 环境中缺少数据库
    #[error("missing database in server environment")]
    MissingDatabase,
    // 环境中缺少对象存储
    #[error("missing blobstore in server environment")]
    MissingBlobstore,
    // 配置值非法
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    // 无法列举过期批次
    #[error("failed to list expired export batches: {0}")]
    Listing(#[source] RepoError),
    // 超过单次调用的执行时限
    #[error("export cleanup did not finish within {0:?}")]
    Timeout(Duration),
    // 已有清理任务在运行
    #[strum(props(status_code = 409))]
    #[error("an export cleanup is already in progress")]
    CleanupInProgress,
    // 未授权
    #[strum(props(status_code = 401))]
    #[error("unauthorized access")]
    Unauthorized,
    // 内部通用错误
    #[error("internal error: {0}")]
    Internal(String),
    // 包装 crate::keys::KeyError
    #[error("key error: {0}")]
    Key(#[from] crate::keys::KeyError),
    // 包装 tokio 的 JoinError
    #[error("task join error: {0}")]
    TokioTaskJoin(#[from] tokio::task::JoinError),
    // 包装 std::io::Error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    // 包装 sqlx::Error
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    // 包装 sqlx 的迁移错误
    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
    // 包装 object_store::Error
    #[error("object store error: {0}")]
    ObjectStore(#[from] object_store::Error),
    // 包装 url::ParseError
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
    // 包装 JobSchedulerError
    #[error("job scheduler error: {0}")]
    JobScheduler(#[from] tokio_cron_scheduler::JobSchedulerError),
}

impl Error {
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::MissingDatabase | Error::MissingBlobstore | Error::InvalidConfig(_)
        )
    }
}

#[macro_export]
macro_rules! fail {
    ($msg:expr) => {
        $crate::errors::Error::Internal(format!($msg))
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::errors::Error::Internal(format!($fmt, $($arg)*))
    };
}

#[macro_export]
macro_rules! err {
    ($msg:expr) => {
        Err($crate::fail!($msg))
    };
    ($fmt:expr, $($arg:tt)*) => {
        Err($crate::fail!($fmt, $($arg)*))
    };
}
