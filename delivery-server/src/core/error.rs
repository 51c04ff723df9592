use shared::error::AppError;
use thiserror::Error;

/// 服务器启动/运行错误
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("配置错误: {0}")]
    Config(String),

    #[error("数据库错误: {0}")]
    Database(#[from] AppError),

    #[error("网络错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("内部服务器错误: {0}")]
    Internal(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, ServerError>;

/// 领域错误分类，决定对外暴露的 HTTP 语义
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// 并发抢单、重复使用配送码 (409)
    Conflict,
    /// 积分不足、等级不符、坐标非法 (400)
    Validation,
    /// 订单 / 配送单 / 配送码不存在 (404)
    NotFound,
    /// 身份或归属不符 (403)
    Forbidden,
    /// 熵源耗尽、存储不可用 (5xx)
    Fatal,
}
