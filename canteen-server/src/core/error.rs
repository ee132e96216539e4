use thiserror::Error;

use crate::store::StoreError;
use crate::utils::AppError;

/// 启动与运行期的致命错误
///
/// 只有打开配置的存储失败、端口绑定失败这类问题会走到这里；
/// 业务错误一律是 [`AppError`]。
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("配置错误: {0}")]
    Config(AppError),

    #[error("存储初始化失败: {0}")]
    Store(#[from] StoreError),

    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("内部服务器错误")]
    Internal(#[from] anyhow::Error),
}

impl From<AppError> for ServerError {
    fn from(err: AppError) -> Self {
        ServerError::Config(err)
    }
}

/// 服务器启动的 Result 类型别名
pub type Result<T> = std::result::Result<T, ServerError>;
