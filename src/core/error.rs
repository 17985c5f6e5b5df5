use thiserror::Error;

/// 列表引擎错误类型
#[derive(Error, Debug)]
pub enum ListingError {
    #[error("数据加载失败: {path} - {message}")]
    DataLoadError {
        path: String,
        message: String,
    },

    #[error("查询失败: {message}")]
    QueryError {
        message: String,
    },

    #[error("模板渲染失败: {0}")]
    RenderError(#[from] tera::Error),

    #[error("请求失败: {message}")]
    FetchError {
        message: String,
    },

    #[error("配置错误: {message}")]
    ConfigError {
        message: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for ListingError {
    fn from(err: reqwest::Error) -> Self {
        ListingError::FetchError {
            message: err.to_string(),
        }
    }
}

pub type ListingResult<T> = std::result::Result<T, ListingError>;
