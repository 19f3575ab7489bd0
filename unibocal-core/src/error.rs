use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV parsing failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("Date/time parsing failed: {0}")]
    DateTime(#[from] chrono::ParseError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Upstream error: {source_name} - {message}")]
    Upstream {
        source_name: String,
        message: String,
    },

    #[error("Malformed upstream data: {0}")]
    Malformed(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Network timeout")]
    Timeout,

    #[error("Internal error: {0}")]
    Internal(String),
}

/// 错误分类，供上层决定如何呈现
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// 上游不可达（网络/HTTP 失败）
    Upstream,
    /// 上游数据格式异常
    Malformed,
    /// 请求的资源不存在
    NotFound,
    /// 请求参数校验失败
    InvalidRequest,
    Internal,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Http(_) | Error::Timeout | Error::Upstream { .. } => ErrorKind::Upstream,
            Error::Json(_) | Error::Csv(_) | Error::DateTime(_) | Error::Malformed(_) => {
                ErrorKind::Malformed
            }
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::InvalidRequest(_) => ErrorKind::InvalidRequest,
            Error::Io(_) | Error::Config(_) | Error::Internal(_) => ErrorKind::Internal,
        }
    }

    /// 是否应当作为客户端错误（404/400）返回
    pub fn is_client_error(&self) -> bool {
        matches!(self.kind(), ErrorKind::NotFound | ErrorKind::InvalidRequest)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
