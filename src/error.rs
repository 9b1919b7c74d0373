use crate::models::ResponseBody;
use thiserror::Error;

/// Client error types
#[derive(Error, Debug)]
pub enum DynRestError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON serialization/deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("URL parsing failed: {0}")]
    Url(#[from] url::ParseError),

    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// 401/403 from the server. The session has already been cleared.
    #[error("Unauthorized")]
    Unauthorized { status: u16, data: ResponseBody },

    #[error("{message}")]
    RequestFailed {
        status: u16,
        message: String,
        code: Option<String>,
        data: ResponseBody,
    },

    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    #[error("Token storage failed: {0}")]
    Storage(String),

    #[error("I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for client operations
pub type DynRestResult<T> = Result<T, DynRestError>;

impl DynRestError {
    /// Create a configuration error
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Create a request failure from a status and message
    pub fn request_failed(status: u16, message: impl Into<String>) -> Self {
        Self::RequestFailed {
            status,
            message: message.into(),
            code: None,
            data: ResponseBody::NoContent,
        }
    }

    /// Create a storage error
    pub fn storage_error(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    /// Stable error class name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Unauthorized { .. } => "Unauthorized",
            Self::RequestFailed { .. } => "RequestFailed",
            Self::Configuration(_) => "ConfigurationError",
            Self::Http(_) => "HttpError",
            Self::Json(_) => "JsonError",
            Self::Url(_) => "UrlError",
            Self::InvalidHeader(_) => "InvalidHeader",
            Self::Storage(_) | Self::Io(_) => "StorageError",
        }
    }

    /// HTTP status carried by the error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized { status, .. } | Self::RequestFailed { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Machine-readable error code
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Unauthorized { .. } => Some("unauthorized"),
            Self::RequestFailed { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    /// Parsed response body that accompanied the failure
    pub fn data(&self) -> Option<&ResponseBody> {
        match self {
            Self::Unauthorized { data, .. } | Self::RequestFailed { data, .. } => Some(data),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }
}
