use hyper::StatusCode;

/// Everything that can go wrong while answering a wikidiscover request.
#[derive(Debug, thiserror::Error)]
pub enum WikiDiscoverError {
    /// Registry database is not configured, or cannot be reached.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A request parameter has a value the endpoint does not accept.
    #[error("Invalid value for parameter '{param}': {message}")]
    Validation { param: String, message: String },

    /// The registry SELECT itself failed.
    #[error("Storage error: {0}")]
    Storage(#[from] mysql_async::Error),
}

impl WikiDiscoverError {
    pub fn validation(param: &str, message: impl Into<String>) -> Self {
        Self::Validation {
            param: param.to_string(),
            message: message.into(),
        }
    }

    /// Short machine-readable code for the `error.code` field of a response.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "config",
            Self::Validation { .. } => "badvalue",
            Self::Storage(_) => "internal_api_error",
        }
    }

    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Configuration(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type Result<T> = std::result::Result<T, WikiDiscoverError>;
