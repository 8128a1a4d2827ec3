use serde::Serialize;
use thiserror::Error;

/// Flat classification of an [`ApiError`], stable across the IPC boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Network,
    Auth,
    Server,
    Protocol,
    NoCredentials,
    Validation,
    Storage,
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage contains invalid json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("storage backend failed: {0}")]
    Backend(String),
}

/// Outcome of a refresh cycle. `Clone` because every caller waiting on the
/// same in-flight refresh observes the same settled value.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RefreshError {
    #[error("no refresh token is stored")]
    NoCredentials,
    #[error("token refresh failed: {0}")]
    RefreshFailed(String),
}

#[derive(Debug, Error)]
pub enum ApiError {
    /// No response was obtained. Never retried automatically.
    #[error("network error: {0}")]
    Network(String),
    /// 401 that survived one refresh-and-retry, or the refresh itself failed.
    /// The session has been cleared by the time this is returned.
    #[error("authentication required: {0}")]
    Auth(String),
    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },
    /// 2xx response whose body could not be understood.
    #[error("unexpected response: {0}")]
    Protocol(String),
    #[error("no refresh token is stored")]
    NoCredentials,
    #[error("invalid input: {0}")]
    Validation(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Network(_) => ErrorKind::Network,
            Self::Auth(_) => ErrorKind::Auth,
            Self::Server { .. } => ErrorKind::Server,
            Self::Protocol(_) => ErrorKind::Protocol,
            Self::NoCredentials => ErrorKind::NoCredentials,
            Self::Validation(_) => ErrorKind::Validation,
            Self::Storage(_) => ErrorKind::Storage,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Server { status, .. } => Some(*status),
            Self::Auth(_) => Some(401),
            _ => None,
        }
    }
}

impl From<RefreshError> for ApiError {
    fn from(err: RefreshError) -> Self {
        match err {
            RefreshError::NoCredentials => Self::NoCredentials,
            RefreshError::RefreshFailed(reason) => Self::Auth(reason),
        }
    }
}
