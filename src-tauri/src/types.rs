use catalog_client::models::{ProgressUpdate, ReviewDraft, ReviewType, WatchStatus};
use catalog_client::{ApiError, ErrorKind};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum IpcErrorCode {
    Network,
    Auth,
    Server,
    Protocol,
    NoCredentials,
    Validation,
    Storage,
}

impl From<ErrorKind> for IpcErrorCode {
    fn from(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::Network => Self::Network,
            ErrorKind::Auth => Self::Auth,
            ErrorKind::Server => Self::Server,
            ErrorKind::Protocol => Self::Protocol,
            ErrorKind::NoCredentials => Self::NoCredentials,
            ErrorKind::Validation => Self::Validation,
            ErrorKind::Storage => Self::Storage,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct IpcError {
    pub code: IpcErrorCode,
    pub message: String,
    /// HTTP status for server and auth failures.
    pub status: Option<u16>,
}

impl IpcError {
    pub fn new(code: IpcErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            status: None,
        }
    }
}

impl From<ApiError> for IpcError {
    fn from(err: ApiError) -> Self {
        Self {
            code: err.kind().into(),
            status: err.status(),
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SessionStatus {
    pub authenticated: bool,
}

#[derive(Debug, Clone, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct LoginPayload {
    /// Email or nickname.
    pub login: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct RegisterPayload {
    pub email: String,
    pub nickname: String,
    pub password: String,
}

#[derive(Debug, Clone, Copy, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ProgressPayload {
    #[ts(type = "\"planned\" | \"watching\" | \"completed\" | \"dropped\" | null")]
    pub status: Option<WatchStatus>,
    pub personal_rating: Option<u8>,
}

impl From<ProgressPayload> for ProgressUpdate {
    fn from(payload: ProgressPayload) -> Self {
        Self {
            status: payload.status,
            personal_rating: payload.personal_rating,
        }
    }
}

#[derive(Debug, Clone, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ReviewPayload {
    pub review_text: String,
    #[ts(type = "\"positive\" | \"neutral\" | \"negative\"")]
    pub review_type: ReviewType,
}

impl From<ReviewPayload> for ReviewDraft {
    fn from(payload: ReviewPayload) -> Self {
        Self {
            review_text: payload.review_text,
            review_type: payload.review_type,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SettingsState {
    pub api_base_url: String,
    pub request_timeout_seconds: u32,
    pub page_size: u32,
    pub keyring_available: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SaveSettingsPayload {
    pub api_base_url: String,
    pub request_timeout_seconds: u32,
    pub page_size: u32,
}
