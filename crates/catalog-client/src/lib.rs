//! Data-access layer for the Cinematch catalog API.
//!
//! [`SessionManager`] owns the token pair and the single-flight refresh,
//! [`RequestExecutor`] issues every call with one transparent refresh-and-retry
//! on 401, [`CatalogApi`] types the endpoints, and [`ListViewCoordinator`]
//! drives the paginated search/filter list.

pub mod catalog;
pub mod config;
pub mod error;
pub mod executor;
pub mod list_view;
pub mod models;
pub mod redact;
pub mod request;
pub mod session;
pub mod storage;

pub use catalog::CatalogApi;
pub use config::ClientConfig;
pub use error::{ApiError, ErrorKind, RefreshError, StorageError};
pub use executor::RequestExecutor;
pub use list_view::{
    FilterField, ListQuery, ListSnapshot, ListUpdate, ListViewCoordinator, MoviePageSource,
    PaginationView, QueryMode,
};
pub use request::{Method, RequestBody, RequestDescriptor};
pub use session::{Session, SessionManager};
pub use storage::{JsonFileStore, KeyValueStore, MemoryStore};

/// `Success(value)` or `Failure(kind, message)` of one executed request.
pub type ResponseOutcome = Result<serde_json::Value, ApiError>;
