mod auth;
mod catalog;
mod list;
mod settings;

pub use auth::*;
pub use catalog::*;
pub use list::*;
pub use settings::*;

use crate::types::IpcError;

pub(crate) type CommandResult<T> = Result<T, IpcError>;
