mod app_state;
mod secret_manager;

pub use app_state::{AppState, ClientHandles, SESSION_EVENT};
pub use secret_manager::KeyringStore;
