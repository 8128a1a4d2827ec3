mod app;
mod commands;
mod settings;
mod state;
pub mod types;

pub fn run() {
    app::run();
}
