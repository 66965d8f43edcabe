pub mod app;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod record;
pub mod remote;
pub mod render;
pub mod state;
pub mod stats;
pub mod ui;

pub use app::router;
pub use config::Config;
pub use state::AppState;
