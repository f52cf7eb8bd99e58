pub mod app;
pub mod classify;
pub mod client;
pub mod config;
pub mod directory;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod normalize;
pub mod paginate;
pub mod query;
pub mod refresh;
pub mod session;
pub mod state;
pub mod storage;
pub mod timefmt;
pub mod views;

pub use app::router;
pub use client::{PageSource, TaskApiClient};
pub use config::Settings;
pub use paginate::{fetch_all, fetch_all_joined};
pub use state::AppState;
pub use storage::{JsonFileStore, KeyValueStore, MemoryStore};
