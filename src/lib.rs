pub mod auth;
pub mod chat;
pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod rooms;
pub mod session;

use axum::extract::FromRef;
use sqlx::SqlitePool;

pub use error::{ApiError, AppResult};

/// Shared server state, constructed once in `main` and cloned into every
/// handler. The chat registries live here so nothing hangs off a global.
#[derive(Clone, FromRef)]
pub struct AppState {
    pub db_pool: SqlitePool,
    pub chat: chat::ChatState,
}
