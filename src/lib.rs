use std::sync::Arc;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
pub type DbPool = Pool<SqliteConnectionManager>;

use helper::upload_helpers::MediaHost;

/// Shared, read-only server state.
pub struct AppState {
    pub media_host: Arc<dyn MediaHost>,
    /// Maximum number of activity entries kept.
    pub activity_limit: u32,
    pub max_upload_mb: u64,
}

pub mod client;
pub mod config;
pub mod helper;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod setup;
