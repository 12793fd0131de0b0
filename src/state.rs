use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::config::AppConfig;

/// Shared application state. The connection mutex doubles as the critical
/// section for booking writes: a handler holds the guard across the
/// availability check and the insert or status update, so no other request
/// can slip a conflicting row in between.
pub struct AppState {
    pub db: Arc<Mutex<Connection>>,
    pub config: AppConfig,
}
