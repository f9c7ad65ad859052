use std::sync::Arc;

use careloop_notify::DeviceNotifier;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: careloop_db::DbPool,
    /// Server configuration (accessed by middleware and handlers).
    pub config: Arc<ServerConfig>,
    /// Device trigger relay. `None` when the push gateway is not
    /// configured; dose endpoints then skip trigger scheduling.
    pub notifier: Option<Arc<dyn DeviceNotifier>>,
}
