pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use std::sync::Arc;

use config::Config;
use db::ChoreStore;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ChoreStore>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(store: Arc<dyn ChoreStore>, config: Config) -> Self {
        Self {
            store,
            config: Arc::new(config),
        }
    }
}
