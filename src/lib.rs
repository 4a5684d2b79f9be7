pub mod config;
pub mod docs;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod ws;

use std::sync::Arc;

use ws::mutation::MessagePolicy;
use ws::store::SessionStore;

pub use routes::build_app;

/// State shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<SessionStore>,
    pub policy: MessagePolicy,
}

impl AppState {
    pub fn new(store: Arc<SessionStore>, policy: MessagePolicy) -> Self {
        Self { store, policy }
    }
}
