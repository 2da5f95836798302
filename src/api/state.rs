//! Shared application state for HTTP handlers

use std::sync::Arc;

use crate::session::BakeSession;

/// State handed to every handler through `State<Arc<AppState>>`
pub struct AppState {
    /// Bake operations
    pub session: Arc<BakeSession>,
}

impl AppState {
    pub fn new(session: Arc<BakeSession>) -> Self {
        Self { session }
    }
}
