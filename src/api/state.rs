//! Application state shared across handlers.

use std::sync::Arc;

use crate::bridge::SessionBridge;

/// Shared, read-only state: the bridge itself. Conversations share nothing
/// else.
#[derive(Clone)]
pub struct AppState {
    pub bridge: Arc<SessionBridge>,
}

impl AppState {
    pub fn new(bridge: SessionBridge) -> Self {
        Self {
            bridge: Arc::new(bridge),
        }
    }
}
