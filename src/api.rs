//! HTTP surface
//!
//! Thin transport over the engine: sessions are created and driven
//! through JSON endpoints, and the timeline/replay endpoints expose the
//! audit surface. All orchestration semantics live in `engine`.

mod handlers;
mod types;

pub use handlers::create_router;

use crate::engine::Engine;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
}

impl AppState {
    pub fn new(engine: Engine) -> Self {
        Self {
            engine: Arc::new(engine),
        }
    }
}
