//! HTTP API module.
//!
//! Exposes the bridge over `/mcp` plus the health endpoint.

mod error;
mod handlers;
mod routes;
mod state;

pub use error::{ApiError, ApiResult, ErrorResponse};
pub use routes::create_router;
pub use state::AppState;
