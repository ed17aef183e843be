//! HTTP server: router, shared state, and health endpoints.

mod health;
mod routes;
pub mod state;

pub use routes::build_router;
pub use state::AppState;
