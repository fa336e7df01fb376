//! MUSIC management and sidecar-to-sidecar HTTP API.
pub mod dto;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;

pub use routes::{create_management_routes, create_sync_routes};
pub use state::AppState;
