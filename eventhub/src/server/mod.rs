//! HTTP server module for the eventhub service.
//!
//! - Application state wiring the core services onto one store
//! - Router configuration

pub mod routes;
pub mod state;

pub use routes::build_router;
pub use state::{AppState, Integrations};
