//! Reusable HTTP handlers.

pub mod health;
pub mod websocket;

pub use health::{health_check, readiness_check};
