//! HTTP adapters - REST API implementations.

pub mod generation;
pub mod middleware;

pub use generation::{app_router, GenerationAppState};
