//! Foundation module - Shared domain primitives.
//!
//! Contains value objects, identifiers and error types
//! that form the vocabulary of the orchestrator domain.

mod auth;
mod errors;
mod ids;
mod percentage;

pub use auth::{AuthError, AuthenticatedUser};
pub use errors::ValidationError;
pub use ids::{TaskId, UserId};
pub use percentage::Percentage;
