//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (identifiers, errors, auth types)
//! - `generation` - Generation requests, task state, progress and webhook verification

pub mod foundation;
pub mod generation;
