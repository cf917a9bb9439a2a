//! Adapters - Implementations of port interfaces.
//!
//! - `auth` - Session validators (JWT, mock)
//! - `client` - HTTP task status source used by the poller
//! - `http` - Axum REST API
//! - `ledger` - Credit ledgers (in-memory, profile store)
//! - `provider` - Generation providers (HTTP, mock)
//! - `task_store` - Webhook payload store

pub mod auth;
pub mod client;
pub mod http;
pub mod ledger;
pub mod provider;
pub mod task_store;
