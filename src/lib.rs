//! Gen Orchestrator - Asynchronous image generation orchestration
//!
//! This crate meters generation requests against a per-user credit balance,
//! dispatches them to an external generation provider, ingests the provider's
//! completion webhook and exposes task results to polling clients.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
