//! Provider Bridge - adaptive router for chat-completion providers
//!
//! Routes each request to one of several interchangeable backends based on
//! task category and live performance, cools down failing providers, caches
//! repeated requests and falls back to a multi-provider committee when a
//! single answer is not trusted.

pub mod cache;
pub mod cli;
pub mod config;
pub mod distributor;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod router;
pub mod state;
pub mod telemetry;
