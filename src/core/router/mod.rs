//! Routing engine
//!
//! The top-level entry point of the gateway: validate, run plugins, select a
//! target per the configured strategy, call the provider, and apply retries
//! and fallback around failures.

pub mod config;
pub mod engine;
pub mod strategy;

pub use config::{RetryPolicy, RouterConfig, StrategyConfig, StrategyMode, Target};
pub use engine::Router;
