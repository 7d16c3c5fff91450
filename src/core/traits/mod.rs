//! Capability traits shared by all provider adapters

pub mod provider;

pub use provider::{Capability, Provider};
