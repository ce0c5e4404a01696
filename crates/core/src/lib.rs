//! Core types and shared functionality for the Arkalia offline cache gateway.
//!
//! This crate provides:
//! - Versioned cache store with SQLite backend
//! - Unified error types
//! - Layered gateway configuration

pub mod cache;
pub mod config;
pub mod error;

pub use cache::{CacheDb, CacheEntry};
pub use config::GatewayConfig;
pub use error::Error;
