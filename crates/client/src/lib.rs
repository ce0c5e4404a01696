//! Client code for the Arkalia offline cache gateway.
//!
//! This crate provides the request descriptor with category classification
//! and the HTTP fetch layer the gateway drives, behind a `Network` trait
//! so tests can substitute a scripted network.

pub mod fetch;
pub mod request;

pub use fetch::{FetchClient, FetchConfig, FetchedResponse, Network};
pub use request::{Request, RequestClass};
