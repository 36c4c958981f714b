//! Adapter for the hosted document backend that stores events.

pub mod api_types;
pub mod client;
pub mod types;

pub use client::BackendClient;
