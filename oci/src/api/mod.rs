//! OCI REST API client and typed service wrappers

pub mod client;
pub mod common;
pub mod core;
pub mod error;
pub mod identity;
pub mod pool;

#[cfg(test)]
pub mod test_helpers;

pub use client::{Client, ClientConfig, RetryConfig, Service};
pub use common::ApiQueryParams;
pub use error::ApiError;
