//! Utility functions and helpers.

pub mod http;

pub use http::{create_async_client, ticker_url};
