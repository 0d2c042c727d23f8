// src/models/mod.rs

//! Domain models for the ticker crawler.

mod config;
mod pair;
mod ticker;

// Re-export all public types
pub use config::{Config, EndpointConfig, LoggingConfig, PulseConfig, StorageConfig};
pub use pair::CurrencyPair;
pub use ticker::Ticker;
