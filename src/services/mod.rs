//! Network services.
//!
//! - `ticker`: fetches ticker snapshots from the exchange

pub mod ticker;

pub use ticker::{HttpTickerSource, TickerResponse, TickerSource};
