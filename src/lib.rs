// src/lib.rs

//! Ticker Crawler Library

pub mod error;
#[cfg(feature = "cli")]
pub mod logging;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
