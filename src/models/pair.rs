//! Currency pair identifiers.

use std::fmt;

use crate::error::{AppError, Result};

/// A currency pair accepted by the ticker endpoint, e.g. `btc_krw`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CurrencyPair(String);

impl CurrencyPair {
    /// Parse a pair, accepting only members of `supported`.
    pub fn parse(raw: &str, supported: &[String]) -> Result<Self> {
        let normalized = raw.trim().to_lowercase();
        if supported.iter().any(|s| s == &normalized) {
            Ok(Self(normalized))
        } else {
            Err(AppError::unsupported_pair(raw, supported))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CurrencyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
