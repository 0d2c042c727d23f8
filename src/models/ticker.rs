//! Detailed ticker payload returned by the exchange.

use serde::{Deserialize, Serialize};

/// One ticker snapshot.
///
/// Prices and volumes arrive as decimal strings and are kept that way; the
/// persisted sample is the raw body, this struct only serves inspection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticker {
    /// Exchange-side timestamp in epoch milliseconds
    #[serde(default)]
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub last: Option<String>,
    #[serde(default)]
    pub bid: Option<String>,
    #[serde(default)]
    pub ask: Option<String>,
    #[serde(default)]
    pub low: Option<String>,
    #[serde(default)]
    pub high: Option<String>,
    #[serde(default)]
    pub volume: Option<String>,
    #[serde(default)]
    pub change: Option<String>,
    #[serde(default)]
    pub change_percent: Option<String>,
}

impl Ticker {
    /// Parse a response body.
    pub fn from_body(body: &str) -> serde_json::Result<Self> {
        serde_json::from_str(body)
    }
}
