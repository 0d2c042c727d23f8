// src/utils/http.rs

//! HTTP client utilities.

use std::time::Duration;

use url::Url;

use crate::error::Result;
use crate::models::{CurrencyPair, EndpointConfig};

/// Create a configured asynchronous HTTP client.
pub fn create_async_client(config: &EndpointConfig) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;
    Ok(client)
}

/// Build the ticker URL for a currency pair.
pub fn ticker_url(config: &EndpointConfig, pair: &CurrencyPair) -> Result<Url> {
    let mut url = Url::parse(&config.base_url)?.join(&config.ticker_path)?;
    url.query_pairs_mut()
        .append_pair("currency_pair", pair.as_str());
    Ok(url)
}
