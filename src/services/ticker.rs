// src/services/ticker.rs

//! Ticker transport.
//!
//! Issues one GET against the ticker endpoint per call. Failures never
//! escape as errors: they come back as [`TickerResponse::Failed`] so the
//! polling loop can treat them as a cycle without a status code.

use async_trait::async_trait;
use reqwest::Client;
use url::Url;

use crate::error::Result;
use crate::models::{CurrencyPair, EndpointConfig};
use crate::utils::http::{create_async_client, ticker_url};

/// Outcome of one ticker request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickerResponse {
    /// The server answered with a status code and body.
    Received { status: u16, body: String },
    /// No usable response (network failure, timeout, unreadable body).
    Failed { reason: String },
}

impl TickerResponse {
    pub fn received(status: u16, body: impl Into<String>) -> Self {
        Self::Received {
            status,
            body: body.into(),
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed {
            reason: reason.into(),
        }
    }

    /// Status code, or `None` for a transport fault.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Received { status, .. } => Some(*status),
            Self::Failed { .. } => None,
        }
    }

    pub fn body(&self) -> Option<&str> {
        match self {
            Self::Received { body, .. } => Some(body),
            Self::Failed { .. } => None,
        }
    }
}

/// Source of ticker responses.
#[async_trait]
pub trait TickerSource: Send + Sync {
    async fn fetch(&self) -> TickerResponse;
}

/// Ticker source backed by the exchange's HTTP API.
pub struct HttpTickerSource {
    client: Client,
    url: Url,
}

impl HttpTickerSource {
    pub fn new(client: Client, url: Url) -> Self {
        Self { client, url }
    }

    /// Build a source for `pair` from endpoint settings.
    pub fn from_config(config: &EndpointConfig, pair: &CurrencyPair) -> Result<Self> {
        let client = create_async_client(config)?;
        let url = ticker_url(config, pair)?;
        Ok(Self::new(client, url))
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl TickerSource for HttpTickerSource {
    async fn fetch(&self) -> TickerResponse {
        let response = match self.client.get(self.url.clone()).send().await {
            Ok(response) => response,
            Err(e) => return TickerResponse::failed(e.to_string()),
        };

        let status = response.status().as_u16();
        match response.text().await {
            Ok(body) => TickerResponse::received(status, body),
            Err(e) => TickerResponse::failed(format!("unreadable body (status {status}): {e}")),
        }
    }
}
