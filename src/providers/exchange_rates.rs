use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::core::currency::CurrencyRateProvider;

/// Client for exchangeratesapi compatible services (`/latest?base=..&symbols=..`).
pub struct ExchangeRatesProvider {
    base_url: String,
    client: reqwest::Client,
}

impl ExchangeRatesProvider {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("fiatconv/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(ExchangeRatesProvider {
            base_url: base_url.to_string(),
            client,
        })
    }
}

fn make_url(base: &str, from: &str, to: &str) -> Result<Url> {
    let mut url = Url::parse(base).with_context(|| format!("Invalid base URL: {base}"))?;
    url.set_path("/latest");
    url.query_pairs_mut()
        .clear()
        .append_pair("base", from)
        .append_pair("symbols", to);
    Ok(url)
}

#[derive(Debug, Deserialize)]
struct LatestRatesResponse {
    base: String,
    rates: HashMap<String, f64>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: String,
}

fn decode_rate(body: &str, from: &str, to: &str) -> Result<f64> {
    let response: LatestRatesResponse =
        serde_json::from_str(body).context("Failed to parse rates response")?;
    if response.base != from {
        return Err(anyhow!("unexpected base in response: {}", response.base));
    }
    response
        .rates
        .get(to)
        .copied()
        .ok_or_else(|| anyhow!("target code not found in response"))
}

fn decode_error(status: StatusCode, body: &str) -> anyhow::Error {
    match serde_json::from_str::<ErrorResponse>(body) {
        Ok(r) if !r.error.is_empty() => anyhow!(r.error),
        _ => anyhow!("unexpected HTTP status code: {}", status),
    }
}

#[async_trait]
impl CurrencyRateProvider for ExchangeRatesProvider {
    #[instrument(name = "ExchangeRateFetch", skip(self), fields(from = %from, to = %to))]
    async fn get_rate(&self, from: &str, to: &str) -> Result<f64> {
        let url = make_url(&self.base_url, from, to)?;
        debug!("Requesting currency rate from {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} for currency pair: {}/{}", e, from, to))?;

        let status = response.status();
        let body = response.text().await?;
        debug!(%status, "Received rates response");

        if status != StatusCode::OK {
            return Err(decode_error(status, &body));
        }
        decode_rate(&body, from, to)
    }
}
