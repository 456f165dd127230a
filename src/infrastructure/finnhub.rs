// Secondary provider - point quotes over HTTP
use crate::application::market_provider::{MarketDataProvider, ProviderError, ProviderResult};
use crate::domain::market::{Quote, SeriesPoint};
use crate::infrastructure::providers::get_json;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

const PROVIDER: &str = "finnhub";

#[derive(Debug, Clone)]
pub struct FinnhubProvider {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

#[derive(Debug, Deserialize)]
struct FinnhubQuote {
    /// current price
    c: f64,
    /// change
    #[serde(default)]
    d: Option<f64>,
    /// percent change
    #[serde(default)]
    dp: Option<f64>,
    /// unix seconds
    #[serde(default)]
    t: Option<i64>,
}

impl FinnhubQuote {
    fn into_quote(self, symbol: &str) -> ProviderResult<Quote> {
        // Unknown symbols come back as all zeros rather than an error.
        if self.c == 0.0 && self.t.unwrap_or_default() == 0 {
            return Err(ProviderError::Decode {
                provider: PROVIDER,
                message: format!("no quote for symbol {}", symbol),
            });
        }

        let timestamp = self
            .t
            .and_then(|t| DateTime::<Utc>::from_timestamp(t, 0))
            .unwrap_or_else(Utc::now);

        Ok(Quote {
            symbol: symbol.to_string(),
            price: self.c,
            change: self.d.unwrap_or_default(),
            change_percent: self.dp.unwrap_or_default(),
            timestamp,
        })
    }
}

impl FinnhubProvider {
    pub fn new(client: reqwest::Client, base_url: &str, token: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    fn quote_url(&self, symbol: &str) -> String {
        format!(
            "{}/quote?symbol={}&token={}",
            self.base_url,
            urlencoding::encode(symbol),
            urlencoding::encode(&self.token)
        )
    }
}

#[async_trait]
impl MarketDataProvider for FinnhubProvider {
    async fn fetch_series(&self, _symbol: &str) -> ProviderResult<Vec<SeriesPoint>> {
        Err(ProviderError::Unsupported {
            provider: PROVIDER,
            what: "daily series",
        })
    }

    async fn fetch_quote(&self, symbol: &str) -> ProviderResult<Quote> {
        let raw: FinnhubQuote = get_json(&self.client, PROVIDER, &self.quote_url(symbol)).await?;
        raw.into_quote(symbol)
    }
}
