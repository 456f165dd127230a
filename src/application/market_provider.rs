// Provider traits for market data - consumed by widget feeds, implemented in infrastructure
use crate::domain::market::{Quote, SeriesPoint};
use crate::domain::settings::Settings;
use crate::domain::widget::DataSource;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request to {provider} failed: {source}")]
    Transport {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("{provider} responded with status {status}: {body}")]
    Status {
        provider: &'static str,
        status: u16,
        body: String,
    },
    #[error("{provider} returned an unexpected payload: {message}")]
    Decode {
        provider: &'static str,
        message: String,
    },
    #[error("{provider} rate limit reached: {message}")]
    RateLimited {
        provider: &'static str,
        message: String,
    },
    #[error("{provider} does not provide {what}")]
    Unsupported {
        provider: &'static str,
        what: &'static str,
    },
}

pub type ProviderResult<T> = Result<T, ProviderError>;

#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Daily closes for `symbol`, oldest first
    async fn fetch_series(&self, symbol: &str) -> ProviderResult<Vec<SeriesPoint>>;

    /// Latest point quote for `symbol`
    async fn fetch_quote(&self, symbol: &str) -> ProviderResult<Quote>;
}

/// Chooses the provider a widget's source should be fetched from.
pub trait ProviderFactory: Send + Sync {
    fn provider_for(&self, source: &DataSource, settings: &Settings) -> Arc<dyn MarketDataProvider>;

    /// Stable label of the provider `provider_for` would pick. Feeds restart
    /// when this changes, e.g. after an API key is added.
    fn provider_label(&self, source: &DataSource, settings: &Settings) -> String;
}
