// Provider selection and the shared HTTP plumbing of the real providers
use crate::application::market_provider::{
    MarketDataProvider, ProviderError, ProviderFactory, ProviderResult,
};
use crate::domain::settings::{ALPHA_KEY, FINNHUB_KEY, Settings};
use crate::domain::widget::{DataSource, SourceKind};
use crate::infrastructure::alpha_vantage::AlphaVantageProvider;
use crate::infrastructure::config::ProviderSettings;
use crate::infrastructure::custom_endpoint::CustomEndpointProvider;
use crate::infrastructure::finnhub::FinnhubProvider;
use crate::infrastructure::mock_provider::MockMarketProvider;
use anyhow::Context;
use serde::de::DeserializeOwned;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;

pub struct MarketProviders {
    client: reqwest::Client,
    settings: ProviderSettings,
    mock: Arc<MockMarketProvider>,
}

impl MarketProviders {
    pub fn new(settings: ProviderSettings) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;
        let mock = Arc::new(MockMarketProvider::new(settings.mock_latency_ms));
        Ok(Self {
            client,
            settings,
            mock,
        })
    }
}

/// Distinguishes keys without keeping them in the label.
fn key_fingerprint(key: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    hasher.finish()
}

impl ProviderFactory for MarketProviders {
    fn provider_for(&self, source: &DataSource, settings: &Settings) -> Arc<dyn MarketDataProvider> {
        match source.kind {
            SourceKind::Alpha => match settings.key_for(ALPHA_KEY) {
                Some(key) => Arc::new(AlphaVantageProvider::new(
                    self.client.clone(),
                    &self.settings.alpha_base_url,
                    key,
                )),
                None => self.mock.clone(),
            },
            SourceKind::Finnhub => match settings.key_for(FINNHUB_KEY) {
                Some(key) => Arc::new(FinnhubProvider::new(
                    self.client.clone(),
                    &self.settings.finnhub_base_url,
                    key,
                )),
                None => self.mock.clone(),
            },
            SourceKind::Custom => Arc::new(CustomEndpointProvider::new(self.client.clone(), source)),
        }
    }

    fn provider_label(&self, source: &DataSource, settings: &Settings) -> String {
        let keyed = |name: &str| match settings.key_for(name) {
            Some(key) => format!("{}#{:x}", name, key_fingerprint(key)),
            None => "mock".to_string(),
        };
        match source.kind {
            SourceKind::Alpha => keyed(ALPHA_KEY),
            SourceKind::Finnhub => keyed(FINNHUB_KEY),
            SourceKind::Custom => "custom".to_string(),
        }
    }
}

/// GET `url` and decode a JSON body, mapping failures onto [`ProviderError`].
pub(crate) async fn get_json<T: DeserializeOwned>(
    client: &reqwest::Client,
    provider: &'static str,
    url: &str,
) -> ProviderResult<T> {
    let response = client
        .get(url)
        .header("Accept", "application/json")
        .send()
        .await
        .map_err(|source| ProviderError::Transport { provider, source })?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        if status.as_u16() == 429 {
            return Err(ProviderError::RateLimited {
                provider,
                message: body,
            });
        }
        return Err(ProviderError::Status {
            provider,
            status: status.as_u16(),
            body,
        });
    }

    response
        .json::<T>()
        .await
        .map_err(|e| ProviderError::Decode {
            provider,
            message: e.to_string(),
        })
}

/// Numeric field that providers sometimes send as a string.
pub(crate) fn number_field(
    value: &serde_json::Value,
    field: &str,
    provider: &'static str,
) -> ProviderResult<f64> {
    let raw = value.get(field).ok_or_else(|| ProviderError::Decode {
        provider,
        message: format!("missing field `{}`", field),
    })?;

    let parsed = match raw {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().trim_end_matches('%').parse::<f64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| ProviderError::Decode {
        provider,
        message: format!("field `{}` is not a number: {}", field, raw),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn providers() -> MarketProviders {
        MarketProviders::new(ProviderSettings {
            alpha_base_url: "http://alpha.invalid".to_string(),
            finnhub_base_url: "http://finnhub.invalid".to_string(),
            request_timeout_secs: 1,
            mock_latency_ms: 0,
        })
        .unwrap()
    }

    fn with_key(name: &str, key: &str) -> Settings {
        Settings {
            keys: BTreeMap::from([(name.to_string(), key.to_string())]),
            ..Settings::default()
        }
    }

    fn source(kind: SourceKind) -> DataSource {
        DataSource {
            kind,
            ..DataSource::default()
        }
    }

    #[test]
    fn test_label_is_mock_without_key() {
        let providers = providers();
        let settings = Settings::default();

        assert_eq!(providers.provider_label(&source(SourceKind::Alpha), &settings), "mock");
        assert_eq!(providers.provider_label(&source(SourceKind::Finnhub), &settings), "mock");
        assert_eq!(providers.provider_label(&source(SourceKind::Custom), &settings), "custom");
    }

    #[test]
    fn test_label_tracks_key_without_exposing_it() {
        let providers = providers();
        let first = providers.provider_label(&source(SourceKind::Alpha), &with_key("alpha", "secret-1"));
        let second = providers.provider_label(&source(SourceKind::Alpha), &with_key("alpha", "secret-2"));

        assert!(first.starts_with("alpha#"));
        assert_ne!(first, second);
        assert!(!first.contains("secret"));
    }

    #[test]
    fn test_blank_key_uses_mock() {
        let providers = providers();
        let label = providers.provider_label(&source(SourceKind::Finnhub), &with_key("finnhub", " "));
        assert_eq!(label, "mock");
    }

    #[test]
    fn test_number_field_accepts_strings_and_percentages() {
        let value = serde_json::json!({"a": "12.5", "b": 3, "c": "-0.42%", "d": true});

        assert_eq!(number_field(&value, "a", "test").unwrap(), 12.5);
        assert_eq!(number_field(&value, "b", "test").unwrap(), 3.0);
        assert_eq!(number_field(&value, "c", "test").unwrap(), -0.42);
        assert!(number_field(&value, "d", "test").is_err());
        assert!(number_field(&value, "e", "test").is_err());
    }
}
