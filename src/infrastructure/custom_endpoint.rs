// Custom provider - caller-supplied URL template returning canonical JSON
use crate::application::market_provider::{MarketDataProvider, ProviderError, ProviderResult};
use crate::domain::market::{Quote, SeriesPoint};
use crate::domain::widget::DataSource;
use crate::infrastructure::config::prepare_template;
use crate::infrastructure::providers::get_json;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;

const PROVIDER: &str = "custom";

/// `endpoint` is a URL template; `${symbol}` and every `params` entry are
/// substituted. The series response is either a bare array of points or
/// `{"series": [...]}`; the quote response is a [`Quote`] object.
#[derive(Debug, Clone)]
pub struct CustomEndpointProvider {
    client: reqwest::Client,
    template: String,
    params: HashMap<String, String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SeriesBody {
    Bare(Vec<SeriesPoint>),
    Wrapped { series: Vec<SeriesPoint> },
}

impl CustomEndpointProvider {
    pub fn new(client: reqwest::Client, source: &DataSource) -> Self {
        let params = source
            .params
            .iter()
            .flatten()
            .map(|(k, v)| (k.clone(), urlencoding::encode(v).into_owned()))
            .collect();
        Self {
            client,
            template: source.endpoint.clone(),
            params,
        }
    }

    fn url_for(&self, symbol: &str) -> ProviderResult<String> {
        let mut vars = self.params.clone();
        vars.insert("symbol".to_string(), urlencoding::encode(symbol).into_owned());
        let url = prepare_template(&self.template, &vars);

        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ProviderError::Decode {
                provider: PROVIDER,
                message: format!("endpoint is not an http(s) URL: {}", url),
            });
        }
        Ok(url)
    }
}

#[async_trait]
impl MarketDataProvider for CustomEndpointProvider {
    async fn fetch_series(&self, symbol: &str) -> ProviderResult<Vec<SeriesPoint>> {
        let url = self.url_for(symbol)?;
        let mut points = match get_json::<SeriesBody>(&self.client, PROVIDER, &url).await? {
            SeriesBody::Bare(points) | SeriesBody::Wrapped { series: points } => points,
        };
        points.sort_by_key(|p| p.date);
        Ok(points)
    }

    async fn fetch_quote(&self, symbol: &str) -> ProviderResult<Quote> {
        let url = self.url_for(symbol)?;
        get_json(&self.client, PROVIDER, &url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::widget::SourceKind;
    use std::collections::BTreeMap;

    fn provider(endpoint: &str, params: &[(&str, &str)]) -> CustomEndpointProvider {
        let source = DataSource {
            kind: SourceKind::Custom,
            endpoint: endpoint.to_string(),
            symbol: None,
            params: Some(
                params
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect::<BTreeMap<_, _>>(),
            ),
        };
        CustomEndpointProvider::new(reqwest::Client::new(), &source)
    }

    #[test]
    fn test_url_substitutes_symbol_and_params() {
        let provider = provider(
            "https://data.example/v1/${symbol}/daily?range=${range}",
            &[("range", "3 months")],
        );

        assert_eq!(
            provider.url_for("BRK B").unwrap(),
            "https://data.example/v1/BRK%20B/daily?range=3%20months"
        );
    }

    #[test]
    fn test_non_http_endpoint_rejected() {
        let provider = provider("TIME_SERIES_DAILY", &[]);
        assert!(matches!(provider.url_for("AAPL"), Err(ProviderError::Decode { .. })));
    }

    #[test]
    fn test_series_body_shapes() {
        let bare: SeriesBody =
            serde_json::from_str(r#"[{"date":"2024-02-01","close":10.5}]"#).unwrap();
        let wrapped: SeriesBody =
            serde_json::from_str(r#"{"series":[{"date":"2024-02-01","close":10.5,"volume":7}]}"#)
                .unwrap();

        assert!(matches!(bare, SeriesBody::Bare(ref p) if p.len() == 1));
        assert!(matches!(wrapped, SeriesBody::Wrapped { ref series } if series[0].volume == Some(7)));
    }
}
