// Primary provider - daily series and global quotes over HTTP
use crate::application::market_provider::{MarketDataProvider, ProviderError, ProviderResult};
use crate::domain::market::{Quote, SeriesPoint};
use crate::infrastructure::providers::{get_json, number_field};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use serde_json::Value;

const PROVIDER: &str = "alphavantage";

#[derive(Debug, Clone)]
pub struct AlphaVantageProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl AlphaVantageProvider {
    pub fn new(client: reqwest::Client, base_url: &str, api_key: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    fn build_query_url(&self, function: &str, symbol: &str) -> String {
        format!(
            "{}/query?function={}&symbol={}&apikey={}",
            self.base_url,
            function,
            urlencoding::encode(symbol),
            urlencoding::encode(&self.api_key)
        )
    }

    async fn execute_query(&self, function: &str, symbol: &str) -> ProviderResult<Value> {
        let url = self.build_query_url(function, symbol);
        tracing::debug!("Querying {} {} for {}", PROVIDER, function, symbol);
        let body: Value = get_json(&self.client, PROVIDER, &url).await?;
        check_service_message(&body)?;
        Ok(body)
    }
}

/// The API answers 200 with a message body when throttled or misused.
fn check_service_message(body: &Value) -> ProviderResult<()> {
    for field in ["Note", "Information"] {
        if let Some(message) = body.get(field).and_then(Value::as_str) {
            return Err(ProviderError::RateLimited {
                provider: PROVIDER,
                message: message.to_string(),
            });
        }
    }
    if let Some(message) = body.get("Error Message").and_then(Value::as_str) {
        return Err(ProviderError::Decode {
            provider: PROVIDER,
            message: message.to_string(),
        });
    }
    Ok(())
}

fn parse_daily_series(body: &Value) -> ProviderResult<Vec<SeriesPoint>> {
    let series = body
        .get("Time Series (Daily)")
        .and_then(Value::as_object)
        .ok_or_else(|| ProviderError::Decode {
            provider: PROVIDER,
            message: "missing `Time Series (Daily)`".to_string(),
        })?;

    let mut points = Vec::with_capacity(series.len());
    for (date, ohlc) in series {
        let Ok(date) = NaiveDate::parse_from_str(date, "%Y-%m-%d") else {
            tracing::debug!("Skipping unparseable date {} from {}", date, PROVIDER);
            continue;
        };
        let close = number_field(ohlc, "4. close", PROVIDER)?;
        let volume = number_field(ohlc, "5. volume", PROVIDER).ok().map(|v| v as u64);
        points.push(SeriesPoint::new(date, close, volume));
    }

    points.sort_by_key(|p| p.date);
    Ok(points)
}

fn parse_global_quote(body: &Value) -> ProviderResult<Quote> {
    let quote = body
        .get("Global Quote")
        .filter(|q| q.as_object().is_some_and(|o| !o.is_empty()))
        .ok_or_else(|| ProviderError::Decode {
            provider: PROVIDER,
            message: "missing `Global Quote`".to_string(),
        })?;

    let symbol = quote
        .get("01. symbol")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    Ok(Quote {
        symbol,
        price: number_field(quote, "05. price", PROVIDER)?,
        change: number_field(quote, "09. change", PROVIDER)?,
        change_percent: number_field(quote, "10. change percent", PROVIDER)?,
        timestamp: Utc::now(),
    })
}

#[async_trait]
impl MarketDataProvider for AlphaVantageProvider {
    async fn fetch_series(&self, symbol: &str) -> ProviderResult<Vec<SeriesPoint>> {
        let body = self.execute_query("TIME_SERIES_DAILY", symbol).await?;
        parse_daily_series(&body)
    }

    async fn fetch_quote(&self, symbol: &str) -> ProviderResult<Quote> {
        let body = self.execute_query("GLOBAL_QUOTE", symbol).await?;
        let mut quote = parse_global_quote(&body)?;
        if quote.symbol.is_empty() {
            quote.symbol = symbol.to_string();
        }
        Ok(quote)
    }
}
