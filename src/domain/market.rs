// Market data domain models - what providers return and what widgets display
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// How many of the most recent daily points a chart shows.
pub const CHART_WINDOW: usize = 60;

pub const DEFAULT_TABLE_SYMBOLS: [&str; 8] =
    ["AAPL", "MSFT", "GOOGL", "AMZN", "TSLA", "META", "NFLX", "NVDA"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub close: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<u64>,
}

impl SeriesPoint {
    pub fn new(date: NaiveDate, close: f64, volume: Option<u64>) -> Self {
        Self {
            date,
            close,
            volume,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub symbol: String,
    pub price: f64,
    pub change: f64,
    pub change_percent: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartData {
    pub symbol: String,
    pub points: Vec<SeriesPoint>,
    pub latest: Option<f64>,
    pub change: f64,
    pub change_percent: f64,
}

impl ChartData {
    /// Keeps the trailing [`CHART_WINDOW`] points of an ascending series and
    /// derives the day-over-day move from the last two closes.
    pub fn from_series(symbol: String, mut points: Vec<SeriesPoint>) -> Self {
        if points.len() > CHART_WINDOW {
            points.drain(..points.len() - CHART_WINDOW);
        }

        let latest = points.last().map(|p| p.close);
        let previous = points.len().checked_sub(2).map(|i| points[i].close);
        let (change, change_percent) = match (latest, previous) {
            (Some(latest), Some(previous)) if previous != 0.0 => {
                let change = latest - previous;
                (change, change / previous * 100.0)
            }
            _ => (0.0, 0.0),
        };

        Self {
            symbol,
            points,
            latest,
            change,
            change_percent,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricCard {
    pub label: String,
    pub value: String,
    pub change: f64,
}

impl MetricCard {
    fn new(label: &str, value: String, change: f64) -> Self {
        Self {
            label: label.to_string(),
            value,
            change,
        }
    }

    pub fn from_quote(quote: &Quote) -> Vec<MetricCard> {
        let direction = if quote.change >= 0.0 { 1.0 } else { -1.0 };
        vec![
            MetricCard::new(
                "Last Price",
                format!("${:.2}", quote.price),
                quote.change_percent,
            ),
            MetricCard::new("Day Change", format!("{:+.2}", quote.change), direction),
            MetricCard::new(
                "Change %",
                format!("{:+.2}%", quote.change_percent),
                quote.change_percent,
            ),
            MetricCard::new(
                "Updated",
                quote.timestamp.format("%H:%M:%S UTC").to_string(),
                0.0,
            ),
        ]
    }
}

/// Fetched payload, shaped by widget kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum WidgetData {
    Chart(ChartData),
    Table { quotes: Vec<Quote> },
    Cards { symbol: String, metrics: Vec<MetricCard> },
}

/// Widget-local display state. Lives beside the store, never inside it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetView {
    pub loading: bool,
    pub error: Option<String>,
    pub data: Option<WidgetData>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl WidgetView {
    pub fn loading() -> Self {
        Self {
            loading: true,
            error: None,
            data: None,
            updated_at: None,
        }
    }

    pub fn loaded(&mut self, data: WidgetData, at: DateTime<Utc>) {
        self.loading = false;
        self.error = None;
        self.data = Some(data);
        self.updated_at = Some(at);
    }

    /// Keeps the last good data so the tile does not blank out on a bad poll.
    pub fn failed(&mut self, message: String) {
        self.loading = false;
        self.error = Some(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(n: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Days::new(n as u64)
    }

    #[test]
    fn test_chart_keeps_trailing_window() {
        let points: Vec<SeriesPoint> = (0..121)
            .map(|i| SeriesPoint::new(day(i), 100.0 + i as f64, None))
            .collect();
        let chart = ChartData::from_series("AAPL".to_string(), points);

        assert_eq!(chart.points.len(), CHART_WINDOW);
        assert_eq!(chart.points.first().unwrap().date, day(61));
        assert_eq!(chart.latest, Some(220.0));
        assert!((chart.change - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_chart_with_single_point_has_no_change() {
        let chart =
            ChartData::from_series("AAPL".to_string(), vec![SeriesPoint::new(day(0), 10.0, None)]);

        assert_eq!(chart.latest, Some(10.0));
        assert_eq!(chart.change, 0.0);
        assert_eq!(chart.change_percent, 0.0);
    }

    #[test]
    fn test_failed_view_keeps_previous_data() {
        let mut view = WidgetView::loading();
        view.loaded(
            WidgetData::Table { quotes: Vec::new() },
            Utc::now(),
        );
        view.failed("boom".to_string());

        assert!(!view.loading);
        assert_eq!(view.error.as_deref(), Some("boom"));
        assert!(view.data.is_some());
    }

    #[test]
    fn test_cards_from_quote() {
        let quote = Quote {
            symbol: "MSFT".to_string(),
            price: 410.5,
            change: -2.25,
            change_percent: -0.55,
            timestamp: Utc::now(),
        };
        let cards = MetricCard::from_quote(&quote);

        assert_eq!(cards.len(), 4);
        assert_eq!(cards[0].value, "$410.50");
        assert_eq!(cards[1].value, "-2.25");
        assert_eq!(cards[1].change, -1.0);
        assert_eq!(cards[2].value, "-0.55%");
    }
}
