// Widget feed service - one cancellable polling task per widget, results kept out of the store
use crate::application::market_provider::{MarketDataProvider, ProviderFactory, ProviderResult};
use crate::domain::market::{ChartData, DEFAULT_TABLE_SYMBOLS, MetricCard, WidgetData, WidgetView};
use crate::domain::settings::Settings;
use crate::domain::widget::{DataSource, Widget, WidgetKind};
use chrono::Utc;
use futures::future::try_join_all;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Tables fan out one request per symbol, so they never poll faster than this.
const TABLE_MIN_REFRESH_SECS: u64 = 5;

/// Everything a running feed depends on. A change restarts the feed.
#[derive(Debug, Clone, PartialEq)]
struct FeedKey {
    kind: WidgetKind,
    source: DataSource,
    refresh_sec: u32,
    provider: String,
}

struct Feed {
    key: FeedKey,
    view: Arc<watch::Sender<WidgetView>>,
    task: JoinHandle<()>,
}

pub struct WidgetFeedService {
    factory: Arc<dyn ProviderFactory>,
    feeds: Mutex<HashMap<String, Feed>>,
}

impl WidgetFeedService {
    pub fn new(factory: Arc<dyn ProviderFactory>) -> Self {
        Self {
            factory,
            feeds: Mutex::new(HashMap::new()),
        }
    }

    fn feeds(&self) -> MutexGuard<'_, HashMap<String, Feed>> {
        self.feeds.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Brings the running feeds in line with `widgets`. Must be called from
    /// within a tokio runtime.
    pub fn sync(&self, widgets: &[Widget], settings: &Settings) {
        let mut feeds = self.feeds();
        let live: HashSet<&str> = widgets.iter().map(|w| w.id.as_str()).collect();

        feeds.retain(|id, feed| {
            if live.contains(id.as_str()) {
                return true;
            }
            tracing::debug!("Stopping feed for removed widget {}", id);
            feed.task.abort();
            false
        });

        for widget in widgets {
            let key = FeedKey {
                kind: widget.kind,
                source: widget.source.clone(),
                refresh_sec: widget.refresh_sec,
                provider: self.factory.provider_label(&widget.source, settings),
            };

            match feeds.get_mut(&widget.id) {
                Some(feed) if feed.key == key => {}
                Some(feed) => {
                    tracing::debug!("Restarting feed for widget {}", widget.id);
                    feed.task.abort();
                    feed.view.send_replace(WidgetView::loading());
                    feed.task = self.spawn(widget, settings, feed.view.clone());
                    feed.key = key;
                }
                None => {
                    tracing::debug!("Starting feed for widget {}", widget.id);
                    let (tx, _rx) = watch::channel(WidgetView::loading());
                    let view = Arc::new(tx);
                    let task = self.spawn(widget, settings, view.clone());
                    feeds.insert(widget.id.clone(), Feed { key, view, task });
                }
            }
        }
    }

    /// Current display state for a widget, if it has a feed
    pub fn view(&self, id: &str) -> Option<WidgetView> {
        self.feeds().get(id).map(|feed| feed.view.borrow().clone())
    }

    /// Change notifications for a widget's display state
    pub fn subscribe(&self, id: &str) -> Option<watch::Receiver<WidgetView>> {
        self.feeds().get(id).map(|feed| feed.view.subscribe())
    }

    pub fn active_feeds(&self) -> usize {
        self.feeds().len()
    }

    pub fn shutdown(&self) {
        for (_, feed) in self.feeds().drain() {
            feed.task.abort();
        }
    }

    fn spawn(
        &self,
        widget: &Widget,
        settings: &Settings,
        view: Arc<watch::Sender<WidgetView>>,
    ) -> JoinHandle<()> {
        let provider = self.factory.provider_for(&widget.source, settings);
        tokio::spawn(run_feed(widget.clone(), provider, view))
    }
}

impl Drop for WidgetFeedService {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn poll_period(widget: &Widget) -> Option<Duration> {
    let secs = u64::from(widget.refresh_sec);
    match (secs, widget.kind) {
        (0, _) => None,
        (secs, WidgetKind::Table) => Some(Duration::from_secs(secs.max(TABLE_MIN_REFRESH_SECS))),
        (secs, _) => Some(Duration::from_secs(secs)),
    }
}

async fn run_feed(
    widget: Widget,
    provider: Arc<dyn MarketDataProvider>,
    view: Arc<watch::Sender<WidgetView>>,
) {
    let Some(period) = poll_period(&widget) else {
        refresh(&widget, provider.as_ref(), &view).await;
        return;
    };

    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        refresh(&widget, provider.as_ref(), &view).await;
    }
}

async fn refresh(
    widget: &Widget,
    provider: &dyn MarketDataProvider,
    view: &watch::Sender<WidgetView>,
) {
    match fetch_widget_data(widget, provider).await {
        Ok(data) => view.send_modify(|v| v.loaded(data, Utc::now())),
        Err(e) => {
            tracing::warn!("Error fetching data for widget {}: {}", widget.id, e);
            view.send_modify(|v| v.failed(e.to_string()));
        }
    }
}

pub async fn fetch_widget_data(
    widget: &Widget,
    provider: &dyn MarketDataProvider,
) -> ProviderResult<WidgetData> {
    let symbol = widget.source.symbol_or_default().to_uppercase();
    match widget.kind {
        WidgetKind::Chart => {
            let points = provider.fetch_series(&symbol).await?;
            Ok(WidgetData::Chart(ChartData::from_series(symbol, points)))
        }
        WidgetKind::Table => {
            let symbols = table_symbols(&widget.source);
            let quotes = try_join_all(symbols.iter().map(|s| provider.fetch_quote(s))).await?;
            Ok(WidgetData::Table { quotes })
        }
        WidgetKind::Cards => {
            let quote = provider.fetch_quote(&symbol).await?;
            Ok(WidgetData::Cards {
                metrics: MetricCard::from_quote(&quote),
                symbol,
            })
        }
    }
}

/// `params.symbols` as a comma-separated list, else the default watch list.
fn table_symbols(source: &DataSource) -> Vec<String> {
    let listed: Vec<String> = source
        .param("symbols")
        .unwrap_or_default()
        .split(',')
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .collect();

    if listed.is_empty() {
        DEFAULT_TABLE_SYMBOLS.iter().map(|s| s.to_string()).collect()
    } else {
        listed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::market_provider::ProviderError;
    use crate::domain::market::{Quote, SeriesPoint};
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingProvider {
        series_calls: AtomicUsize,
        quote_calls: AtomicUsize,
    }

    impl CountingProvider {
        fn quotes(&self) -> usize {
            self.quote_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl MarketDataProvider for CountingProvider {
        async fn fetch_series(&self, _symbol: &str) -> ProviderResult<Vec<SeriesPoint>> {
            self.series_calls.fetch_add(1, Ordering::SeqCst);
            let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
            Ok(vec![SeriesPoint::new(date, 100.0, Some(10))])
        }

        async fn fetch_quote(&self, symbol: &str) -> ProviderResult<Quote> {
            self.quote_calls.fetch_add(1, Ordering::SeqCst);
            if symbol == "BAD" {
                return Err(ProviderError::Decode {
                    provider: "counting",
                    message: "no such symbol".to_string(),
                });
            }
            Ok(Quote {
                symbol: symbol.to_string(),
                price: 10.0,
                change: 1.0,
                change_percent: 10.0,
                timestamp: Utc::now(),
            })
        }
    }

    struct FixedFactory(Arc<CountingProvider>);

    impl ProviderFactory for FixedFactory {
        fn provider_for(&self, _: &DataSource, _: &Settings) -> Arc<dyn MarketDataProvider> {
            self.0.clone()
        }

        fn provider_label(&self, _: &DataSource, _: &Settings) -> String {
            "fixed".to_string()
        }
    }

    fn setup() -> (Arc<CountingProvider>, WidgetFeedService) {
        let provider = Arc::new(CountingProvider::default());
        let service = WidgetFeedService::new(Arc::new(FixedFactory(provider.clone())));
        (provider, service)
    }

    fn cards(symbol: &str, refresh_sec: u32) -> Widget {
        let mut widget = Widget::new_default(WidgetKind::Cards);
        widget.source.symbol = Some(symbol.to_string());
        widget.refresh_sec = refresh_sec;
        widget
    }

    async fn settle(secs: u64) {
        tokio::time::sleep(Duration::from_secs(secs)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_refresh_fetches_once() {
        let (provider, service) = setup();
        service.sync(&[cards("AAPL", 0)], &Settings::default());

        settle(300).await;

        assert_eq!(provider.quotes(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_polls_every_refresh_interval() {
        let (provider, service) = setup();
        service.sync(&[cards("AAPL", 10)], &Settings::default());

        settle(35).await;

        // t = 0, 10, 20, 30
        assert_eq!(provider.quotes(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_removed_widget_stops_polling() {
        let (provider, service) = setup();
        let widget = cards("AAPL", 10);
        service.sync(&[widget.clone()], &Settings::default());
        settle(15).await;
        assert_eq!(provider.quotes(), 2);

        service.sync(&[], &Settings::default());
        settle(60).await;

        assert_eq!(provider.quotes(), 2);
        assert!(service.view(&widget.id).is_none());
        assert_eq!(service.active_feeds(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_is_local_to_widget() {
        let (_provider, service) = setup();
        let bad = cards("BAD", 30);
        let good = cards("MSFT", 30);
        service.sync(&[bad.clone(), good.clone()], &Settings::default());

        settle(1).await;

        let bad_view = service.view(&bad.id).unwrap();
        assert!(bad_view.error.is_some());
        assert!(!bad_view.loading);

        let good_view = service.view(&good.id).unwrap();
        assert!(good_view.error.is_none());
        assert!(matches!(good_view.data, Some(WidgetData::Cards { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unchanged_widget_keeps_running_feed() {
        let (provider, service) = setup();
        let widget = cards("AAPL", 10);
        service.sync(&[widget.clone()], &Settings::default());
        settle(5).await;

        let mut moved = widget.clone();
        moved.title = "Renamed".to_string();
        moved.layout.x = 6;
        service.sync(&[moved], &Settings::default());
        settle(1).await;

        assert_eq!(provider.quotes(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_config_change_restarts_feed() {
        let (provider, service) = setup();
        let widget = cards("AAPL", 10);
        service.sync(&[widget.clone()], &Settings::default());
        settle(5).await;

        let mut changed = widget.clone();
        changed.source.symbol = Some("TSLA".to_string());
        service.sync(&[changed], &Settings::default());
        settle(1).await;

        assert_eq!(provider.quotes(), 2);
        match service.view(&widget.id).unwrap().data {
            Some(WidgetData::Cards { symbol, .. }) => assert_eq!(symbol, "TSLA"),
            other => panic!("unexpected data {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_table_polls_no_faster_than_minimum() {
        let (provider, service) = setup();
        let mut table = Widget::new_default(WidgetKind::Table);
        table.refresh_sec = 1;
        table.source.params = Some(BTreeMap::from([(
            "symbols".to_string(),
            "aapl, msft".to_string(),
        )]));
        service.sync(&[table], &Settings::default());

        settle(12).await;

        // t = 0, 5, 10 with two symbols each
        assert_eq!(provider.quotes(), 6);
    }

    #[test]
    fn test_table_symbols_default_list() {
        let symbols = table_symbols(&DataSource::default());
        assert_eq!(symbols.len(), DEFAULT_TABLE_SYMBOLS.len());
    }

    #[tokio::test]
    async fn test_chart_fetch_uses_series() {
        let provider = CountingProvider::default();
        let widget = Widget::new_default(WidgetKind::Chart);

        let data = fetch_widget_data(&widget, &provider).await.unwrap();

        assert!(matches!(data, WidgetData::Chart(ref c) if c.symbol == "AAPL"));
        assert_eq!(provider.series_calls.load(Ordering::SeqCst), 1);
    }
}
