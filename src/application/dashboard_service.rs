// Dashboard service - use cases over the store: hydrate, mutate, flush, keep feeds in step
use crate::application::codec::{self, ImportError, ImportPreview};
use crate::application::state_repository::StateRepository;
use crate::application::store::DashboardStore;
use crate::application::widget_feed_service::WidgetFeedService;
use crate::domain::dashboard::DashboardState;
use crate::domain::settings::{Settings, SettingsPatch};
use crate::domain::widget::{LayoutItem, NewWidget, Widget, WidgetPatch};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Owns the one [`DashboardStore`]. Every operation takes the store lock for
/// the whole mutate-and-flush sequence, so mutations are applied and
/// persisted one at a time in arrival order.
pub struct DashboardService {
    store: Mutex<DashboardStore>,
    repository: Arc<dyn StateRepository>,
    feeds: Arc<WidgetFeedService>,
    store_key: String,
}

impl DashboardService {
    /// Loads the persisted dashboard, or the starter layout when there is
    /// none or it no longer validates, and starts the widget feeds.
    pub async fn hydrate(
        repository: Arc<dyn StateRepository>,
        feeds: Arc<WidgetFeedService>,
        store_key: impl Into<String>,
    ) -> Self {
        let store_key = store_key.into();
        let state = match repository.load(&store_key).await {
            Ok(Some(raw)) => match codec::parse_import(&raw) {
                Ok(state) => {
                    tracing::info!(
                        "Hydrated {} widgets from {}",
                        state.widgets.len(),
                        store_key
                    );
                    state
                }
                Err(e) => {
                    tracing::warn!("Persisted dashboard {} rejected, using starter: {}", store_key, e);
                    DashboardState::starter()
                }
            },
            Ok(None) => {
                tracing::info!("No persisted dashboard under {}, using starter", store_key);
                DashboardState::starter()
            }
            Err(e) => {
                tracing::error!("Failed to load dashboard {}: {}", store_key, e);
                DashboardState::starter()
            }
        };

        feeds.sync(&state.widgets, &state.settings);
        Self {
            store: Mutex::new(DashboardStore::new(state)),
            repository,
            feeds,
            store_key,
        }
    }

    pub fn feeds(&self) -> &Arc<WidgetFeedService> {
        &self.feeds
    }

    pub async fn snapshot(&self) -> DashboardState {
        self.store.lock().await.state().clone()
    }

    pub async fn widgets(&self) -> Vec<Widget> {
        self.store.lock().await.widgets().to_vec()
    }

    pub async fn settings(&self) -> Settings {
        self.store.lock().await.settings().clone()
    }

    pub async fn add(&self, partial: NewWidget) -> Widget {
        let mut store = self.store.lock().await;
        let widget = store.add(partial);
        self.commit(&store).await;
        widget
    }

    pub async fn remove(&self, id: &str) -> bool {
        let mut store = self.store.lock().await;
        let removed = store.remove(id);
        if removed {
            self.commit(&store).await;
        }
        removed
    }

    pub async fn update(&self, id: &str, patch: WidgetPatch) -> Option<Widget> {
        let mut store = self.store.lock().await;
        if patch.is_empty() {
            return store.widget(id).cloned();
        }
        if !store.update(id, patch) {
            return None;
        }
        self.commit(&store).await;
        store.widget(id).cloned()
    }

    /// Replaces the collection as given, provided every id is non-empty and
    /// unique. Anything else is rejected before it can reach storage.
    pub async fn reorder(&self, items: Vec<Widget>) -> Result<(), ImportError> {
        codec::check_widget_ids(&items)?;
        let mut store = self.store.lock().await;
        store.reorder(items);
        self.commit(&store).await;
        Ok(())
    }

    pub async fn apply_layout(&self, snapshot: &[LayoutItem]) -> Vec<Widget> {
        let mut store = self.store.lock().await;
        store.apply_layout(snapshot);
        self.commit(&store).await;
        store.widgets().to_vec()
    }

    pub async fn set_settings(&self, patch: SettingsPatch) -> Settings {
        let mut store = self.store.lock().await;
        store.set_settings(patch);
        self.commit(&store).await;
        store.settings().clone()
    }

    pub async fn reset(&self) {
        let mut store = self.store.lock().await;
        store.reset();
        self.commit(&store).await;
    }

    pub async fn export_json(&self) -> serde_json::Result<String> {
        self.store.lock().await.export_json()
    }

    pub async fn preview_import(&self, raw: &str) -> Result<ImportPreview, ImportError> {
        self.store.lock().await.preview_import(raw)
    }

    pub async fn import_json(&self, raw: &str) -> Result<DashboardState, ImportError> {
        let mut store = self.store.lock().await;
        store.import_json(raw)?;
        self.commit(&store).await;
        Ok(store.state().clone())
    }

    /// Flushes the full state and re-syncs feeds. A failed write is logged;
    /// the in-memory change stays committed.
    async fn commit(&self, store: &DashboardStore) {
        let state = store.state();
        self.feeds.sync(&state.widgets, &state.settings);

        let text = match store.export_json() {
            Ok(text) => text,
            Err(e) => {
                tracing::error!("Failed to serialise dashboard: {}", e);
                return;
            }
        };
        if let Err(e) = self.repository.save(&self.store_key, &text).await {
            tracing::error!("Failed to persist dashboard {}: {}", self.store_key, e);
        }
    }
}
