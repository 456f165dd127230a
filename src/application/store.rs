// Configuration store - the single authoritative widget collection and settings
use crate::application::codec::{self, ImportError, ImportPreview};
use crate::application::layout_reconciler::reconcile;
use crate::domain::dashboard::DashboardState;
use crate::domain::settings::{Settings, SettingsPatch};
use crate::domain::widget::{LayoutItem, NewWidget, Widget, WidgetPatch};

/// In-memory dashboard model.
///
/// All operations are synchronous and take `&mut self`, so whoever owns the
/// store is its single writer. Mutators report whether anything changed so
/// the caller knows when a flush is due.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardStore {
    state: DashboardState,
}

impl DashboardStore {
    pub fn new(state: DashboardState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &DashboardState {
        &self.state
    }

    pub fn widgets(&self) -> &[Widget] {
        &self.state.widgets
    }

    pub fn settings(&self) -> &Settings {
        &self.state.settings
    }

    pub fn widget(&self, id: &str) -> Option<&Widget> {
        self.state.widget(id)
    }

    /// Builds the widget from defaults plus caller fields, then appends it.
    pub fn add(&mut self, partial: NewWidget) -> Widget {
        let widget = partial.into_widget();
        tracing::debug!("Adding {} widget {}", widget.kind.as_str(), widget.id);
        self.state.widgets.push(widget.clone());
        widget
    }

    /// Unknown ids are a no-op.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.state.widgets.len();
        self.state.widgets.retain(|w| w.id != id);
        before != self.state.widgets.len()
    }

    /// Unknown ids are a no-op.
    pub fn update(&mut self, id: &str, patch: WidgetPatch) -> bool {
        match self.state.widgets.iter_mut().find(|w| w.id == id) {
            Some(widget) => {
                widget.apply(patch);
                true
            }
            None => false,
        }
    }

    /// Replaces the whole collection. Callers are trusted to keep widget
    /// identity intact; nothing is verified here.
    pub fn reorder(&mut self, items: Vec<Widget>) {
        self.state.widgets = items;
    }

    pub fn apply_layout(&mut self, snapshot: &[LayoutItem]) {
        let reconciled = reconcile(&self.state.widgets, snapshot);
        self.reorder(reconciled);
    }

    pub fn set_settings(&mut self, patch: SettingsPatch) {
        self.state.settings.merge(patch);
    }

    pub fn reset(&mut self) {
        self.state = DashboardState::default();
    }

    pub fn export_json(&self) -> serde_json::Result<String> {
        codec::export_json(&self.state)
    }

    /// Validates `raw` and reports its effect without adopting it.
    pub fn preview_import(&self, raw: &str) -> Result<ImportPreview, ImportError> {
        let incoming = codec::parse_import(raw)?;
        Ok(ImportPreview::new(&self.state, incoming))
    }

    /// All or nothing: on any error the store is left exactly as it was.
    pub fn import_json(&mut self, raw: &str) -> Result<(), ImportError> {
        let incoming = codec::parse_import(raw)?;
        self.adopt(incoming);
        Ok(())
    }

    pub fn adopt(&mut self, state: DashboardState) {
        self.state = state;
    }
}
