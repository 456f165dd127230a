// Dashboard domain model - the full persisted state
use super::settings::Settings;
use super::widget::{Layout, Widget, WidgetKind};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardState {
    pub widgets: Vec<Widget>,
    pub settings: Settings,
}

impl DashboardState {
    pub fn new(widgets: Vec<Widget>, settings: Settings) -> Self {
        Self { widgets, settings }
    }

    /// One widget of each kind, tiled so nothing overlaps.
    pub fn starter() -> Self {
        let widgets = vec![
            Widget::new_default(WidgetKind::Chart).with_layout(Layout::new(0, 0, 4, 6)),
            Widget::new_default(WidgetKind::Table).with_layout(Layout::new(4, 0, 8, 6)),
            Widget::new_default(WidgetKind::Cards).with_layout(Layout::new(0, 6, 6, 4)),
        ];
        Self::new(widgets, Settings::default())
    }

    pub fn widget(&self, id: &str) -> Option<&Widget> {
        self.widgets.iter().find(|w| w.id == id)
    }
}
