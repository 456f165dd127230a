// Widget domain model - one dashboard tile and its default construction
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

pub const DEFAULT_SYMBOL: &str = "AAPL";
pub const DEFAULT_ENDPOINT: &str = "TIME_SERIES_DAILY";
pub const DEFAULT_REFRESH_SECS: u32 = 30;

/// Row sentinel meaning "place below everything else". The layout surface
/// compacts it to the first free row.
pub const APPEND_ROW: u32 = u32::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WidgetKind {
    Chart,
    Table,
    Cards,
}

impl WidgetKind {
    pub const ALL: [WidgetKind; 3] = [WidgetKind::Chart, WidgetKind::Table, WidgetKind::Cards];

    pub fn as_str(&self) -> &'static str {
        match self {
            WidgetKind::Chart => "chart",
            WidgetKind::Table => "table",
            WidgetKind::Cards => "cards",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == value)
    }

    fn default_title(&self) -> &'static str {
        match self {
            WidgetKind::Chart => "Price Chart",
            WidgetKind::Table => "Stocks Table",
            WidgetKind::Cards => "Finance Cards",
        }
    }
}

/// Which provider family a widget pulls from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Primary provider (daily series).
    Alpha,
    /// Secondary provider (point quotes).
    Finnhub,
    /// Caller-supplied endpoint template.
    Custom,
}

impl SourceKind {
    pub const ALL: [SourceKind; 3] = [SourceKind::Alpha, SourceKind::Finnhub, SourceKind::Custom];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Alpha => "alpha",
            SourceKind::Finnhub => "finnhub",
            SourceKind::Custom => "custom",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSource {
    #[serde(rename = "type")]
    pub kind: SourceKind,
    pub endpoint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<BTreeMap<String, String>>,
}

impl DataSource {
    pub fn symbol_or_default(&self) -> &str {
        self.symbol
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(DEFAULT_SYMBOL)
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.as_ref()?.get(name).map(String::as_str)
    }
}

impl Default for DataSource {
    fn default() -> Self {
        Self {
            kind: SourceKind::Alpha,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            symbol: Some(DEFAULT_SYMBOL.to_string()),
            params: None,
        }
    }
}

/// Grid-cell position and span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layout {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl Layout {
    pub fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }
}

impl Default for Layout {
    fn default() -> Self {
        Self::new(0, APPEND_ROW, 4, 6)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Widget {
    pub id: String,
    pub kind: WidgetKind,
    pub title: String,
    pub source: DataSource,
    #[serde(default)]
    pub mapper: Vec<String>,
    pub layout: Layout,
    pub refresh_sec: u32,
}

impl Widget {
    /// Fully populated widget of `kind` with a fresh id. Every widget is
    /// renderable straight out of this constructor.
    pub fn new_default(kind: WidgetKind) -> Self {
        Self {
            id: generate_id(),
            kind,
            title: kind.default_title().to_string(),
            source: DataSource::default(),
            mapper: Vec::new(),
            layout: Layout::default(),
            refresh_sec: DEFAULT_REFRESH_SECS,
        }
    }

    pub fn with_layout(mut self, layout: Layout) -> Self {
        self.layout = layout;
        self
    }

    pub fn apply(&mut self, patch: WidgetPatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(source) = patch.source {
            self.source = source;
        }
        if let Some(mapper) = patch.mapper {
            self.mapper = mapper;
        }
        if let Some(layout) = patch.layout {
            self.layout = layout;
        }
        if let Some(refresh_sec) = patch.refresh_sec {
            self.refresh_sec = refresh_sec;
        }
    }
}

pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

/// Caller input for creating a widget. Anything left out comes from
/// [`Widget::new_default`]; `id` is accepted but always replaced.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewWidget {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub kind: Option<WidgetKind>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub source: Option<DataSource>,
    #[serde(default)]
    pub mapper: Option<Vec<String>>,
    #[serde(default)]
    pub layout: Option<Layout>,
    #[serde(default)]
    pub refresh_sec: Option<u32>,
}

impl NewWidget {
    pub fn of_kind(kind: WidgetKind) -> Self {
        Self {
            kind: Some(kind),
            ..Self::default()
        }
    }

    pub fn into_widget(self) -> Widget {
        if let Some(id) = &self.id {
            tracing::debug!("Ignoring caller-supplied widget id {}", id);
        }
        let mut widget = Widget::new_default(self.kind.unwrap_or(WidgetKind::Cards));
        widget.apply(WidgetPatch {
            title: self.title,
            source: self.source,
            mapper: self.mapper,
            layout: self.layout,
            refresh_sec: self.refresh_sec,
        });
        widget
    }
}

/// The fields `update` may change. `source` and `layout` replace the whole
/// record; `id` and `kind` are not patchable.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct WidgetPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub source: Option<DataSource>,
    #[serde(default)]
    pub mapper: Option<Vec<String>>,
    #[serde(default)]
    pub layout: Option<Layout>,
    #[serde(default)]
    pub refresh_sec: Option<u32>,
}

impl WidgetPatch {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// One entry of a layout snapshot reported by the layout surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutItem {
    pub id: String,
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl LayoutItem {
    pub fn layout(&self) -> Layout {
        Layout::new(self.x, self.y, self.w, self.h)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_default_is_fully_populated() {
        let widget = Widget::new_default(WidgetKind::Chart);

        assert!(!widget.id.is_empty());
        assert_eq!(widget.title, "Price Chart");
        assert_eq!(widget.source.kind, SourceKind::Alpha);
        assert_eq!(widget.source.endpoint, "TIME_SERIES_DAILY");
        assert_eq!(widget.source.symbol.as_deref(), Some("AAPL"));
        assert!(widget.mapper.is_empty());
        assert_eq!(widget.layout, Layout::new(0, APPEND_ROW, 4, 6));
        assert_eq!(widget.refresh_sec, 30);
    }

    #[test]
    fn test_default_titles_per_kind() {
        assert_eq!(Widget::new_default(WidgetKind::Table).title, "Stocks Table");
        assert_eq!(Widget::new_default(WidgetKind::Cards).title, "Finance Cards");
    }

    #[test]
    fn test_new_widget_defaults_to_cards() {
        let widget = NewWidget::default().into_widget();
        assert_eq!(widget.kind, WidgetKind::Cards);
    }

    #[test]
    fn test_new_widget_discards_caller_id() {
        let widget = NewWidget {
            id: Some("mine".to_string()),
            ..NewWidget::of_kind(WidgetKind::Table)
        }
        .into_widget();

        assert_ne!(widget.id, "mine");
    }

    #[test]
    fn test_patch_replaces_layout_as_a_whole() {
        let mut widget = Widget::new_default(WidgetKind::Chart);
        widget.apply(WidgetPatch {
            layout: Some(Layout::new(2, 3, 5, 7)),
            ..WidgetPatch::default()
        });

        assert_eq!(widget.layout, Layout::new(2, 3, 5, 7));
        assert_eq!(widget.title, "Price Chart");
    }

    #[test]
    fn test_patch_rejects_id_and_kind() {
        assert!(serde_json::from_str::<WidgetPatch>(r#"{"id":"x"}"#).is_err());
        assert!(serde_json::from_str::<WidgetPatch>(r#"{"kind":"chart"}"#).is_err());

        let patch: WidgetPatch = serde_json::from_str(r#"{"refreshSec":0}"#).unwrap();
        assert_eq!(patch.refresh_sec, Some(0));
    }

    #[test]
    fn test_symbol_falls_back_when_blank() {
        let source = DataSource {
            symbol: Some("  ".to_string()),
            ..DataSource::default()
        };
        assert_eq!(source.symbol_or_default(), "AAPL");
    }

    #[test]
    fn test_wire_names() {
        let widget = Widget::new_default(WidgetKind::Cards);
        let value = serde_json::to_value(&widget).unwrap();

        assert_eq!(value["kind"], "cards");
        assert_eq!(value["source"]["type"], "alpha");
        assert_eq!(value["refreshSec"], 30);
        assert!(value["source"].get("params").is_none());
    }
}
