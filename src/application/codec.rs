// Import/export codec - canonical text form of the dashboard and its validating parser
use crate::domain::dashboard::DashboardState;
use crate::domain::settings::{Settings, Theme};
use crate::domain::widget::{APPEND_ROW, DataSource, Layout, SourceKind, Widget, WidgetKind};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub path: String,
    pub message: String,
}

impl FieldError {
    fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("malformed input: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("invalid dashboard ({} problem(s)): {}", .0.len(), join_errors(.0))]
    Invalid(Vec<FieldError>),
}

fn join_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

const EMPTY_ID: &str = "must not be empty";

fn duplicate_id(id: &str) -> String {
    format!("duplicate id \"{id}\"")
}

/// Id rules of an import applied to an already-typed collection: every id
/// non-empty and unique. A list that breaks them could not be hydrated.
pub fn check_widget_ids(widgets: &[Widget]) -> Result<(), ImportError> {
    let mut seen = HashSet::new();
    let errors: Vec<FieldError> = widgets
        .iter()
        .enumerate()
        .filter_map(|(i, widget)| {
            let path = format!("widgets[{i}].id");
            if widget.id.trim().is_empty() {
                Some(FieldError::new(path, EMPTY_ID))
            } else if !seen.insert(widget.id.as_str()) {
                Some(FieldError::new(path, duplicate_id(&widget.id)))
            } else {
                None
            }
        })
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ImportError::Invalid(errors))
    }
}

/// Indented `{widgets, settings}` text. Deterministic for a given state.
pub fn export_json(state: &DashboardState) -> serde_json::Result<String> {
    serde_json::to_string_pretty(state)
}

/// Parses and validates import text without side effects. Every offending
/// field is reported, not just the first.
pub fn parse_import(raw: &str) -> Result<DashboardState, ImportError> {
    let root: Value = serde_json::from_str(raw)?;
    let mut validator = Validator::default();

    let Some(root) = root.as_object() else {
        return Err(ImportError::Invalid(vec![FieldError::new(
            "$",
            "expected an object with `widgets` and `settings`",
        )]));
    };

    let mut widgets: Vec<Widget> = Vec::new();
    match root.get("widgets") {
        None | Some(Value::Null) => {}
        Some(Value::Array(items)) => {
            let mut seen = HashSet::new();
            for (i, item) in items.iter().enumerate() {
                let path = format!("widgets[{i}]");
                let Some(widget) = validator.widget(&path, item) else {
                    continue;
                };
                if !seen.insert(widget.id.clone()) {
                    validator.push(format!("{path}.id"), duplicate_id(&widget.id));
                    continue;
                }
                widgets.push(widget);
            }
        }
        Some(_) => validator.push("widgets", "expected an array"),
    }

    let settings = match root.get("settings") {
        None | Some(Value::Null) => Settings::default(),
        Some(value) => validator.settings("settings", value),
    };

    validator.finish(DashboardState::new(widgets, settings))
}

/// What adopting an import would do to the current collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportPreview {
    pub state: DashboardState,
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub retained: Vec<String>,
}

impl ImportPreview {
    pub fn new(current: &DashboardState, incoming: DashboardState) -> Self {
        let current_ids: HashSet<&str> = current.widgets.iter().map(|w| w.id.as_str()).collect();
        let incoming_ids: HashSet<&str> =
            incoming.widgets.iter().map(|w| w.id.as_str()).collect();

        let (retained, added): (Vec<String>, Vec<String>) = incoming
            .widgets
            .iter()
            .map(|w| w.id.clone())
            .partition(|id| current_ids.contains(id.as_str()));
        let removed = current
            .widgets
            .iter()
            .filter(|w| !incoming_ids.contains(w.id.as_str()))
            .map(|w| w.id.clone())
            .collect();

        Self {
            state: incoming,
            added,
            removed,
            retained,
        }
    }
}

#[derive(Default)]
struct Validator {
    errors: Vec<FieldError>,
}

impl Validator {
    fn push(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(FieldError::new(path, message));
    }

    fn finish(self, state: DashboardState) -> Result<DashboardState, ImportError> {
        if self.errors.is_empty() {
            Ok(state)
        } else {
            Err(ImportError::Invalid(self.errors))
        }
    }

    fn object<'a>(&mut self, path: &str, value: &'a Value) -> Option<&'a Map<String, Value>> {
        let object = value.as_object();
        if object.is_none() {
            self.push(path, "expected an object");
        }
        object
    }

    fn string(&mut self, path: &str, value: &Value) -> Option<String> {
        match value.as_str() {
            Some(s) => Some(s.to_string()),
            None => {
                self.push(path, "expected a string");
                None
            }
        }
    }

    fn unsigned(&mut self, path: &str, value: &Value) -> Option<u32> {
        match value.as_u64().and_then(|n| u32::try_from(n).ok()) {
            Some(n) => Some(n),
            None => {
                self.push(path, format!("must be a non-negative integer, got {value}"));
                None
            }
        }
    }

    fn widget(&mut self, path: &str, value: &Value) -> Option<Widget> {
        let fields = self.object(path, value)?;
        let before = self.errors.len();

        let id = match fields.get("id") {
            Some(Value::String(id)) if !id.trim().is_empty() => Some(id.clone()),
            Some(Value::String(_)) => {
                self.push(format!("{path}.id"), EMPTY_ID);
                None
            }
            Some(other) => {
                self.push(format!("{path}.id"), format!("expected a string, got {other}"));
                None
            }
            None => {
                self.push(format!("{path}.id"), "is required");
                None
            }
        };

        let kind = match fields.get("kind") {
            Some(Value::String(kind)) => {
                let parsed = WidgetKind::parse(kind);
                if parsed.is_none() {
                    self.push(format!("{path}.kind"), format!("unknown widget kind \"{kind}\""));
                }
                parsed
            }
            Some(other) => {
                self.push(format!("{path}.kind"), format!("expected a string, got {other}"));
                None
            }
            None => {
                self.push(format!("{path}.kind"), "is required");
                None
            }
        };

        let layout = match fields.get("layout") {
            Some(value) => self.layout(&format!("{path}.layout"), value),
            None => {
                self.push(format!("{path}.layout"), "is required");
                None
            }
        };

        let title = match fields.get("title") {
            None | Some(Value::Null) => None,
            Some(value) => self.string(&format!("{path}.title"), value),
        };

        let source = match fields.get("source") {
            None | Some(Value::Null) => None,
            Some(value) => self.source(&format!("{path}.source"), value),
        };

        let mapper = match fields.get("mapper") {
            None | Some(Value::Null) => None,
            Some(value) => self.mapper(&format!("{path}.mapper"), value),
        };

        let refresh_sec = match fields.get("refreshSec") {
            None | Some(Value::Null) => None,
            Some(value) => self.unsigned(&format!("{path}.refreshSec"), value),
        };

        if self.errors.len() != before {
            return None;
        }

        let (id, kind, layout) = (id?, kind?, layout?);
        let mut widget = Widget::new_default(kind);
        widget.id = id;
        widget.layout = layout;
        if let Some(title) = title {
            widget.title = title;
        }
        if let Some(source) = source {
            widget.source = source;
        }
        if let Some(mapper) = mapper {
            widget.mapper = mapper;
        }
        if let Some(refresh_sec) = refresh_sec {
            widget.refresh_sec = refresh_sec;
        }
        Some(widget)
    }

    fn layout(&mut self, path: &str, value: &Value) -> Option<Layout> {
        let fields = self.object(path, value)?;
        let mut coord = |name: &str| match fields.get(name) {
            // Older exports wrote the bottom-row sentinel as null.
            Some(Value::Null) if name == "y" => Some(APPEND_ROW),
            Some(value) => self.unsigned(&format!("{path}.{name}"), value),
            None => {
                self.push(format!("{path}.{name}"), "is required");
                None
            }
        };
        let (x, y, w, h) = (coord("x"), coord("y"), coord("w"), coord("h"));
        Some(Layout::new(x?, y?, w?, h?))
    }

    fn source(&mut self, path: &str, value: &Value) -> Option<DataSource> {
        let fields = self.object(path, value)?;
        let before = self.errors.len();

        let kind = match fields.get("type") {
            Some(Value::String(kind)) => {
                let parsed = SourceKind::parse(kind);
                if parsed.is_none() {
                    self.push(format!("{path}.type"), format!("unknown source type \"{kind}\""));
                }
                parsed
            }
            Some(other) => {
                self.push(format!("{path}.type"), format!("expected a string, got {other}"));
                None
            }
            None => {
                self.push(format!("{path}.type"), "is required");
                None
            }
        };

        let endpoint = match fields.get("endpoint") {
            Some(value) => self.string(&format!("{path}.endpoint"), value),
            None => {
                self.push(format!("{path}.endpoint"), "is required");
                None
            }
        };

        let symbol = match fields.get("symbol") {
            None | Some(Value::Null) => None,
            Some(value) => self.string(&format!("{path}.symbol"), value),
        };

        let params = match fields.get("params") {
            None | Some(Value::Null) => None,
            Some(value) => self.params(&format!("{path}.params"), value),
        };

        if self.errors.len() != before {
            return None;
        }
        Some(DataSource {
            kind: kind?,
            endpoint: endpoint?,
            symbol,
            params,
        })
    }

    fn params(&mut self, path: &str, value: &Value) -> Option<BTreeMap<String, String>> {
        self.string_map(path, value)
    }

    fn string_map(&mut self, path: &str, value: &Value) -> Option<BTreeMap<String, String>> {
        let fields = self.object(path, value)?;
        let before = self.errors.len();
        let map: BTreeMap<String, String> = fields
            .iter()
            .filter_map(|(k, v)| Some((k.clone(), self.string(&format!("{path}.{k}"), v)?)))
            .collect();
        (self.errors.len() == before).then_some(map)
    }

    fn mapper(&mut self, path: &str, value: &Value) -> Option<Vec<String>> {
        let items = match value {
            Value::Array(items) => items,
            // Legacy `{ "fields": [...] }` shape.
            Value::Object(fields) => match fields.get("fields") {
                Some(Value::Array(items)) => items,
                None | Some(Value::Null) => return Some(Vec::new()),
                Some(_) => {
                    self.push(format!("{path}.fields"), "expected an array of strings");
                    return None;
                }
            },
            _ => {
                self.push(path, "expected an array of strings");
                return None;
            }
        };

        let before = self.errors.len();
        let fields: Vec<String> = items
            .iter()
            .enumerate()
            .filter_map(|(i, item)| self.string(&format!("{path}[{i}]"), item))
            .collect();
        (self.errors.len() == before).then_some(fields)
    }

    fn settings(&mut self, path: &str, value: &Value) -> Settings {
        let Some(fields) = self.object(path, value) else {
            return Settings::default();
        };

        let theme = match fields.get("theme") {
            None | Some(Value::Null) => Theme::default(),
            Some(Value::String(theme)) => Theme::parse(theme).unwrap_or_else(|| {
                self.push(format!("{path}.theme"), format!("unknown theme \"{theme}\""));
                Theme::default()
            }),
            Some(other) => {
                self.push(format!("{path}.theme"), format!("expected a string, got {other}"));
                Theme::default()
            }
        };

        let keys = match fields.get("keys") {
            None | Some(Value::Null) => BTreeMap::new(),
            Some(value) => self
                .string_map(&format!("{path}.keys"), value)
                .unwrap_or_default(),
        };

        Settings { theme, keys }
    }
}
