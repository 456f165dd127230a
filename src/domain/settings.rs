// Global dashboard settings
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const ALPHA_KEY: &str = "alpha";
pub const FINNHUB_KEY: &str = "finnhub";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    #[default]
    Dark,
}

impl Theme {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "light" => Some(Theme::Light),
            "dark" => Some(Theme::Dark),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub theme: Theme,
    /// Provider name to credential. Missing or blank means demo data.
    #[serde(default)]
    pub keys: BTreeMap<String, String>,
}

impl Settings {
    pub fn key_for(&self, provider: &str) -> Option<&str> {
        self.keys
            .get(provider)
            .map(|k| k.trim())
            .filter(|k| !k.is_empty())
    }

    /// Top-level fields overwrite, `keys` merges entry by entry.
    pub fn merge(&mut self, patch: SettingsPatch) {
        if let Some(theme) = patch.theme {
            self.theme = theme;
        }
        if let Some(keys) = patch.keys {
            self.keys.extend(keys);
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SettingsPatch {
    #[serde(default)]
    pub theme: Option<Theme>,
    #[serde(default)]
    pub keys: Option<BTreeMap<String, String>>,
}
