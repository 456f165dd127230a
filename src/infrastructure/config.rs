use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerSettings,
    pub storage: StorageSettings,
    pub providers: ProviderSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageSettings {
    /// Directory holding one JSON file per store key
    pub dir: String,
    pub key: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProviderSettings {
    pub alpha_base_url: String,
    pub finnhub_base_url: String,
    pub request_timeout_secs: u64,
    /// Simulated latency of the demo provider
    pub mock_latency_ms: u64,
}

impl ServerSettings {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Built-in defaults, then `config/finboard.{toml,json,yaml}` if present,
/// then `FINBOARD__SECTION__KEY` environment variables.
pub fn load_app_config() -> anyhow::Result<AppConfig> {
    load_app_config_from("config/finboard")
}

pub fn load_app_config_from(file: &str) -> anyhow::Result<AppConfig> {
    let settings = config::Config::builder()
        .set_default("server.host", "0.0.0.0")?
        .set_default("server.port", 8080)?
        .set_default("storage.dir", "data")?
        .set_default("storage.key", "finboard:v1")?
        .set_default("providers.alpha_base_url", "https://www.alphavantage.co")?
        .set_default("providers.finnhub_base_url", "https://finnhub.io/api/v1")?
        .set_default("providers.request_timeout_secs", 10)?
        .set_default("providers.mock_latency_ms", 300)?
        .add_source(config::File::with_name(file).required(false))
        .add_source(config::Environment::with_prefix("FINBOARD").separator("__"))
        .build()?;

    Ok(settings.try_deserialize()?)
}

/// Replace `${name}` placeholders in a template
pub fn prepare_template(template: &str, vars: &HashMap<String, String>) -> String {
    let mut result = template.to_string();
    for (key, value) in vars {
        let placeholder = format!("${{{}}}", key);
        result = result.replace(&placeholder, value);
    }
    result
}
