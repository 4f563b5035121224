use crate::errors::ConfigError;
use std::env;

const DEFAULT_PORT: u16 = 8080;

/// Values that ship in templates and must be replaced before deploying.
const PLACEHOLDERS: &[&str] = &["your-project", "your-anon-key", "changeme", "replace-me"];

#[derive(Debug, Clone, PartialEq)]
pub struct StoreConfig {
    pub url: String,
    pub anon_key: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StoreBackend {
    Rest(StoreConfig),
    Memory,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub port: u16,
    pub store: StoreBackend,
    pub mock_host: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let port = lookup("PORT")
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(DEFAULT_PORT);

        let mock_host = lookup("APP_MOCK_HOST")
            .map(|value| matches!(value.trim(), "1" | "true" | "yes"))
            .unwrap_or(false);

        let store = match lookup("APP_STORE").as_deref().map(str::trim) {
            None | Some("") | Some("rest") => StoreBackend::Rest(StoreConfig {
                url: required(&lookup, "SUPABASE_URL")?,
                anon_key: required(&lookup, "SUPABASE_ANON_KEY")?,
            }),
            Some("memory") => StoreBackend::Memory,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: "APP_STORE",
                    reason: format!("unknown backend `{other}`"),
                });
            }
        };

        if let StoreBackend::Rest(config) = &store {
            if !(config.url.starts_with("https://") || config.url.starts_with("http://")) {
                return Err(ConfigError::Invalid {
                    name: "SUPABASE_URL",
                    reason: "must start with http:// or https://".into(),
                });
            }
        }

        Ok(Self {
            port,
            store,
            mock_host,
        })
    }
}

fn required(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<String, ConfigError> {
    let value = lookup(name).map(|v| v.trim().to_string()).unwrap_or_default();
    if value.is_empty() {
        return Err(ConfigError::Missing { name });
    }
    if is_placeholder(&value) {
        return Err(ConfigError::Placeholder { name });
    }
    Ok(value)
}

fn is_placeholder(value: &str) -> bool {
    let lowered = value.to_ascii_lowercase();
    (lowered.starts_with('<') && lowered.ends_with('>'))
        || PLACEHOLDERS.iter().any(|p| lowered.contains(p))
}
