use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat, Source};
use serde::Deserialize;
use std::time::Duration;

const DEFAULT_CONFIG_PATH: &str = "config.toml";
const ENV_PREFIX: &str = "LOCATION_API";

/// Application configuration, loaded once at startup
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub geocoding: GeocodingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_max_age_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 7131,
            cors_max_age_secs: 5,
        }
    }
}

impl ServerConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn cors_max_age(&self) -> Duration {
        Duration::from_secs(self.cors_max_age_secs)
    }
}

/// ArangoDB connection settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub url: String,
    pub database: String,
    pub collection: String,
    pub username: String,
    pub password: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8529".to_string(),
            database: "mydb".to_string(),
            collection: "locations".to_string(),
            username: "root".to_string(),
            password: String::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeocodingConfig {
    pub base_url: String,
    pub api_key: String,
    /// Lookups in flight per PATCH; 1 resolves entries one after another
    pub concurrency: usize,
}

impl Default for GeocodingConfig {
    fn default() -> Self {
        Self {
            base_url: "https://maps.googleapis.com/maps/api/geocode/json".to_string(),
            api_key: String::new(),
            concurrency: 1,
        }
    }
}

impl AppConfig {
    /// Load `LOCATION_API_CONFIG` (or `config.toml`), then apply
    /// `LOCATION_API__<SECTION>__<FIELD>` environment overrides
    pub fn load() -> Result<Self> {
        let path = std::env::var("LOCATION_API_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::from_sources(File::new(&path, FileFormat::Toml).required(false), environment())
    }

    fn from_sources<S>(file: S, environment: Environment) -> Result<Self>
    where
        S: Source + Send + Sync + 'static,
    {
        let config = Config::builder()
            .add_source(file)
            .add_source(environment)
            .build()
            .context("Failed to read configuration")?;
        config
            .try_deserialize()
            .context("Invalid configuration")
    }
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}
