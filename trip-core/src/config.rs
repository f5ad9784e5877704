use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fs, path::PathBuf};

use crate::{error::TripError, provider::ProviderId};

/// Credentials for a single provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub api_key: String,
}

/// Base URLs of every upstream. Overridable so tests can point at a mock server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub google_maps: String,
    pub google_weather: String,
    pub google_air_quality: String,
    pub openweather: String,
    pub openai: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            google_maps: "https://maps.googleapis.com".to_string(),
            google_weather: "https://weather.googleapis.com".to_string(),
            google_air_quality: "https://airquality.googleapis.com".to_string(),
            openweather: "https://api.openweathermap.org".to_string(),
            openai: "https://api.openai.com".to_string(),
        }
    }
}

impl Endpoints {
    /// Every endpoint pointed at one base URL.
    pub fn all_at(base: &str) -> Self {
        let base = base.trim_end_matches('/').to_string();
        Self {
            google_maps: base.clone(),
            google_weather: base.clone(),
            google_air_quality: base.clone(),
            openweather: base.clone(),
            openai: base,
        }
    }
}

/// Tunables shared by every run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Timeout applied to every outgoing HTTP request.
    pub timeout_secs: u64,
    /// Attraction radius for batch planning.
    pub batch_radius_km: f64,
    /// Attraction radius for the agent plan.
    pub agent_radius_km: f64,
    pub max_attractions: usize,
    pub endpoints: Endpoints,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            batch_radius_km: 2.0,
            agent_radius_km: 5.0,
            max_attractions: 5,
            endpoints: Endpoints::default(),
        }
    }
}

/// Top-level configuration, built once at startup and passed to every adapter.
///
/// Example TOML:
/// ```toml
/// [providers.google]
/// api_key = "..."
///
/// [settings]
/// timeout_secs = 10
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,

    #[serde(default)]
    pub settings: Settings,
}

impl Config {
    /// Load the config file, then layer `.env` and the process environment on top.
    pub fn from_environment() -> Result<Self> {
        let mut cfg = Self::load()?;
        dotenv::dotenv().ok();
        cfg.apply_env(|name| std::env::var(name).ok());
        Ok(cfg)
    }

    /// Override credentials from environment-style lookups; empty values are ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        for id in ProviderId::all() {
            if let Some(key) = lookup(id.env_var()).filter(|k| !k.trim().is_empty()) {
                self.upsert_provider_api_key(*id, key.trim().to_string());
            }
        }
    }

    /// Load config from disk, or return an empty default if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::config_file_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(&path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(path)
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "trip-planner", "trip-cli")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Set or replace a provider API key.
    pub fn upsert_provider_api_key(&mut self, provider_id: ProviderId, api_key: String) {
        self.providers.insert(provider_id.as_str().to_string(), ProviderConfig { api_key });
    }

    /// Returns API key for a provider, if present.
    pub fn provider_api_key(&self, provider_id: ProviderId) -> Option<&str> {
        self.providers
            .get(provider_id.as_str())
            .map(|cfg| cfg.api_key.as_str())
            .filter(|key| !key.is_empty())
    }

    pub fn is_provider_configured(&self, provider_id: ProviderId) -> bool {
        self.provider_api_key(provider_id).is_some()
    }

    /// The primary provider key, required for every live run.
    pub fn primary_api_key(&self) -> Result<&str, TripError> {
        self.required_key(ProviderId::Google)
    }

    /// The secondary provider is used only when its key is present.
    pub fn secondary_enabled(&self) -> bool {
        self.is_provider_configured(ProviderId::OpenWeather)
    }

    /// The language-model key, required by the live agent narrator only.
    pub fn llm_api_key(&self) -> Result<&str, TripError> {
        self.required_key(ProviderId::OpenAi)
    }

    fn required_key(&self, id: ProviderId) -> Result<&str, TripError> {
        self.provider_api_key(id).ok_or_else(|| {
            TripError::config(format!(
                "No API key configured for provider '{id}'.\n\
                 Hint: set {} in your environment or .env file, or run `trip configure {id}`.",
                id.env_var()
            ))
        })
    }
}
