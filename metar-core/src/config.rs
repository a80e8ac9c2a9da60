use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, sync::Arc, time::Duration};

use crate::{
    cache::{CacheStore, DEFAULT_TTL_MINUTES, FileStore, MemoryStore, SystemClock, TtlCache},
    debounce::DEFAULT_WINDOW,
    fetcher::{MetarFetcher, TafFetcher},
    provider::{CheckWxProvider, ReportSource, checkwx::DEFAULT_BASE_URL},
};

/// Environment variable that overrides the stored API key.
pub const API_KEY_ENV: &str = "CHECKWX_API_KEY";

/// Airport shown before the user types anything.
pub const DEFAULT_AIRPORT: &str = "EHAM";

/// Upstream API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    Memory,
    #[default]
    File,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub backend: CacheBackend,
    pub ttl_minutes: i64,
    /// Overrides the platform cache location for the file backend.
    pub path: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::default(),
            ttl_minutes: DEFAULT_TTL_MINUTES,
            path: None,
        }
    }
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// default_airport = "EGKK"
///
/// [api]
/// api_key = "..."
///
/// [cache]
/// backend = "memory"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub debounce_ms: u64,
    pub default_airport: Option<String>,
    pub api: ApiConfig,
    pub cache: CacheConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_WINDOW.as_millis() as u64,
            default_airport: Some(DEFAULT_AIRPORT.to_string()),
            api: ApiConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

impl Config {
    /// Load config from disk (or defaults on first run), then apply env overrides.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        let mut cfg = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            Self::from_toml(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            Self::default()
        };

        cfg.apply_env(|name| std::env::var(name).ok());
        Ok(cfg)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
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

        Ok(())
    }

    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("dev", "metar", "metar-cli")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))
    }

    pub fn config_file_path() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.config_dir().join("config.toml"))
    }

    /// Location of the file-backed report cache.
    pub fn cache_file_path(&self) -> Result<PathBuf> {
        match &self.cache.path {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::project_dirs()?.cache_dir().join("reports.json")),
        }
    }

    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = lookup(API_KEY_ENV).filter(|k| !k.trim().is_empty()) {
            self.api.api_key = Some(key);
        }
    }

    pub fn set_api_key(&mut self, api_key: String) {
        self.api.api_key = Some(api_key);
    }

    pub fn api_key(&self) -> Result<&str> {
        self.api.api_key.as_deref().filter(|k| !k.is_empty()).ok_or_else(|| {
            anyhow!(
                "No CheckWX API key configured.\n\
                 Hint: run `metar configure` or set {API_KEY_ENV}."
            )
        })
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.cache.ttl_minutes)
    }

    pub fn build_cache(&self) -> Result<TtlCache> {
        let store: Arc<dyn CacheStore> = match self.cache.backend {
            CacheBackend::Memory => Arc::new(MemoryStore::new()),
            CacheBackend::File => Arc::new(FileStore::new(self.cache_file_path()?)),
        };
        Ok(TtlCache::new(store, Arc::new(SystemClock)))
    }

    pub fn build_provider(&self) -> Result<Arc<dyn ReportSource>> {
        let provider = CheckWxProvider::new(
            self.api_key()?.to_string(),
            &self.api.base_url,
            Duration::from_secs(self.api.timeout_secs),
        )?;
        Ok(Arc::new(provider))
    }

    /// METAR and TAF fetchers sharing one provider and one cache.
    pub fn build_fetchers(&self) -> Result<(MetarFetcher, TafFetcher)> {
        let source = self.build_provider()?;
        let cache = self.build_cache()?;
        let metar = MetarFetcher::new(source.clone(), cache.clone()).with_ttl(self.ttl());
        let taf = TafFetcher::new(source, cache).with_ttl(self.ttl());
        Ok((metar, taf))
    }
}
