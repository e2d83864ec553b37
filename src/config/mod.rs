// src/config/mod.rs
//! Runtime configuration: TOML or JSON file plus environment overrides.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::analyze::geo::GeoConfig;
use crate::ingest::fetch::{FetchPolicy, DEFAULT_USER_AGENT};
use crate::source_quality::SourceQualityConfig;

pub const ENV_CONFIG_PATH: &str = "GEO_MONITOR_CONFIG";
pub const ENV_DATABASE_URL: &str = "DATABASE_URL";
pub const ENV_BIND_ADDR: &str = "BIND_ADDR";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub fetch: FetchConfig,
    pub ingest: IngestConfig,
    pub quality: SourceQualityConfig,
    pub geo: GeoConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8000".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub database_url: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://events.db".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub max_retries: u32,
    pub backoff_base_ms: u64,
    pub backoff_max_ms: u64,
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 20,
            connect_timeout_secs: 5,
            max_retries: 3,
            backoff_base_ms: 600,
            backoff_max_ms: 6000,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl FetchConfig {
    pub fn policy(&self) -> FetchPolicy {
        FetchPolicy {
            timeout: Duration::from_secs(self.timeout_secs.max(1)),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs.max(1)),
            max_retries: self.max_retries,
            backoff_base: Duration::from_millis(self.backoff_base_ms),
            backoff_max: Duration::from_millis(self.backoff_max_ms.max(self.backoff_base_ms)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Lookback used by `POST /ingest/run` when `days` is omitted.
    pub default_days: u32,
    pub gdelt_max_records: u32,
    pub state_dept_feeds: Vec<String>,
    /// Per-source cap override; `None` keeps each adapter's own cap.
    pub max_items_per_source: Option<usize>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            default_days: 7,
            gdelt_max_records: 100,
            state_dept_feeds: Vec::new(),
            max_items_per_source: None,
        }
    }
}

impl MonitorConfig {
    /// Load from an explicit path. Format follows the extension (`.toml` / `.json`),
    /// falling back to trying both.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let cfg = parse_config(&content, ext.as_str())
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(cfg.sanitized())
    }

    /// Load using env var + fallbacks, then apply env overrides:
    /// 1) $GEO_MONITOR_CONFIG
    /// 2) config/monitor.toml
    /// 3) config/monitor.json
    /// 4) built-in defaults
    pub fn load_default() -> Result<Self> {
        let mut cfg = match std::env::var(ENV_CONFIG_PATH) {
            Ok(p) => {
                let pb = PathBuf::from(p);
                if !pb.exists() {
                    return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
                }
                Self::load_from(&pb)?
            }
            Err(_) => {
                let toml_p = PathBuf::from("config/monitor.toml");
                let json_p = PathBuf::from("config/monitor.json");
                if toml_p.exists() {
                    Self::load_from(&toml_p)?
                } else if json_p.exists() {
                    Self::load_from(&json_p)?
                } else {
                    Self::default()
                }
            }
        };
        cfg.apply_env_overrides();
        Ok(cfg)
    }

    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var(ENV_DATABASE_URL) {
            if !url.trim().is_empty() {
                self.store.database_url = url.trim().to_string();
            }
        }
        if let Ok(bind) = std::env::var(ENV_BIND_ADDR) {
            if !bind.trim().is_empty() {
                self.server.bind = bind.trim().to_string();
            }
        }
    }

    fn sanitized(mut self) -> Self {
        self.ingest.default_days = self.ingest.default_days.clamp(1, 30);
        self.ingest.gdelt_max_records = self.ingest.gdelt_max_records.clamp(1, 250);
        self.ingest.state_dept_feeds = self
            .ingest
            .state_dept_feeds
            .into_iter()
            .map(|f| f.trim().to_string())
            .filter(|f| !f.is_empty())
            .collect();
        if self.fetch.user_agent.trim().is_empty() {
            self.fetch.user_agent = DEFAULT_USER_AGENT.to_string();
        }
        self.quality = self.quality.normalized();
        self
    }
}

fn parse_config(s: &str, hint_ext: &str) -> Result<MonitorConfig> {
    if hint_ext == "json" {
        return Ok(serde_json::from_str(s)?);
    }
    if hint_ext == "toml" {
        return Ok(toml::from_str(s)?);
    }
    if let Ok(v) = toml::from_str(s) {
        return Ok(v);
    }
    serde_json::from_str(s).map_err(|_| anyhow!("unsupported config format"))
}
