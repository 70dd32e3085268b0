//! Configuration loading and store factory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{Duration, FixedOffset};
use serde::{Deserialize, Serialize};

use examprep_core::engine::ServiceConfig;
use examprep_core::model::AttemptPolicy;
use examprep_core::traits::AttemptStore;

use crate::jsonl::JsonlStore;
use crate::memory::MemoryStore;

/// Where attempt records live.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StoreConfig {
    /// Records vanish when the process exits. Meant for library use and
    /// tests; each CLI invocation would start empty.
    Memory,
    Jsonl { path: PathBuf },
}

impl StoreConfig {
    /// Whether records outlive the process.
    pub fn is_persistent(&self) -> bool {
        !matches!(self, StoreConfig::Memory)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig::Jsonl {
            path: PathBuf::from("./examprep-data/attempts.jsonl"),
        }
    }
}

/// Top-level examprep configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExamprepConfig {
    #[serde(default)]
    pub store: StoreConfig,
    /// User recorded when none is given on the command line.
    #[serde(default = "default_user")]
    pub default_user: String,
    /// How long a user's records stay cached, in seconds.
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,
    /// Zone for day and hour grouping, in minutes east of UTC.
    #[serde(default)]
    pub utc_offset_minutes: i32,
    /// Output directory for reports.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Which attempts count towards progress.
    #[serde(default)]
    pub attempt_policy: AttemptPolicy,
}

fn default_user() -> String {
    "local".to_string()
}
fn default_cache_ttl() -> u64 {
    60
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("./examprep-results")
}

impl Default for ExamprepConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            default_user: default_user(),
            cache_ttl_secs: default_cache_ttl(),
            utc_offset_minutes: 0,
            output_dir: default_output_dir(),
            attempt_policy: AttemptPolicy::All,
        }
    }
}

impl ExamprepConfig {
    /// The zone configured by `utc_offset_minutes`.
    pub fn utc_offset(&self) -> Result<FixedOffset> {
        FixedOffset::east_opt(self.utc_offset_minutes * 60).with_context(|| {
            format!(
                "utc_offset_minutes out of range: {}",
                self.utc_offset_minutes
            )
        })
    }

    /// Settings for the submission service.
    pub fn service_config(&self) -> Result<ServiceConfig> {
        let ttl = i64::try_from(self.cache_ttl_secs).context("cache_ttl_secs too large")?;
        Ok(ServiceConfig {
            cache_ttl: Duration::seconds(ttl),
            utc_offset: self.utc_offset()?,
            attempt_policy: self.attempt_policy,
        })
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
/// Unset variables resolve to an empty string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find("${") {
        let Some(len) = rest[start..].find('}') else {
            break;
        };
        result.push_str(&rest[..start]);
        let var_name = &rest[start + 2..start + len];
        result.push_str(&std::env::var(var_name).unwrap_or_default());
        rest = &rest[start + len + 1..];
    }
    result.push_str(rest);
    result
}

fn resolve_path(path: &Path) -> PathBuf {
    PathBuf::from(resolve_env_vars(&path.to_string_lossy()))
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `examprep.toml` in the current directory
/// 2. `~/.config/examprep/config.toml`
///
/// Environment variable overrides: `EXAMPREP_USER`, `EXAMPREP_STORE_PATH`.
pub fn load_config() -> Result<ExamprepConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<ExamprepConfig> {
    let config_path = match path {
        Some(p) if p.exists() => Some(p.to_path_buf()),
        Some(p) => anyhow::bail!("config file not found: {}", p.display()),
        None => {
            let local = PathBuf::from("examprep.toml");
            if local.exists() {
                Some(local)
            } else {
                dirs_path()
                    .map(|dir| dir.join("config.toml"))
                    .filter(|global| global.exists())
            }
        }
    };

    let mut config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            let config = toml::from_str::<ExamprepConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?;
            tracing::debug!(path = %path.display(), "loaded config");
            config
        }
        None => ExamprepConfig::default(),
    };

    config.default_user = resolve_env_vars(&config.default_user);
    config.output_dir = resolve_path(&config.output_dir);
    if let StoreConfig::Jsonl { path } = &mut config.store {
        *path = resolve_path(path);
    }

    if let Ok(user) = std::env::var("EXAMPREP_USER") {
        config.default_user = user;
    }
    if let Ok(path) = std::env::var("EXAMPREP_STORE_PATH") {
        config.store = StoreConfig::Jsonl {
            path: PathBuf::from(path),
        };
    }

    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("examprep"))
}

/// Create a store instance from its configuration.
pub fn create_store(config: &StoreConfig) -> Arc<dyn AttemptStore> {
    if !config.is_persistent() {
        tracing::warn!("memory store selected; attempts are lost when the process exits");
    }
    match config {
        StoreConfig::Memory => Arc::new(MemoryStore::new()),
        StoreConfig::Jsonl { path } => Arc::new(JsonlStore::new(path.clone())),
    }
}
