//! Lightweight configuration loader and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` +
//! `WIKIVEC_*` env vars into typed settings sections. Provides helpers
//! to expand `~` and `${VAR}` and to resolve relative paths against a
//! known base directory.

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::new().merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("WIKIVEC_").split("__"));

        Ok(Self { figment })
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    /// Extracts the full typed settings tree; absent keys fall back to
    /// the section defaults.
    pub fn settings(&self) -> anyhow::Result<Settings> {
        self.figment
            .extract()
            .map_err(|e| anyhow::anyhow!("Failed to extract settings: {}", e))
    }
}

/// Root settings tree for the pipeline.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub crawl: CrawlConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

/// Traversal policy: seeds, depth bound, politeness and retry limits.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    pub base_url: String,
    pub seed_paths: Vec<String>,
    pub max_depth: u8,
    pub fetch_delay_ms: u64,
    pub fetch_timeout_secs: u64,
    pub max_retries: u32,
    pub min_content_len: usize,
    pub max_snippet_len: usize,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            base_url: "https://wiki.seeedstudio.com".to_string(),
            seed_paths: vec![
                "/".to_string(),
                "/Getting_Started/".to_string(),
                "/Grove/".to_string(),
                "/XIAO/".to_string(),
                "/SenseCAP/".to_string(),
                "/reComputer/".to_string(),
                "/zh/".to_string(),
                "/zh/Getting_Started/".to_string(),
                "/zh/Grove/".to_string(),
                "/zh/XIAO/".to_string(),
            ],
            max_depth: 4,
            fetch_delay_ms: 500,
            fetch_timeout_secs: 15,
            max_retries: 2,
            min_content_len: 50,
            max_snippet_len: 800,
        }
    }
}

/// Embedding service endpoint (Ollama-style HTTP API).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub endpoint: String,
    pub model: String,
    pub dim: usize,
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:11434".to_string(),
            model: "nomic-embed-text".to_string(),
            dim: 768,
            timeout_secs: 30,
        }
    }
}

/// Daemon cadence: short incremental interval, long full-refresh
/// interval, and the daily local-midnight boundary.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub incremental_minutes: u64,
    pub full_hours: u64,
    pub tick_secs: u64,
    pub midnight_refresh: bool,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            incremental_minutes: 30,
            full_hours: 24,
            tick_secs: 60,
            midnight_refresh: true,
        }
    }
}

/// Snapshot root and retention.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub data_dir: String,
    pub keep_generations: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: "./data_base".to_string(),
            keep_generations: 2,
        }
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    // Expand env vars first
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    // Expand ~ at start
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() {
        p
    } else {
        base.join(p)
    }
}
