//! Lightweight configuration loader and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env vars
//! (nested keys separated by `__`, e.g. `APP_ENGINE__SEARCH__DEFAULT_K=8`).
//! Provides helpers to expand `~` and `${VAR}` and to resolve relative paths
//! against a known base directory.

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::Error;

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
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment };
        config.engine()?;
        Ok(config)
    }

    pub fn from_figment(figment: Figment) -> Self { Self { figment } }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    /// The `[engine]` table, with defaults for anything not set.
    pub fn engine(&self) -> Result<EngineConfig, Error> {
        let cfg = match self.figment.extract_inner::<EngineConfig>("engine") {
            Ok(cfg) => cfg,
            Err(e) if e.missing() => EngineConfig::default(),
            Err(e) => return Err(Error::InvalidConfig(e.to_string())),
        };
        cfg.validate()?;
        Ok(cfg)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub keyword: KeywordConfig,
    pub search: SearchConfig,
    pub storage: StorageConfig,
    pub embedding: EmbeddingConfig,
    pub classifier: ClassifierConfig,
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), Error> {
        if self.keyword.min_len == 0 {
            return Err(Error::InvalidConfig("keyword.min_len must be at least 1".into()));
        }
        if self.keyword.min_len > self.keyword.max_len {
            return Err(Error::InvalidConfig(format!(
                "keyword.min_len ({}) exceeds keyword.max_len ({})",
                self.keyword.min_len, self.keyword.max_len
            )));
        }
        if self.search.default_k == 0 {
            return Err(Error::InvalidConfig("search.default_k must be at least 1".into()));
        }
        if self.embedding.fake_dim == 0 {
            return Err(Error::InvalidConfig("embedding.fake_dim must be at least 1".into()));
        }
        Ok(())
    }
}

/// Token length window (in characters) for keyword extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeywordConfig {
    pub min_len: usize,
    pub max_len: usize,
}

impl Default for KeywordConfig {
    fn default() -> Self { Self { min_len: 2, max_len: 20 } }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub default_k: usize,
    pub use_fusion: bool,
}

impl Default for SearchConfig {
    fn default() -> Self { Self { default_k: 4, use_fusion: true } }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub general_dir: String,
    pub domain_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { general_dir: "data/indexes/general".to_string(), domain_dir: "data/indexes/domain".to_string() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub model_dir: Option<String>,
    pub use_fake: bool,
    pub fake_dim: usize,
    pub max_len: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self { Self { model_dir: None, use_fake: false, fake_dim: 384, max_len: 256 } }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub domain_terms: Vec<String>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        let terms = [
            "law", "legal", "legislation", "regulation", "statute", "decree", "ordinance", "clause",
            "article", "enforcement", "penalty", "법", "법률", "법령", "조례", "규정", "규칙", "시행령",
            "조항", "판례", "처벌",
        ];
        Self { domain_terms: terms.iter().map(|s| s.to_string()).collect() }
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
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}
