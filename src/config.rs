use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::common::constants::{
    DEFAULT_MAX_CONCURRENT_SOURCES, DEFAULT_OUTPUT_DIR, DEFAULT_REGISTRY_DIR,
    DEFAULT_RESOLVER_ENDPOINT, DEFAULT_RESOLVER_MODEL, DEFAULT_SOURCE_TIMEOUT_SECS,
    DEFAULT_WINDOW_MONTHS, OPENAI_KEY_ENV,
};
use crate::common::error::{Result, ScraperError};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub pipeline: PipelineConfig,
    pub resolver: ResolverConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub registry_dir: PathBuf,
    pub output_dir: PathBuf,
    pub max_concurrent_sources: usize,
    pub source_timeout_secs: u64,
    /// Upper bound of the listing window in months from today; 0 keeps every future date
    pub window_months: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            registry_dir: PathBuf::from(DEFAULT_REGISTRY_DIR),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            max_concurrent_sources: DEFAULT_MAX_CONCURRENT_SOURCES,
            source_timeout_secs: DEFAULT_SOURCE_TIMEOUT_SECS,
            window_months: DEFAULT_WINDOW_MONTHS,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    pub enabled: bool,
    pub endpoint: String,
    pub model: String,
    pub timeout_seconds: u64,
    pub requests_per_min: Option<u64>,
    pub concurrency: Option<u32>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: DEFAULT_RESOLVER_ENDPOINT.to_string(),
            model: DEFAULT_RESOLVER_MODEL.to_string(),
            timeout_seconds: 30,
            requests_per_min: Some(30),
            concurrency: Some(2),
        }
    }
}

impl ResolverConfig {
    /// API key for the resolver service, read from the environment (or `.env`)
    pub fn api_key(&self) -> Option<String> {
        std::env::var(OPENAI_KEY_ENV)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }
}

impl Config {
    /// Load `config.toml` from the given path. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| {
            ScraperError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        if config.pipeline.max_concurrent_sources == 0 {
            return Err(ScraperError::Config(
                "pipeline.max_concurrent_sources must be at least 1".into(),
            ));
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config = Config::from_toml(
            r#"
            [pipeline]
            window_months = 6

            [resolver]
            model = "gpt-4o"
            "#,
        )
        .unwrap();

        assert_eq!(config.pipeline.window_months, 6);
        assert_eq!(config.pipeline.registry_dir, PathBuf::from(DEFAULT_REGISTRY_DIR));
        assert_eq!(config.resolver.model, "gpt-4o");
        assert_eq!(config.resolver.endpoint, DEFAULT_RESOLVER_ENDPOINT);
        assert!(config.resolver.enabled);
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let result = Config::from_toml("[pipeline]\nmax_concurrent_sources = 0\n");
        assert!(matches!(result, Err(ScraperError::Config(_))));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = Config::load(Path::new("/nonexistent/mms/config.toml")).unwrap();
        assert_eq!(config.pipeline.window_months, DEFAULT_WINDOW_MONTHS);
    }
}
