use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::common::error::{Result, ScraperError};
use crate::pipeline::dates::DateProfile;

fn default_enabled() -> bool {
    true
}

fn default_priority() -> u32 {
    100
}

/// CSS selectors for one listing page layout. Each item selector match is
/// one event; the other selectors run inside it.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ListingSelectors {
    pub item: String,
    pub title: String,
    pub date: String,
    pub link: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub venue: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AdapterSpec {
    HtmlListing {
        urls: Vec<String>,
        selectors: ListingSelectors,
        /// Used when the page has no per-item venue
        #[serde(default)]
        venue: Option<String>,
    },
    JsonFile {
        path: PathBuf,
    },
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SourceSpec {
    pub source_id: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Lower runs first in consolidation; ties break on source id
    #[serde(default = "default_priority")]
    pub priority: u32,
    pub adapter: AdapterSpec,
    #[serde(default)]
    pub dates: DateProfile,
}

/// Source specs loaded from `registry/sources/*.json`, kept in priority order
#[derive(Debug, Clone, Default)]
pub struct SourceRegistry {
    sources: Vec<SourceSpec>,
}

impl SourceRegistry {
    pub fn load_from_directory<P: AsRef<Path>>(registry_dir: P) -> Result<Self> {
        let dir_path = registry_dir.as_ref();
        if !dir_path.exists() {
            return Err(ScraperError::Registry(format!(
                "Registry directory does not exist: {}",
                dir_path.display()
            )));
        }

        let mut sources: Vec<SourceSpec> = Vec::new();
        for entry in fs::read_dir(dir_path)? {
            let path = entry?.path();
            if path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }

            let content = fs::read_to_string(&path)?;
            let spec: SourceSpec = serde_json::from_str(&content).map_err(|e| {
                ScraperError::Registry(format!("Failed to parse source spec {}: {}", path.display(), e))
            })?;

            if sources.iter().any(|s| s.source_id == spec.source_id) {
                return Err(ScraperError::Registry(format!(
                    "Duplicate source_id '{}' in {}",
                    spec.source_id,
                    path.display()
                )));
            }
            debug!("Loaded source spec '{}' from {}", spec.source_id, path.display());
            sources.push(spec);
        }

        Ok(Self::from_specs(sources))
    }

    pub fn from_specs(mut sources: Vec<SourceSpec>) -> Self {
        sources.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.source_id.cmp(&b.source_id)));
        info!("Source registry holds {} sources", sources.len());
        Self { sources }
    }

    pub fn get(&self, source_id: &str) -> Option<&SourceSpec> {
        self.sources.iter().find(|s| s.source_id == source_id)
    }

    pub fn all(&self) -> &[SourceSpec] {
        &self.sources
    }

    /// Enabled specs in priority order, optionally narrowed to `only`.
    /// Unknown ids in `only` are an error so typos don't silently run nothing.
    pub fn enabled_sources(&self, only: Option<&[String]>) -> Result<Vec<SourceSpec>> {
        if let Some(ids) = only {
            if let Some(missing) = ids.iter().find(|id| self.get(id).is_none()) {
                return Err(ScraperError::Registry(format!("Source not found in registry: {}", missing)));
            }
        }

        Ok(self
            .sources
            .iter()
            .filter(|s| s.enabled)
            .filter(|s| only.map_or(true, |ids| ids.iter().any(|id| id == &s.source_id)))
            .cloned()
            .collect())
    }
}
