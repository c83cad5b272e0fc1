//! Site configuration loaded from `config.json` in the working directory.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {0}: {1}")]
    Read(PathBuf, std::io::Error),

    #[error("failed to parse config file {0}: {1}")]
    Parse(PathBuf, serde_json::Error),
}

/// Site configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteConfig {
    /// URL of the Notion table that drives the site.
    pub url: String,

    /// Theme name, resolved against `<workDir>/themes/`.
    pub theme: String,

    /// Absolute base URL of the published site, used for the sitemap.
    #[serde(default = "default_site_url")]
    pub site_url: String,
}

fn default_site_url() -> String {
    "https://example.com".to_string()
}

impl SiteConfig {
    /// Load the config from `<workDir>/config.json`.
    pub fn load(work_dir: &Path) -> Result<Self, ConfigError> {
        let path = work_dir.join("config.json");
        let content =
            std::fs::read_to_string(&path).map_err(|e| ConfigError::Read(path.clone(), e))?;
        serde_json::from_str(&content).map_err(|e| ConfigError::Parse(path, e))
    }
}
