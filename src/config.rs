//! Runtime configuration
//!
//! Read from an optional YAML file, then overridden by `PORTFOLIO_*`
//! environment variables. Passed explicitly to every component.

use crate::attachments::{LocalAttachmentStore, DEFAULT_BUCKET};
use crate::error::{PortfolioError, PortfolioResult};
use crate::excel::DEFAULT_EXPORT_FILE;
use crate::numbering::BuyerRegistry;
use crate::store::JsonStore;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const ENV_STORE: &str = "PORTFOLIO_STORE";
pub const ENV_ATTACHMENTS: &str = "PORTFOLIO_ATTACHMENTS";
pub const ENV_BUCKET: &str = "PORTFOLIO_BUCKET";
pub const ENV_PUBLIC_URL: &str = "PORTFOLIO_PUBLIC_URL";
pub const ENV_BUYERS: &str = "PORTFOLIO_BUYERS";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// JSON document store file
    pub store_path: PathBuf,
    /// Root directory holding the attachment bucket
    pub attachments_dir: PathBuf,
    pub bucket: String,
    /// Prefix of public attachment URLs
    pub public_base_url: String,
    /// Buyer reference workbook (`Personne` / `Trigramme`)
    pub buyers_path: Option<PathBuf>,
    pub export_file_name: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from("data/projects.json"),
            attachments_dir: PathBuf::from("data/attachments"),
            bucket: DEFAULT_BUCKET.to_string(),
            public_base_url: "http://127.0.0.1:8080/files".to_string(),
            buyers_path: None,
            export_file_name: DEFAULT_EXPORT_FILE.to_string(),
        }
    }
}

impl AppConfig {
    /// Defaults, then `path` (if any), then environment overrides
    pub fn load(path: Option<&Path>) -> PortfolioResult<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> PortfolioResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            PortfolioError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(yaml: &str) -> PortfolioResult<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Override fields from `lookup` (an environment reader); blank values are ignored
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get(ENV_STORE) {
            self.store_path = PathBuf::from(v);
        }
        if let Some(v) = get(ENV_ATTACHMENTS) {
            self.attachments_dir = PathBuf::from(v);
        }
        if let Some(v) = get(ENV_BUCKET) {
            self.bucket = v;
        }
        if let Some(v) = get(ENV_PUBLIC_URL) {
            self.public_base_url = v;
        }
        if let Some(v) = get(ENV_BUYERS) {
            self.buyers_path = Some(PathBuf::from(v));
        }
    }

    pub fn store(&self) -> JsonStore {
        JsonStore::new(&self.store_path)
    }

    pub fn attachment_store(&self) -> LocalAttachmentStore {
        LocalAttachmentStore::new(&self.attachments_dir, &self.bucket, &self.public_base_url)
    }

    /// Buyer directory; empty (every trigram `ZZZ`) when none is configured
    /// or the reference sheet cannot be read
    pub fn buyers(&self) -> BuyerRegistry {
        match &self.buyers_path {
            Some(path) => BuyerRegistry::from_workbook(path).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "buyer reference unavailable");
                BuyerRegistry::new()
            }),
            None => {
                debug!("no buyer reference configured");
                BuyerRegistry::new()
            }
        }
    }
}
