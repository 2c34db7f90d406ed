//! Project document store
//!
//! Each project (with its procedures) is kept as one opaque JSON document
//! keyed by its `ID`. [`JsonStore`] keeps every record in a single file.

use crate::error::{PortfolioError, PortfolioResult};
use crate::types::Project;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Persistence of projects keyed by `ID`
pub trait ProjectStore {
    /// All projects, most recently updated first
    fn fetch_all(&self) -> PortfolioResult<Vec<Project>>;

    /// Insert or replace one project; fails when the project has no ID
    fn upsert(&mut self, project: &Project) -> PortfolioResult<String>;

    /// Insert or replace many projects; ID-less projects are skipped
    fn bulk_upsert(&mut self, projects: &[Project]) -> PortfolioResult<usize>;

    /// Remove every project
    fn clear(&mut self) -> PortfolioResult<()>;
}

/// One stored document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectRecord {
    pub id: String,
    pub data: Project,
    pub updated_at: DateTime<Utc>,
}

/// File-backed store: a JSON array of [`ProjectRecord`]
#[derive(Debug, Clone)]
pub struct JsonStore {
    path: PathBuf,
}

impl JsonStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Single project by ID
    pub fn fetch(&self, id: &str) -> PortfolioResult<Option<Project>> {
        Ok(self
            .load()?
            .into_iter()
            .find(|r| r.id == id)
            .map(|r| r.data))
    }

    fn load(&self) -> PortfolioResult<Vec<ProjectRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&content).map_err(|e| {
            PortfolioError::Store(format!(
                "Corrupt store file {}: {}",
                self.path.display(),
                e
            ))
        })
    }

    /// Write through a temp file so readers never see a partial document
    fn save(&self, records: &[ProjectRecord]) -> PortfolioResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_string_pretty(records)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn merge(records: &mut Vec<ProjectRecord>, project: &Project, now: DateTime<Utc>) {
        let record = ProjectRecord {
            id: project.id.clone(),
            data: project.clone(),
            updated_at: now,
        };
        match records.iter_mut().find(|r| r.id == project.id) {
            Some(existing) => *existing = record,
            None => records.push(record),
        }
    }
}

impl ProjectStore for JsonStore {
    fn fetch_all(&self) -> PortfolioResult<Vec<Project>> {
        let mut records = self.load()?;
        // Stable: records written together keep their insertion order
        records.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(records
            .into_iter()
            .filter(|r| !r.data.id.is_empty())
            .map(|r| r.data)
            .collect())
    }

    fn upsert(&mut self, project: &Project) -> PortfolioResult<String> {
        if project.id.trim().is_empty() {
            return Err(PortfolioError::Validation(
                "Project ID is missing".to_string(),
            ));
        }
        let mut records = self.load()?;
        Self::merge(&mut records, project, Utc::now());
        self.save(&records)?;
        debug!(id = %project.id, "project saved");
        Ok(project.id.clone())
    }

    fn bulk_upsert(&mut self, projects: &[Project]) -> PortfolioResult<usize> {
        let valid: Vec<&Project> = projects.iter().filter(|p| !p.id.trim().is_empty()).collect();
        if valid.is_empty() {
            return Ok(0);
        }

        let mut records = self.load()?;
        let now = Utc::now();
        for project in &valid {
            Self::merge(&mut records, project, now);
        }
        self.save(&records)?;
        info!(count = valid.len(), store = %self.path.display(), "projects saved");
        Ok(valid.len())
    }

    fn clear(&mut self) -> PortfolioResult<()> {
        self.save(&[])?;
        info!(store = %self.path.display(), "store cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> (TempDir, JsonStore) {
        let dir = TempDir::new().unwrap();
        let store = JsonStore::new(dir.path().join("data").join("projects.json"));
        (dir, store)
    }

    #[test]
    fn test_missing_file_is_empty_store() {
        let (_dir, store) = store();
        assert!(store.fetch_all().unwrap().is_empty());
    }

    #[test]
    fn test_upsert_requires_id() {
        let (_dir, mut store) = store();
        let result = store.upsert(&Project::default());
        assert!(matches!(result, Err(PortfolioError::Validation(_))));
    }

    #[test]
    fn test_upsert_replaces_existing() {
        let (_dir, mut store) = store();
        let mut project = Project::new("42");
        project.title = "v1".to_string();
        store.upsert(&project).unwrap();
        project.title = "v2".to_string();
        store.upsert(&project).unwrap();

        let all = store.fetch_all().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].title, "v2");
        assert_eq!(store.fetch("42").unwrap().unwrap().title, "v2");
        assert!(store.fetch("43").unwrap().is_none());
    }

    #[test]
    fn test_bulk_upsert_skips_missing_ids() {
        let (_dir, mut store) = store();
        let saved = store
            .bulk_upsert(&[Project::new("1"), Project::new(""), Project::new("2")])
            .unwrap();
        assert_eq!(saved, 2);

        let ids: Vec<String> = store.fetch_all().unwrap().into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[test]
    fn test_empty_bulk_is_noop() {
        let (_dir, mut store) = store();
        assert_eq!(store.bulk_upsert(&[]).unwrap(), 0);
        assert!(!store.path().exists());
    }

    #[test]
    fn test_latest_update_first() {
        let (_dir, mut store) = store();
        store.bulk_upsert(&[Project::new("1"), Project::new("2")]).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        store.upsert(&Project::new("2")).unwrap();

        let ids: Vec<String> = store.fetch_all().unwrap().into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec!["2", "1"]);
    }

    #[test]
    fn test_clear() {
        let (_dir, mut store) = store();
        store.upsert(&Project::new("1")).unwrap();
        store.clear().unwrap();
        assert!(store.fetch_all().unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_file_is_store_error() {
        let (dir, _) = store();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{not json").unwrap();
        let result = JsonStore::new(&path).fetch_all();
        assert!(matches!(result, Err(PortfolioError::Store(_))));
    }
}
