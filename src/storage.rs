//! # Project Storage
//!
//! A string key/value [`StoragePort`] plus the [`ProjectCatalog`] that keeps
//! saved sheets and an index of their metadata on top of it.
//!
//! ## Keys
//! - `stratum_catalog_index` - JSON array of [`ProjectMeta`]
//! - `stratum_project_{id}` - JSON of one [`TabSheet`]
//!
//! ## Failure Policy
//! Storage problems never reach the editing core as errors: the catalog logs
//! them and reports `None`, `false` or an empty list.

use crate::error::StratumError;
use crate::model::TabSheet;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub const CATALOG_INDEX_KEY: &str = "stratum_catalog_index";
pub const PROJECT_KEY_PREFIX: &str = "stratum_project_";

pub type StorageResult<T> = Result<T, StratumError>;

/// Key/value backend for persisted projects
pub trait StoragePort {
    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    fn set(&mut self, key: &str, value: &str) -> StorageResult<()>;

    /// Remove a key. Returns true if it existed.
    fn remove(&mut self, key: &str) -> StorageResult<bool>;

    /// All stored keys, sorted.
    fn list(&self) -> StorageResult<Vec<String>>;
}

/// In-memory backend (tests, wasm sessions without persistence)
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StoragePort for MemoryStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> StorageResult<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> StorageResult<bool> {
        Ok(self.entries.remove(key).is_some())
    }

    fn list(&self) -> StorageResult<Vec<String>> {
        Ok(self.entries.keys().cloned().collect())
    }
}

/// One `<key>.json` file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> StorageResult<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(StratumError::Storage(format!("invalid storage key '{}'", key)));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

impl StoragePort for FileStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let path = self.path_for(key)?;
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(std::fs::read_to_string(path)?))
    }

    fn set(&mut self, key: &str, value: &str) -> StorageResult<()> {
        let path = self.path_for(key)?;
        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(path, value)?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> StorageResult<bool> {
        let path = self.path_for(key)?;
        if !path.exists() {
            return Ok(false);
        }
        std::fs::remove_file(path)?;
        Ok(true)
    }

    fn list(&self) -> StorageResult<Vec<String>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let mut keys = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                keys.push(stem.to_string());
            }
        }
        keys.sort();
        Ok(keys)
    }
}

/// Index entry for a saved project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectMeta {
    pub id: Uuid,
    pub title: String,
    pub artist: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub last_modified: DateTime<Utc>,
}

/// Saved projects plus their index, over any [`StoragePort`].
///
/// # Example
/// ```
/// use stratum::storage::{MemoryStore, ProjectCatalog};
/// use stratum::TabSheet;
///
/// let mut catalog = ProjectCatalog::new(MemoryStore::new());
/// let meta = catalog.save(&TabSheet::blank()).unwrap();
/// let loaded = catalog.load(meta.id).unwrap();
/// assert_eq!(loaded.id, Some(meta.id));
/// assert_eq!(catalog.list().len(), 1);
/// ```
#[derive(Debug)]
pub struct ProjectCatalog<S: StoragePort> {
    store: S,
}

impl<S: StoragePort> ProjectCatalog<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Persist a sheet, assigning an id if it has none.
    ///
    /// The index entry for the id is replaced (or added) with fresh metadata.
    pub fn save(&mut self, sheet: &TabSheet) -> Option<ProjectMeta> {
        let id = sheet.id.unwrap_or_else(Uuid::new_v4);
        let record = sheet.with_id(id);
        let meta = ProjectMeta {
            id,
            title: record.title.clone(),
            artist: record.artist.clone(),
            last_modified: Utc::now(),
        };
        match self.try_save(&record, &meta) {
            Ok(()) => {
                log::info!(target: "storage", "saved project {} '{}'", id, meta.title);
                Some(meta)
            }
            Err(e) => {
                log::error!(target: "storage", "failed to save project {}: {}", id, e);
                None
            }
        }
    }

    fn try_save(&mut self, record: &TabSheet, meta: &ProjectMeta) -> StorageResult<()> {
        let mut index = self.read_index()?;
        let json = serde_json::to_string(record)?;
        self.store.set(&project_key(meta.id), &json)?;

        index.retain(|m| m.id != meta.id);
        index.push(meta.clone());
        self.write_index(&index)
    }

    /// Load a saved sheet; missing or unreadable records yield `None`.
    pub fn load(&self, id: Uuid) -> Option<TabSheet> {
        let raw = match self.store.get(&project_key(id)) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                log::warn!(target: "storage", "project {} not found", id);
                return None;
            }
            Err(e) => {
                log::error!(target: "storage", "failed to read project {}: {}", id, e);
                return None;
            }
        };
        match serde_json::from_str::<TabSheet>(&raw) {
            Ok(sheet) => Some(sheet),
            Err(e) => {
                log::error!(target: "storage", "corrupt project record {}: {}", id, e);
                None
            }
        }
    }

    /// Index entries, most recently modified first.
    pub fn list(&self) -> Vec<ProjectMeta> {
        match self.read_index() {
            Ok(mut index) => {
                index.sort_by(|a, b| b.last_modified.cmp(&a.last_modified));
                index
            }
            Err(e) => {
                log::error!(target: "storage", "failed to read catalog index: {}", e);
                Vec::new()
            }
        }
    }

    /// Drop a project record and its index entry. Returns false on failure
    /// or when the project was not in the catalog.
    pub fn delete(&mut self, id: Uuid) -> bool {
        match self.try_delete(id) {
            Ok(existed) => existed,
            Err(e) => {
                log::error!(target: "storage", "failed to delete project {}: {}", id, e);
                false
            }
        }
    }

    fn try_delete(&mut self, id: Uuid) -> StorageResult<bool> {
        let removed_record = self.store.remove(&project_key(id))?;
        let mut index = self.read_index()?;
        let before = index.len();
        index.retain(|m| m.id != id);
        let removed_entry = index.len() != before;
        if removed_entry {
            self.write_index(&index)?;
        }
        Ok(removed_record || removed_entry)
    }

    fn read_index(&self) -> StorageResult<Vec<ProjectMeta>> {
        match self.store.get(CATALOG_INDEX_KEY)? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(Vec::new()),
        }
    }

    fn write_index(&mut self, index: &[ProjectMeta]) -> StorageResult<()> {
        let json = serde_json::to_string(index)?;
        self.store.set(CATALOG_INDEX_KEY, &json)
    }
}

fn project_key(id: Uuid) -> String {
    format!("{}{}", PROJECT_KEY_PREFIX, id)
}
