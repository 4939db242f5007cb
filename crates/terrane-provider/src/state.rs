//! Tracked-state persistence
//!
//! Manages the `.terrane/state.json` file which records the identity and
//! last observed attributes of every managed resource.

use crate::error::StateError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;

const STATE_VERSION: u32 = 1;
const STATE_DIR: &str = ".terrane";
const STATE_FILE: &str = "state.json";
const STATE_BACKUP: &str = "state.json.backup";

/// Full contents of a state file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateDocument {
    /// State file format version
    pub version: u32,

    /// Last modified timestamp
    pub updated_at: DateTime<Utc>,

    /// Records indexed by `resource_type:id`
    pub resources: HashMap<String, ResourceRecord>,
}

impl Default for StateDocument {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            updated_at: Utc::now(),
            resources: HashMap::new(),
        }
    }
}

impl StateDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a record
    pub fn upsert(&mut self, record: ResourceRecord) {
        self.resources.insert(record.key(), record);
        self.updated_at = Utc::now();
    }

    /// Drop a record by key
    pub fn remove(&mut self, key: &str) -> Option<ResourceRecord> {
        let removed = self.resources.remove(key);
        if removed.is_some() {
            self.updated_at = Utc::now();
        }
        removed
    }

    /// Look up a record by key
    pub fn get(&self, key: &str) -> Option<&ResourceRecord> {
        self.resources.get(key)
    }

    /// All records of one resource type
    pub fn of_type(&self, resource_type: &str) -> Vec<&ResourceRecord> {
        self.resources
            .values()
            .filter(|r| r.resource_type == resource_type)
            .collect()
    }
}

/// Tracked record for a single resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceRecord {
    /// Provider-synthesized identity
    pub id: String,

    /// Resource type
    pub resource_type: String,

    /// Last observed attributes
    pub attributes: serde_json::Value,

    /// When the record was first written
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl ResourceRecord {
    /// Build a record from a typed state snapshot.
    pub fn encode<S: Serialize>(
        resource_type: impl Into<String>,
        id: impl Into<String>,
        state: &S,
    ) -> Result<Self, StateError> {
        let now = Utc::now();
        Ok(Self {
            id: id.into(),
            resource_type: resource_type.into(),
            attributes: serde_json::to_value(state)?,
            created_at: now,
            updated_at: now,
        })
    }

    /// Recover the typed state snapshot.
    pub fn decode<S: serde::de::DeserializeOwned>(&self) -> Result<S, StateError> {
        Ok(serde_json::from_value(self.attributes.clone())?)
    }

    /// Key under which this record is indexed
    pub fn key(&self) -> String {
        format!("{}:{}", self.resource_type, self.id)
    }
}

/// Reads and writes state files under a project root
pub struct StateStore {
    project_root: PathBuf,
}

impl StateStore {
    pub fn new(project_root: impl AsRef<Path>) -> Self {
        Self {
            project_root: project_root.as_ref().to_path_buf(),
        }
    }

    fn state_dir(&self) -> PathBuf {
        self.project_root.join(STATE_DIR)
    }

    fn state_path(&self) -> PathBuf {
        self.state_dir().join(STATE_FILE)
    }

    fn backup_path(&self) -> PathBuf {
        self.state_dir().join(STATE_BACKUP)
    }

    async fn ensure_state_dir(&self) -> Result<(), StateError> {
        let dir = self.state_dir();
        if !dir.exists() {
            fs::create_dir_all(&dir).await?;
            tracing::debug!("Created state directory: {}", dir.display());
        }
        Ok(())
    }

    /// Load the current state, or an empty document if none exists yet.
    pub async fn load(&self) -> Result<StateDocument, StateError> {
        let path = self.state_path();
        if !path.exists() {
            tracing::debug!("State file not found, returning empty state");
            return Ok(StateDocument::new());
        }

        let content = fs::read_to_string(&path).await?;
        let document: StateDocument = serde_json::from_str(&content)?;

        if document.version > STATE_VERSION {
            return Err(StateError::UnsupportedVersion {
                found: document.version,
                supported: STATE_VERSION,
            });
        }

        tracing::debug!("Loaded state with {} resources", document.resources.len());
        Ok(document)
    }

    /// Save the state, keeping the previous file as a backup.
    pub async fn save(&self, document: &StateDocument) -> Result<(), StateError> {
        self.ensure_state_dir().await?;

        let path = self.state_path();
        let backup = self.backup_path();

        if path.exists() {
            if backup.exists() {
                fs::remove_file(&backup).await?;
            }
            fs::rename(&path, &backup).await?;
            tracing::debug!("Created state backup");
        }

        let content = serde_json::to_string_pretty(document)?;
        fs::write(&path, content).await?;

        tracing::debug!("Saved state with {} resources", document.resources.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use tempfile::tempdir;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct FakeState {
        addresses: Vec<String>,
    }

    #[tokio::test]
    async fn test_state_save_load() {
        let temp_dir = tempdir().unwrap();
        let store = StateStore::new(temp_dir.path());

        let mut document = StateDocument::new();
        let record = ResourceRecord::encode(
            "kvstore-security-ip-group",
            "r-abc123:default",
            &FakeState {
                addresses: vec!["10.0.0.1".to_string()],
            },
        )
        .unwrap();
        document.upsert(record);

        store.save(&document).await.unwrap();

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded.resources.len(), 1);
        let record = loaded
            .get("kvstore-security-ip-group:r-abc123:default")
            .unwrap();
        let state: FakeState = record.decode().unwrap();
        assert_eq!(state.addresses, vec!["10.0.0.1".to_string()]);
    }

    #[tokio::test]
    async fn test_empty_state() {
        let temp_dir = tempdir().unwrap();
        let store = StateStore::new(temp_dir.path());

        let document = store.load().await.unwrap();
        assert!(document.resources.is_empty());
    }

    #[tokio::test]
    async fn test_save_keeps_backup() {
        let temp_dir = tempdir().unwrap();
        let store = StateStore::new(temp_dir.path());

        store.save(&StateDocument::new()).await.unwrap();
        store.save(&StateDocument::new()).await.unwrap();

        assert!(temp_dir.path().join(".terrane/state.json").exists());
        assert!(temp_dir.path().join(".terrane/state.json.backup").exists());
    }

    #[tokio::test]
    async fn test_newer_version_rejected() {
        let temp_dir = tempdir().unwrap();
        let store = StateStore::new(temp_dir.path());

        let mut document = StateDocument::new();
        document.version = STATE_VERSION + 1;
        store.save(&document).await.unwrap();

        let err = store.load().await.unwrap_err();
        assert!(matches!(
            err,
            StateError::UnsupportedVersion { found, .. } if found == STATE_VERSION + 1
        ));
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut document = StateDocument::new();
        let record =
            ResourceRecord::encode("kvstore-security-ip-group", "r-abc123:default", &FakeState {
                addresses: vec![],
            })
            .unwrap();
        let key = record.key();
        document.upsert(record);

        assert!(document.remove(&key).is_some());
        assert!(document.remove(&key).is_none());
        assert!(document.resources.is_empty());
    }
}
