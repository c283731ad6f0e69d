// # File State Store
//
// File-based implementation of StateStore with crash recovery.
//
// ## Crash Recovery
//
// - Atomic writes: write to `<path>.tmp`, then rename over the state file
// - Backup: the previous state file is copied to `<path>.backup` first
// - Corruption: an unparsable state file is replaced by its backup
//
// ## File Format
//
// ```json
// {
//   "version": "1.0",
//   "resources": {
//     "alice_google": {
//       "resource": {
//         "user_pool_id": "eu-west-1_AbCdEf",
//         "destination_user": { "provider_name": "Cognito", "provider_attribute_value": "alice" },
//         "source_user": { "provider_name": "Google", "provider_attribute_name": "Cognito_Subject", "provider_attribute_value": "123" },
//         "id": "eu-west-1_AbCdEf:alice:123"
//       },
//       "last_refreshed": "2026-01-09T12:00:00Z"
//     }
//   }
// }
// ```

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

use crate::Error;
use crate::config::StateStoreConfig;
use crate::model::LinkResource;
use crate::traits::state_store::{StateRecord, StateStore, StateStoreFactory};

/// State file format version
const STATE_FILE_VERSION: &str = "1.0";

/// File-based state store with crash recovery
///
/// Every mutation is written through immediately.
#[derive(Debug)]
pub struct FileStateStore {
    path: PathBuf,
    state: Arc<RwLock<FileState>>,
}

#[derive(Debug)]
struct FileState {
    resources: BTreeMap<String, StateRecord>,
    dirty: bool,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct StateFileFormat {
    version: String,
    resources: BTreeMap<String, StateRecord>,
}

impl FileStateStore {
    /// Create or load a file state store
    ///
    /// Creates missing parent directories. A corrupted file is recovered
    /// from its backup, or replaced by empty state if there is none.
    pub async fn new<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent).await.map_err(|e| {
                Error::config(format!(
                    "Failed to create state directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let resources = Self::load_state_with_recovery(&path).await?;

        Ok(Self {
            path,
            state: Arc::new(RwLock::new(FileState {
                resources,
                dirty: false,
            })),
        })
    }

    async fn load_state_with_recovery(
        path: &Path,
    ) -> Result<BTreeMap<String, StateRecord>, Error> {
        let content = match Self::read_state_file(path).await? {
            Some(content) => content,
            None => {
                tracing::debug!("State file does not exist: {}", path.display());
                return Ok(BTreeMap::new());
            }
        };

        match Self::parse_state(&content) {
            Ok(resources) => {
                tracing::debug!("Loaded state from file: {} resources", resources.len());
                Ok(resources)
            }
            Err(e) => {
                tracing::warn!(
                    "State file {} appears corrupted: {}. Attempting recovery from backup.",
                    path.display(),
                    e
                );

                let backup_path = Self::backup_path(path);
                let Some(backup) = Self::read_state_file(&backup_path).await? else {
                    tracing::warn!("No backup file found. Starting with empty state.");
                    return Ok(BTreeMap::new());
                };

                match Self::parse_state(&backup) {
                    Ok(resources) => {
                        tracing::info!("Recovered state from backup: {} resources", resources.len());
                        if let Err(restore_err) = fs::copy(&backup_path, path).await {
                            tracing::error!(
                                "Failed to restore state file from backup: {}",
                                restore_err
                            );
                        }
                        Ok(resources)
                    }
                    Err(backup_err) => {
                        tracing::error!(
                            "Backup also corrupted: {}. Starting with empty state.",
                            backup_err
                        );
                        Ok(BTreeMap::new())
                    }
                }
            }
        }
    }

    async fn read_state_file(path: &Path) -> Result<Option<String>, Error> {
        if !path.exists() {
            return Ok(None);
        }

        fs::read_to_string(path).await.map(Some).map_err(|e| {
            Error::state_store(format!(
                "Failed to read state file {}: {}",
                path.display(),
                e
            ))
        })
    }

    fn parse_state(content: &str) -> Result<BTreeMap<String, StateRecord>, Error> {
        let state_file: StateFileFormat = serde_json::from_str(content)?;

        if state_file.version != STATE_FILE_VERSION {
            tracing::warn!(
                "State file version mismatch: expected {}, got {}. Attempting to load anyway.",
                STATE_FILE_VERSION,
                state_file.version
            );
        }

        Ok(state_file.resources)
    }

    /// Write state to file atomically
    async fn write_state(&self) -> Result<(), Error> {
        let mut state_guard = self.state.write().await;

        let state_file = StateFileFormat {
            version: STATE_FILE_VERSION.to_string(),
            resources: state_guard.resources.clone(),
        };

        let json = serde_json::to_string_pretty(&state_file)
            .map_err(|e| Error::state_store(format!("Failed to serialize state: {}", e)))?;

        let temp_path = self.temp_path();
        {
            let mut file = fs::File::create(&temp_path).await.map_err(|e| {
                Error::state_store(format!(
                    "Failed to create temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            file.write_all(json.as_bytes()).await.map_err(|e| {
                Error::state_store(format!(
                    "Failed to write to temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            file.flush().await.map_err(|e| {
                Error::state_store(format!(
                    "Failed to flush temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
        }

        if self.path.exists() {
            let backup_path = Self::backup_path(&self.path);
            if let Err(e) = fs::copy(&self.path, &backup_path).await {
                tracing::warn!("Failed to create backup: {}", e);
            }
        }

        fs::rename(&temp_path, &self.path).await.map_err(|e| {
            Error::state_store(format!(
                "Failed to rename {} to {}: {}",
                temp_path.display(),
                self.path.display(),
                e
            ))
        })?;

        state_guard.dirty = false;
        tracing::trace!("State written to file: {}", self.path.display());
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut temp = self.path.clone();
        temp.set_extension("tmp");
        temp
    }

    fn backup_path(path: &Path) -> PathBuf {
        let mut backup = path.to_path_buf();
        backup.set_extension("backup");
        backup
    }
}

#[async_trait]
impl StateStore for FileStateStore {
    async fn get_resource(&self, name: &str) -> Result<Option<LinkResource>, Error> {
        let state_guard = self.state.read().await;
        Ok(state_guard.resources.get(name).map(|r| r.resource.clone()))
    }

    async fn get_record(&self, name: &str) -> Result<Option<StateRecord>, Error> {
        let state_guard = self.state.read().await;
        Ok(state_guard.resources.get(name).cloned())
    }

    async fn set_resource(&self, name: &str, resource: &LinkResource) -> Result<(), Error> {
        {
            let mut state_guard = self.state.write().await;
            state_guard
                .resources
                .insert(name.to_string(), StateRecord::new(resource.clone()));
            state_guard.dirty = true;
        }

        self.write_state().await
    }

    async fn delete_record(&self, name: &str) -> Result<(), Error> {
        {
            let mut state_guard = self.state.write().await;
            state_guard.resources.remove(name);
            state_guard.dirty = true;
        }

        self.write_state().await
    }

    async fn list_records(&self) -> Result<Vec<String>, Error> {
        let state_guard = self.state.read().await;
        Ok(state_guard.resources.keys().cloned().collect())
    }

    async fn flush(&self) -> Result<(), Error> {
        let dirty = self.state.read().await.dirty;
        if dirty {
            self.write_state().await
        } else {
            Ok(())
        }
    }
}

/// Factory for the `file` state store type
pub struct FileStateStoreFactory;

#[async_trait]
impl StateStoreFactory for FileStateStoreFactory {
    async fn create(&self, config: &StateStoreConfig) -> Result<Box<dyn StateStore>, Error> {
        match config {
            StateStoreConfig::File { path } => Ok(Box::new(FileStateStore::new(path).await?)),
            _ => Err(Error::config("Invalid config for file state store")),
        }
    }
}
