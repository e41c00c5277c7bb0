// # File State Store
//
// File-based implementation of StateStore with crash recovery.
//
// ## Crash Recovery
//
// - Atomic writes: write to `<path>.tmp`, then rename over `<path>`
// - Backup: the previous file is copied to `<path>.backup` before each rename
// - Recovery: a file that does not parse is replaced by its backup
//
// ## File Format
//
// ```json
// {
//   "version": "1.0",
//   "records": {
//     "home.example.com": {
//       "last_ip": "1.2.3.4",
//       "last_updated": "2025-01-09T12:00:00Z"
//     }
//   }
// }
// ```

use async_trait::async_trait;
use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

use crate::Error;
use crate::traits::state_store::{StateRecord, StateStore};

/// State file format version
const STATE_FILE_VERSION: &str = "1.0";

/// File-based state store with crash recovery
///
/// Every `set_last_ip` is written through to disk before returning.
///
/// # Example
///
/// ```rust,no_run
/// use ddns_core::state::FileStateStore;
/// use ddns_core::traits::StateStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = FileStateStore::new("/var/lib/ddns/state.json").await?;
///
///     store.set_last_ip("home.example.com", "1.2.3.4".parse()?).await?;
///
///     let ip = store.get_last_ip("home.example.com").await?;
///     assert_eq!(ip, Some("1.2.3.4".parse()?));
///
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct FileStateStore {
    path: PathBuf,
    state: RwLock<FileState>,
}

#[derive(Debug, Default)]
struct FileState {
    records: HashMap<String, StateRecord>,
    dirty: bool,
}

/// Serializable state file format
#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct StateFileFormat {
    version: String,
    records: HashMap<String, StateRecord>,
}

/// Why a state file could not be loaded
enum LoadError {
    /// The file exists but its content is not a valid state file
    Corrupt(Error),
    /// The file could not be read at all
    Unreadable(Error),
}

impl FileStateStore {
    /// Create or load a file state store
    ///
    /// This will:
    /// 1. Create parent directories if needed
    /// 2. Load the existing state file, if any
    /// 3. If it is corrupt, load the backup instead and restore it
    /// 4. If the backup is missing or corrupt too, start with empty state
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

        let records = Self::load_with_recovery(&path).await?;

        Ok(Self {
            path,
            state: RwLock::new(FileState {
                records,
                dirty: false,
            }),
        })
    }

    async fn load_with_recovery(path: &Path) -> Result<HashMap<String, StateRecord>, Error> {
        match Self::load_state(path).await {
            Ok(records) => {
                tracing::debug!("Loaded state from file: {} records", records.len());
                Ok(records)
            }
            Err(LoadError::Unreadable(e)) => Err(e),
            Err(LoadError::Corrupt(e)) => {
                tracing::warn!(
                    "State file appears corrupted: {}. Attempting recovery from backup.",
                    e
                );

                let backup_path = Self::backup_path(path);
                if !backup_path.exists() {
                    tracing::warn!("No backup file found. Starting with empty state.");
                    return Ok(HashMap::new());
                }

                match Self::load_state(&backup_path).await {
                    Ok(records) => {
                        tracing::info!("Recovered state from backup: {} records", records.len());
                        if let Err(restore_err) = fs::copy(&backup_path, path).await {
                            tracing::error!(
                                "Failed to restore state file from backup: {}",
                                restore_err
                            );
                        }
                        Ok(records)
                    }
                    Err(LoadError::Corrupt(backup_err) | LoadError::Unreadable(backup_err)) => {
                        tracing::error!(
                            "Backup also unusable: {}. Starting with empty state.",
                            backup_err
                        );
                        Ok(HashMap::new())
                    }
                }
            }
        }
    }

    async fn load_state(path: &Path) -> Result<HashMap<String, StateRecord>, LoadError> {
        if !path.exists() {
            tracing::debug!("State file does not exist: {}", path.display());
            return Ok(HashMap::new());
        }

        let content = fs::read_to_string(path).await.map_err(|e| {
            LoadError::Unreadable(Error::state_store(format!(
                "Failed to read state file {}: {}",
                path.display(),
                e
            )))
        })?;

        let state_file: StateFileFormat = serde_json::from_str(&content).map_err(|e| {
            LoadError::Corrupt(Error::state_store(format!(
                "Failed to parse state file {}: {}",
                path.display(),
                e
            )))
        })?;

        if state_file.version != STATE_FILE_VERSION {
            tracing::warn!(
                "State file version mismatch: expected {}, got {}. Attempting to load anyway.",
                STATE_FILE_VERSION,
                state_file.version
            );
        }

        Ok(state_file.records)
    }

    /// Write state to file atomically and clear the dirty flag
    async fn write_state(&self, state: &mut FileState) -> Result<(), Error> {
        let state_file = StateFileFormat {
            version: STATE_FILE_VERSION.to_string(),
            records: state.records.clone(),
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
                    "Failed to write temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
            file.sync_all().await.map_err(|e| {
                Error::state_store(format!(
                    "Failed to sync temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
        }

        if self.path.exists()
            && let Err(e) = fs::copy(&self.path, Self::backup_path(&self.path)).await
        {
            tracing::warn!("Failed to create backup: {}", e);
        }

        fs::rename(&temp_path, &self.path).await.map_err(|e| {
            Error::state_store(format!(
                "Failed to rename {} to {}: {}",
                temp_path.display(),
                self.path.display(),
                e
            ))
        })?;

        state.dirty = false;
        tracing::trace!("State written to file: {}", self.path.display());
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        Self::with_suffix(&self.path, "tmp")
    }

    fn backup_path(path: &Path) -> PathBuf {
        Self::with_suffix(path, "backup")
    }

    // "state.json" -> "state.json.backup", keeping the original extension
    fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
        let mut name = path.as_os_str().to_owned();
        name.push(".");
        name.push(suffix);
        PathBuf::from(name)
    }
}

#[async_trait]
impl StateStore for FileStateStore {
    async fn get_last_ip(&self, hostname: &str) -> Result<Option<Ipv4Addr>, Error> {
        let state = self.state.read().await;
        Ok(state.records.get(hostname).map(|r| r.last_ip))
    }

    async fn get_record(&self, hostname: &str) -> Result<Option<StateRecord>, Error> {
        let state = self.state.read().await;
        Ok(state.records.get(hostname).cloned())
    }

    async fn set_last_ip(&self, hostname: &str, ip: Ipv4Addr) -> Result<(), Error> {
        let mut state = self.state.write().await;
        state
            .records
            .insert(hostname.to_string(), StateRecord::new(ip));
        state.dirty = true;

        // Immediate write for durability
        self.write_state(&mut state).await
    }

    async fn flush(&self) -> Result<(), Error> {
        let mut state = self.state.write().await;
        if state.dirty {
            self.write_state(&mut state).await
        } else {
            Ok(())
        }
    }
}
