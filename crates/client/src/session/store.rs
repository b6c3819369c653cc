//! Client-local key/value storage for the session token.
//!
//! The token lives under the fixed key [`TOKEN_KEY`]. Other keys in the
//! backing store are left untouched.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use ambulance_tracker_core::SessionToken;
use serde_json::{Map, Value};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::warn;

/// Storage key for the session token.
pub const TOKEN_KEY: &str = "token";

/// Errors from token storage.
#[derive(Debug, Error)]
pub enum TokenStoreError {
    /// Reading or writing the backing file failed.
    #[error("Token store I/O error at {path}: {source}")]
    Io {
        /// Path of the backing file.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The backing file is not a JSON object. Reads report it; writes
    /// replace the file.
    #[error("Token store at {path} is corrupt: {source}")]
    Corrupt {
        /// Path of the backing file.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },

    /// A previous writer panicked while holding the lock.
    #[error("Token store lock poisoned")]
    Poisoned,
}

/// Process-wide storage for the session token.
pub trait TokenStore: Send + Sync {
    /// Persist `token`, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be written.
    fn save(&self, token: &SessionToken) -> Result<(), TokenStoreError>;

    /// Read the persisted token, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be read.
    fn load(&self) -> Result<Option<SessionToken>, TokenStoreError>;

    /// Remove the persisted token. Returns `true` if one was present.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be written.
    fn clear(&self) -> Result<bool, TokenStoreError>;
}

/// Token store backed by a JSON object on disk.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    /// Use the JSON file at `path`, creating it on first save.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Result<Map<String, Value>, TokenStoreError> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(source) => {
                return Err(TokenStoreError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        if contents.trim().is_empty() {
            return Ok(Map::new());
        }

        serde_json::from_str(&contents).map_err(|source| TokenStoreError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    /// Contents for a read-modify-write. An unparseable file is discarded
    /// so a damaged store never blocks later writes; the flag reports it.
    fn read_map_for_update(&self) -> Result<(Map<String, Value>, bool), TokenStoreError> {
        match self.read_map() {
            Err(TokenStoreError::Corrupt { path, source }) => {
                warn!(path = %path.display(), error = %source, "Replacing corrupt token store");
                Ok((Map::new(), true))
            }
            other => other.map(|map| (map, false)),
        }
    }

    /// Replace the file atomically: write a sibling temp file, then rename.
    fn write_map(&self, map: &Map<String, Value>) -> Result<(), TokenStoreError> {
        let io_err = |source: std::io::Error| TokenStoreError::Io {
            path: self.path.clone(),
            source,
        };

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => {
                std::fs::create_dir_all(parent).map_err(io_err)?;
                parent
            }
            _ => Path::new("."),
        };

        let contents = serde_json::to_string_pretty(map).map_err(|source| {
            TokenStoreError::Corrupt {
                path: self.path.clone(),
                source,
            }
        })?;

        let mut file = NamedTempFile::new_in(dir).map_err(io_err)?;
        file.write_all(contents.as_bytes()).map_err(io_err)?;
        file.as_file().sync_all().map_err(io_err)?;
        restrict_permissions(file.path()).map_err(io_err)?;
        file.persist(&self.path).map_err(|e| io_err(e.error))?;
        Ok(())
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

impl TokenStore for FileTokenStore {
    fn save(&self, token: &SessionToken) -> Result<(), TokenStoreError> {
        let (mut map, _) = self.read_map_for_update()?;
        map.insert(TOKEN_KEY.to_string(), Value::String(token.expose().to_string()));
        self.write_map(&map)
    }

    fn load(&self) -> Result<Option<SessionToken>, TokenStoreError> {
        let map = self.read_map()?;
        Ok(map
            .get(TOKEN_KEY)
            .and_then(Value::as_str)
            .map(SessionToken::new))
    }

    fn clear(&self) -> Result<bool, TokenStoreError> {
        let (mut map, reset) = self.read_map_for_update()?;
        let removed = map.remove(TOKEN_KEY).is_some();
        if removed || reset {
            self.write_map(&map)?;
        }
        Ok(removed)
    }
}

/// In-memory token store for tests and ephemeral runs.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    entries: Mutex<HashMap<String, String>>,
    writes: AtomicUsize,
}

impl MemoryTokenStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful `save` calls.
    #[must_use]
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl TokenStore for MemoryTokenStore {
    fn save(&self, token: &SessionToken) -> Result<(), TokenStoreError> {
        self.entries
            .lock()
            .map_err(|_| TokenStoreError::Poisoned)?
            .insert(TOKEN_KEY.to_string(), token.expose().to_string());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn load(&self) -> Result<Option<SessionToken>, TokenStoreError> {
        Ok(self
            .entries
            .lock()
            .map_err(|_| TokenStoreError::Poisoned)?
            .get(TOKEN_KEY)
            .map(SessionToken::new))
    }

    fn clear(&self) -> Result<bool, TokenStoreError> {
        Ok(self
            .entries
            .lock()
            .map_err(|_| TokenStoreError::Poisoned)?
            .remove(TOKEN_KEY)
            .is_some())
    }
}
