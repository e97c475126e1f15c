//! Durable key/value storage for the credential pair.

use crate::credentials::{Credentials, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY};
use crate::error::StoreError;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Key/value store holding the session tokens.
///
/// Absence of a key is a valid state meaning "logged out".
pub trait CredentialStore: Send + Sync {
    /// Read a value.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Write a value.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Remove a value. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), StoreError>;

    /// Remove every value.
    fn clear(&self) -> Result<(), StoreError>;

    /// The stored access token.
    fn access_token(&self) -> Result<Option<String>, StoreError> {
        self.get(ACCESS_TOKEN_KEY)
    }

    /// The stored refresh token.
    fn refresh_token(&self) -> Result<Option<String>, StoreError> {
        self.get(REFRESH_TOKEN_KEY)
    }

    /// Persist a credential pair. A missing refresh token removes the stored one.
    fn store_credentials(&self, credentials: &Credentials) -> Result<(), StoreError> {
        self.set(ACCESS_TOKEN_KEY, &credentials.access_token)?;
        match &credentials.refresh_token {
            Some(token) => self.set(REFRESH_TOKEN_KEY, token),
            None => self.remove(REFRESH_TOKEN_KEY),
        }
    }

    /// Remove both tokens.
    fn clear_credentials(&self) -> Result<(), StoreError> {
        self.remove(ACCESS_TOKEN_KEY)?;
        self.remove(REFRESH_TOKEN_KEY)
    }
}

/// In-process store. Contents are lost when dropped.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with credentials.
    pub fn with_credentials(credentials: &Credentials) -> Self {
        let store = Self::new();
        {
            let mut entries = store.entries.lock();
            entries.insert(ACCESS_TOKEN_KEY.to_string(), credentials.access_token.clone());
            if let Some(refresh) = &credentials.refresh_token {
                entries.insert(REFRESH_TOKEN_KEY.to_string(), refresh.clone());
            }
        }
        store
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl CredentialStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries.lock().remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        self.entries.lock().clear();
        Ok(())
    }
}

/// Store persisted as a JSON object on disk.
///
/// Every mutation is written through to the file, so a session survives
/// process restarts. A missing file is an empty store.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStore {
    /// Open (or lazily create) a store at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let entries = match std::fs::read(&path) {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => BTreeMap::new(),
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => return Err(err.into()),
        };
        debug!(path = %path.display(), keys = entries.len(), "Opened credential file");
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn mutate(&self, f: impl FnOnce(&mut BTreeMap<String, String>)) -> Result<(), StoreError> {
        let mut entries = self.entries.lock();
        let mut next = entries.clone();
        f(&mut next);
        write_atomic(&self.path, &serde_json::to_vec_pretty(&next)?)?;
        *entries = next;
        Ok(())
    }
}

impl CredentialStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.mutate(|entries| {
            entries.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        if !self.entries.lock().contains_key(key) {
            return Ok(());
        }
        self.mutate(|entries| {
            entries.remove(key);
        })
    }

    fn clear(&self) -> Result<(), StoreError> {
        self.mutate(BTreeMap::clear)
    }

    /// Both tokens land in one file write.
    fn store_credentials(&self, credentials: &Credentials) -> Result<(), StoreError> {
        self.mutate(|entries| {
            entries.insert(ACCESS_TOKEN_KEY.to_string(), credentials.access_token.clone());
            match &credentials.refresh_token {
                Some(token) => entries.insert(REFRESH_TOKEN_KEY.to_string(), token.clone()),
                None => entries.remove(REFRESH_TOKEN_KEY),
            };
        })
    }

    /// Both tokens are removed in one file write.
    fn clear_credentials(&self) -> Result<(), StoreError> {
        self.mutate(|entries| {
            entries.remove(ACCESS_TOKEN_KEY);
            entries.remove(REFRESH_TOKEN_KEY);
        })
    }
}

fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), StoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    std::fs::write(&tmp, contents)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}
