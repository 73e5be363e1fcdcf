//! JSON-file credential store.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use uuid::Uuid;

use precast_core::error::StoreError;
use precast_core::traits::CredentialStore;
use precast_core::{AccessToken, CredentialPair, RefreshToken, Result};

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

/// On-disk layout.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredCredentials {
    access_token: AccessToken,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    refresh_token: Option<RefreshToken>,
    saved_at: DateTime<Utc>,
}

/// Credentials persisted as a JSON file.
///
/// Writes go to a temporary sibling file that is renamed into place, so a
/// reader never observes a half-written pair. Concurrent writers across
/// processes are serialized by an exclusive lock on `<path>.lock`. On Unix
/// the file is created with mode `0600`.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    /// Create a store backed by the given file. The file need not exist.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Returns the credential file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".lock");
        self.path.with_file_name(name)
    }

    fn lock(&self) -> std::result::Result<File, StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let lock_file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(self.lock_path())?;
        lock_file.lock_exclusive()?;
        Ok(lock_file)
    }

    fn read(&self) -> std::result::Result<Option<CredentialPair>, StoreError> {
        let json = match fs::read_to_string(&self.path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let stored: StoredCredentials =
            serde_json::from_str(&json).map_err(|e| StoreError::Corrupt {
                message: e.to_string(),
            })?;

        Ok(Some(CredentialPair {
            access_token: stored.access_token,
            refresh_token: stored.refresh_token,
        }))
    }

    fn write(&self, pair: CredentialPair) -> std::result::Result<(), StoreError> {
        let stored = StoredCredentials {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            saved_at: Utc::now(),
        };
        let json = serde_json::to_string_pretty(&stored).map_err(|e| StoreError::Corrupt {
            message: e.to_string(),
        })?;

        let tmp_path = self
            .path
            .with_extension(format!("tmp-{}", Uuid::new_v4().simple()));

        let mut options = OpenOptions::new();
        options.create_new(true).write(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options.open(&tmp_path)?;
        file.write_all(json.as_bytes())?;
        file.sync_all()?;
        drop(file);

        #[cfg(unix)]
        fs::set_permissions(&tmp_path, fs::Permissions::from_mode(0o600))?;

        if let Err(e) = fs::rename(&tmp_path, &self.path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e.into());
        }

        Ok(())
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    #[instrument(skip(self), fields(path = %self.path.display()))]
    async fn get(&self) -> Result<Option<CredentialPair>> {
        let pair = self.read()?;
        debug!(present = pair.is_some(), "Loaded credentials");
        Ok(pair)
    }

    #[instrument(skip(self, pair), fields(path = %self.path.display()))]
    async fn set(&self, pair: CredentialPair) -> Result<()> {
        let lock = self.lock()?;
        let result = self.write(pair);
        let _ = FileExt::unlock(&lock);
        result?;
        debug!("Saved credentials");
        Ok(())
    }

    #[instrument(skip(self), fields(path = %self.path.display()))]
    async fn clear(&self) -> Result<()> {
        let lock = self.lock()?;
        let result = match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::from(e)),
        };
        let _ = FileExt::unlock(&lock);
        result?;
        debug!("Cleared credentials");
        Ok(())
    }
}
