//! Bot credential persistence.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by credential storage.
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<std::io::Error> for CredentialError {
    fn from(error: std::io::Error) -> Self {
        Self::Io(error.to_string())
    }
}

impl From<toml::de::Error> for CredentialError {
    fn from(error: toml::de::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}

impl From<toml::ser::Error> for CredentialError {
    fn from(error: toml::ser::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}

/// The bot's persisted identity and secrets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub bot_display_name: String,
    pub bot_user_id: String,
    pub oauth_token: String,
    pub channel_id: String,
}

impl Credential {
    /// A non-empty OAuth token means the bot account is signed in.
    pub fn signed_in(&self) -> bool {
        !self.oauth_token.is_empty()
    }

    /// Signed in with a channel configured: the session can be joined.
    pub fn ready_to_join(&self) -> bool {
        self.signed_in() && !self.channel_id.is_empty()
    }
}

/// Storage abstraction for the bot credential.
///
/// Each call is assumed atomic; callers must not rely on transactional
/// multi-field updates across separate calls.
pub trait CredentialStore: Send + Sync {
    fn load(&self) -> Result<Option<Credential>, CredentialError>;
    fn save(&self, credential: &Credential) -> Result<(), CredentialError>;
    fn clear(&self) -> Result<(), CredentialError>;
}

/// File-backed credential store using a versioned TOML file.
///
/// # Example
/// ```no_run
/// use tunebot::credentials::{Credential, CredentialStore, FileCredentialStore};
///
/// let store = FileCredentialStore::new_default();
/// let credential = Credential {
///     oauth_token: "tok".to_string(),
///     ..Default::default()
/// };
/// store.save(&credential)?;
/// # Ok::<(), tunebot::credentials::CredentialError>(())
/// ```
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(base_dir: PathBuf) -> Self {
        Self {
            path: base_dir.join("credential.toml"),
        }
    }

    pub fn new_default() -> Self {
        Self::new(default_base_dir())
    }

    fn ensure_parent(path: &Path) -> Result<(), CredentialError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> Result<Option<Credential>, CredentialError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(CredentialError::Io(err.to_string())),
        };
        let file: CredentialFile = toml::from_str(&raw)?;
        Ok(Some(file.credential))
    }

    fn save(&self, credential: &Credential) -> Result<(), CredentialError> {
        Self::ensure_parent(&self.path)?;
        let file = CredentialFile {
            version: 1,
            credential: credential.clone(),
            saved_at: Utc::now(),
        };
        let serialized = toml::to_string(&file)?;
        fs::write(&self.path, serialized)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600))?;
        }
        Ok(())
    }

    fn clear(&self) -> Result<(), CredentialError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(CredentialError::Io(err.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CredentialFile {
    version: u32,
    credential: Credential,
    saved_at: DateTime<Utc>,
}

fn default_base_dir() -> PathBuf {
    directories::UserDirs::new()
        .map(|dirs| dirs.home_dir().join(".tunebot"))
        .unwrap_or_else(|| PathBuf::from(".tunebot"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_store() -> (TempDir, FileCredentialStore) {
        let dir = TempDir::new().unwrap();
        let store = FileCredentialStore::new(dir.path().to_path_buf());
        (dir, store)
    }

    fn sample_credential() -> Credential {
        Credential {
            bot_display_name: "MelodyBot".to_string(),
            bot_user_id: "4242".to_string(),
            oauth_token: "tok123".to_string(),
            channel_id: "99".to_string(),
        }
    }

    #[test]
    fn credential_round_trip_works() {
        let (_dir, store) = temp_store();
        store.save(&sample_credential()).unwrap();
        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded, sample_credential());
    }

    #[test]
    fn load_missing_file_returns_none() {
        let (_dir, store) = temp_store();
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn clear_removes_credential_and_is_idempotent() {
        let (_dir, store) = temp_store();
        store.save(&sample_credential()).unwrap();
        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
        store.clear().unwrap();
    }

    #[test]
    fn signed_in_requires_token() {
        let mut credential = sample_credential();
        assert!(credential.signed_in());
        assert!(credential.ready_to_join());
        credential.oauth_token.clear();
        assert!(!credential.signed_in());
        assert!(!credential.ready_to_join());
    }

    #[test]
    fn ready_to_join_requires_channel() {
        let mut credential = sample_credential();
        credential.channel_id.clear();
        assert!(credential.signed_in());
        assert!(!credential.ready_to_join());
    }
}
