//! Config store for the registration and token documents.
//!
//! Every write replaces the whole file. There is no merging and no locking;
//! the helper serves a single operator.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{OAuthError, Result};
use crate::types::{DEFAULT_REGISTRATION_JSON, DEFAULT_TOKEN_JSON, Registration, TokenRecord};

/// Default directory holding both documents.
pub const DEFAULT_CONFIG_PATH: &str = "/var/lib/nugu";

/// Token document file name.
pub const TOKEN_FILE: &str = "nugu-auth.json";

/// Registration document file name.
pub const REGISTRATION_FILE: &str = "nugu-oauth.json";

// ============================================================================
// ConfigStore Trait
// ============================================================================

/// Storage for the two persisted documents.
///
/// Implementations provide byte-level access; typed access is layered on top.
#[async_trait]
pub trait ConfigStore: Send + Sync + std::fmt::Debug {
    /// Create missing documents with their defaults. Existing ones are left alone.
    async fn initialize(&self) -> Result<()>;

    /// Registration document, byte for byte.
    async fn read_registration_raw(&self) -> Result<Vec<u8>>;

    /// Replace the registration document.
    async fn write_registration_raw(&self, bytes: &[u8]) -> Result<()>;

    /// Token document, byte for byte.
    async fn read_token_raw(&self) -> Result<Vec<u8>>;

    /// Replace the token document.
    async fn write_token_raw(&self, bytes: &[u8]) -> Result<()>;

    async fn read_registration(&self) -> Result<Registration> {
        let bytes = self.read_registration_raw().await?;
        Registration::from_json(&bytes)
    }

    async fn write_registration(&self, registration: &Registration) -> Result<()> {
        let json = registration.to_json_pretty()?;
        self.write_registration_raw(json.as_bytes()).await
    }

    async fn read_token(&self) -> Result<TokenRecord> {
        let bytes = self.read_token_raw().await?;
        TokenRecord::from_json(&bytes)
    }

    async fn write_token(&self, token: &TokenRecord) -> Result<()> {
        let json = token.to_json_pretty()?;
        self.write_token_raw(json.as_bytes()).await
    }

    /// Put the default token document back.
    async fn reset_token(&self) -> Result<()> {
        self.write_token_raw(DEFAULT_TOKEN_JSON.as_bytes()).await
    }
}

/// Shared config store for use across handlers.
pub type SharedConfigStore = Arc<dyn ConfigStore>;

// ============================================================================
// FileConfigStore
// ============================================================================

/// File-backed store rooted at the config directory.
#[derive(Debug, Clone)]
pub struct FileConfigStore {
    dir: PathBuf,
    registration_path: PathBuf,
    token_path: PathBuf,
}

impl FileConfigStore {
    /// Create a store for the given config directory.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self {
            registration_path: dir.join(REGISTRATION_FILE),
            token_path: dir.join(TOKEN_FILE),
            dir,
        }
    }

    /// Config directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the registration document.
    pub fn registration_path(&self) -> &Path {
        &self.registration_path
    }

    /// Path of the token document.
    pub fn token_path(&self) -> &Path {
        &self.token_path
    }

    async fn write_default_if_absent(path: &Path, default: &str) -> Result<()> {
        let exists = tokio::fs::try_exists(path)
            .await
            .map_err(|e| OAuthError::Storage(format!("Failed to stat {}: {}", path.display(), e)))?;
        if exists {
            tracing::debug!(path = %path.display(), "Keeping existing document");
            return Ok(());
        }

        write_file(path, default.as_bytes()).await?;
        tracing::info!(path = %path.display(), "Created default document");
        Ok(())
    }
}

async fn read_file(path: &Path) -> Result<Vec<u8>> {
    tokio::fs::read(path)
        .await
        .map_err(|e| OAuthError::Storage(format!("Failed to read {}: {}", path.display(), e)))
}

async fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    tokio::fs::write(path, bytes)
        .await
        .map_err(|e| OAuthError::Storage(format!("Failed to write {}: {}", path.display(), e)))
}

#[async_trait]
impl ConfigStore for FileConfigStore {
    async fn initialize(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| {
            OAuthError::Config(format!(
                "Failed to create config directory {}: {}",
                self.dir.display(),
                e
            ))
        })?;

        Self::write_default_if_absent(&self.token_path, DEFAULT_TOKEN_JSON).await?;
        Self::write_default_if_absent(&self.registration_path, DEFAULT_REGISTRATION_JSON).await
    }

    async fn read_registration_raw(&self) -> Result<Vec<u8>> {
        read_file(&self.registration_path).await
    }

    async fn write_registration_raw(&self, bytes: &[u8]) -> Result<()> {
        write_file(&self.registration_path, bytes).await?;
        tracing::info!(path = %self.registration_path.display(), "Registration saved");
        Ok(())
    }

    async fn read_token_raw(&self) -> Result<Vec<u8>> {
        read_file(&self.token_path).await
    }

    async fn write_token_raw(&self, bytes: &[u8]) -> Result<()> {
        write_file(&self.token_path, bytes).await?;
        tracing::info!(path = %self.token_path.display(), "Token saved");
        Ok(())
    }
}

// ============================================================================
// InMemoryConfigStore (for testing)
// ============================================================================

/// In-memory store for testing. Starts out holding the default documents.
#[derive(Debug)]
pub struct InMemoryConfigStore {
    registration: RwLock<Vec<u8>>,
    token: RwLock<Vec<u8>>,
}

impl InMemoryConfigStore {
    pub fn new() -> Self {
        Self {
            registration: RwLock::new(DEFAULT_REGISTRATION_JSON.as_bytes().to_vec()),
            token: RwLock::new(DEFAULT_TOKEN_JSON.as_bytes().to_vec()),
        }
    }

    pub fn with_registration(registration: &Registration) -> Result<Self> {
        let store = Self::new();
        let json = registration.to_json_pretty()?;
        *store.registration.try_write().map_err(|e| OAuthError::Storage(e.to_string()))? =
            json.into_bytes();
        Ok(store)
    }
}

impl Default for InMemoryConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConfigStore for InMemoryConfigStore {
    async fn initialize(&self) -> Result<()> {
        Ok(())
    }

    async fn read_registration_raw(&self) -> Result<Vec<u8>> {
        Ok(self.registration.read().await.clone())
    }

    async fn write_registration_raw(&self, bytes: &[u8]) -> Result<()> {
        *self.registration.write().await = bytes.to_vec();
        Ok(())
    }

    async fn read_token_raw(&self) -> Result<Vec<u8>> {
        Ok(self.token.read().await.clone())
    }

    async fn write_token_raw(&self, bytes: &[u8]) -> Result<()> {
        *self.token.write().await = bytes.to_vec();
        Ok(())
    }
}

/// Create a shared file-backed store.
pub fn create_file_store(dir: &Path) -> SharedConfigStore {
    Arc::new(FileConfigStore::new(dir))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_initialize_creates_directory_and_defaults() {
        let temp = tempdir().unwrap();
        let dir = temp.path().join("nested").join("nugu");
        let store = FileConfigStore::new(&dir);

        store.initialize().await.unwrap();

        let token = std::fs::read_to_string(store.token_path()).unwrap();
        let registration = std::fs::read_to_string(store.registration_path()).unwrap();
        assert_eq!(token, DEFAULT_TOKEN_JSON);
        assert_eq!(registration, DEFAULT_REGISTRATION_JSON);
    }

    #[tokio::test]
    async fn test_initialize_keeps_existing_documents() {
        let temp = tempdir().unwrap();
        let store = FileConfigStore::new(temp.path());
        store.initialize().await.unwrap();

        let custom_token = br#"{"access_token": "kept"}"#;
        let custom_registration = br#"{"clientId": "kept"}"#;
        store.write_token_raw(custom_token).await.unwrap();
        store
            .write_registration_raw(custom_registration)
            .await
            .unwrap();

        // Second startup against the same directory
        FileConfigStore::new(temp.path()).initialize().await.unwrap();

        assert_eq!(store.read_token_raw().await.unwrap(), custom_token);
        assert_eq!(
            store.read_registration_raw().await.unwrap(),
            custom_registration
        );
    }

    #[tokio::test]
    async fn test_raw_write_is_byte_exact() {
        let temp = tempdir().unwrap();
        let store = FileConfigStore::new(temp.path());
        store.initialize().await.unwrap();

        let bytes = b"{ \"clientId\" :\"x\",\n\"extra\": [1,2] }";
        store.write_registration_raw(bytes).await.unwrap();
        assert_eq!(store.read_registration_raw().await.unwrap(), bytes);
    }

    #[tokio::test]
    async fn test_typed_round_trip() {
        let temp = tempdir().unwrap();
        let store = FileConfigStore::new(temp.path());
        store.initialize().await.unwrap();

        let registration = Registration {
            client_id: "client".to_string(),
            client_secret: "secret".to_string(),
            device_serial_number: "SN-42".to_string(),
            ..Default::default()
        };
        store.write_registration(&registration).await.unwrap();
        assert_eq!(store.read_registration().await.unwrap(), registration);
    }

    #[tokio::test]
    async fn test_reset_token() {
        let temp = tempdir().unwrap();
        let store = FileConfigStore::new(temp.path());
        store.initialize().await.unwrap();

        store
            .write_token_raw(br#"{"access_token": "a", "refresh_token": "r"}"#)
            .await
            .unwrap();
        store.reset_token().await.unwrap();

        assert_eq!(
            store.read_token_raw().await.unwrap(),
            DEFAULT_TOKEN_JSON.as_bytes()
        );
    }

    #[tokio::test]
    async fn test_read_missing_file_is_error() {
        let temp = tempdir().unwrap();
        let store = FileConfigStore::new(temp.path());
        let result = store.read_token().await;
        assert!(matches!(result, Err(OAuthError::Storage(_))));
    }

    #[tokio::test]
    async fn test_inmemory_store() {
        let registration = Registration {
            client_id: "mem".to_string(),
            ..Default::default()
        };
        let store = InMemoryConfigStore::with_registration(&registration).unwrap();

        assert_eq!(store.read_registration().await.unwrap().client_id, "mem");
        assert!(store.read_token().await.unwrap().access_token().is_none());

        store
            .write_token_raw(br#"{"access_token": "t"}"#)
            .await
            .unwrap();
        assert_eq!(store.read_token().await.unwrap().access_token(), Some("t"));
    }
}
