//! Encrypted profile storage
//!
//! Two JSON documents live beside the executable: `hosts.json` (connection
//! profiles) and `keys.json` (saved SSH keys). Both are written encrypted
//! through the vault. Reading is tolerant by design: the caller always gets a
//! valid JSON array, even when the file is missing or undecryptable. Files
//! written by older plaintext versions are detected by their leading `[` byte,
//! returned unchanged, and re-encrypted on the next save.

use std::path::{Path, PathBuf};
use tokio::fs;

use super::keychain::SecretStore;
use super::vault::Vault;
use crate::error::Error;

const HOSTS_FILE: &str = "hosts.json";
const KEYS_FILE: &str = "keys.json";

/// Sentinel returned by every tolerant read that cannot produce the document.
const EMPTY_DOC: &str = "[]";

/// Persistent store for the hosts and keys documents.
pub struct ConfigStore {
    dir: PathBuf,
    vault: Vault,
}

impl ConfigStore {
    /// Open the store with documents beside the current executable, acquiring
    /// the vault key from the given secret store.
    pub fn open(secrets: &dyn SecretStore) -> Result<Self, Error> {
        let exe = std::env::current_exe().map_err(|e| Error::Storage(e.to_string()))?;
        let dir = exe
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Ok(Self {
            dir,
            vault: Vault::open(secrets)?,
        })
    }

    /// Open the store over an explicit directory (tests, portable installs).
    pub fn with_dir(dir: impl Into<PathBuf>, vault: Vault) -> Self {
        Self {
            dir: dir.into(),
            vault,
        }
    }

    pub async fn load_hosts(&self) -> String {
        self.load_document(HOSTS_FILE).await
    }

    pub async fn save_hosts(&self, hosts_json: &str) -> Result<(), Error> {
        self.save_document(HOSTS_FILE, hosts_json).await
    }

    pub async fn load_ssh_keys(&self) -> String {
        self.load_document(KEYS_FILE).await
    }

    pub async fn save_ssh_keys(&self, keys_json: &str) -> Result<(), Error> {
        self.save_document(KEYS_FILE, keys_json).await
    }

    /// Tolerant read: any failure degrades to the empty-array sentinel so the
    /// caller always receives valid JSON. A leading `[` byte marks a legacy
    /// plaintext document, which is returned without a decrypt attempt.
    async fn load_document(&self, name: &str) -> String {
        let path = self.dir.join(name);
        let data = match fs::read(&path).await {
            Ok(data) => data,
            Err(e) => {
                tracing::debug!("config read skipped: {:?}: {}", path, e);
                return EMPTY_DOC.to_string();
            }
        };

        if data.first() == Some(&b'[') {
            tracing::info!("loaded legacy plaintext document {:?}", path);
            return String::from_utf8(data).unwrap_or_else(|_| EMPTY_DOC.to_string());
        }

        let blob = match String::from_utf8(data) {
            Ok(blob) => blob,
            Err(_) => return EMPTY_DOC.to_string(),
        };
        match self.vault.decrypt(&blob) {
            Ok(plain) => String::from_utf8(plain).unwrap_or_else(|_| EMPTY_DOC.to_string()),
            Err(e) => {
                tracing::warn!("failed to decrypt {:?}: {}", path, e);
                EMPTY_DOC.to_string()
            }
        }
    }

    /// Always encrypts, regardless of the file's prior format. This is the
    /// migration path off legacy plaintext documents.
    async fn save_document(&self, name: &str, json: &str) -> Result<(), Error> {
        let path = self.dir.join(name);
        let blob = self.vault.encrypt(json.as_bytes())?;
        fs::write(&path, blob)
            .await
            .map_err(|e| Error::Storage(format!("writing {:?}: {}", path, e)))?;
        tracing::debug!("saved encrypted document {:?}", path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::vault::KEY_LEN;
    use tempfile::TempDir;

    fn store(dir: &TempDir) -> ConfigStore {
        ConfigStore::with_dir(dir.path(), Vault::from_key([9u8; KEY_LEN]))
    }

    #[tokio::test]
    async fn missing_file_loads_empty_array() {
        let dir = TempDir::new().unwrap();
        assert_eq!(store(&dir).load_hosts().await, "[]");
        assert_eq!(store(&dir).load_ssh_keys().await, "[]");
    }

    #[tokio::test]
    async fn save_then_load_roundtrips() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let hosts = r#"[{"name":"web-01","host":"10.0.0.5","user":"root"}]"#;

        store.save_hosts(hosts).await.unwrap();

        // On disk the document must be ciphertext, not JSON.
        let raw = std::fs::read(dir.path().join("hosts.json")).unwrap();
        assert_ne!(raw.first(), Some(&b'['));

        assert_eq!(store.load_hosts().await, hosts);
    }

    #[tokio::test]
    async fn legacy_plaintext_is_returned_unchanged() {
        let dir = TempDir::new().unwrap();
        let legacy = r#"[{"name":"old-entry"}]"#;
        std::fs::write(dir.path().join("keys.json"), legacy).unwrap();

        assert_eq!(store(&dir).load_ssh_keys().await, legacy);
    }

    #[tokio::test]
    async fn save_migrates_legacy_plaintext() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let doc = r#"[{"name":"old-entry"}]"#;
        std::fs::write(dir.path().join("hosts.json"), doc).unwrap();

        let loaded = store.load_hosts().await;
        assert_eq!(loaded, doc);

        store.save_hosts(&loaded).await.unwrap();
        let raw = std::fs::read(dir.path().join("hosts.json")).unwrap();
        assert_ne!(raw.first(), Some(&b'['));
        assert_eq!(store.load_hosts().await, doc);
    }

    #[tokio::test]
    async fn corrupt_ciphertext_loads_empty_array() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("hosts.json"), "definitely-not-a-blob").unwrap();
        assert_eq!(store(&dir).load_hosts().await, "[]");
    }

    #[tokio::test]
    async fn wrong_key_loads_empty_array() {
        let dir = TempDir::new().unwrap();
        let writer = ConfigStore::with_dir(dir.path(), Vault::from_key([1u8; KEY_LEN]));
        writer.save_hosts(r#"[{"name":"x"}]"#).await.unwrap();

        let reader = ConfigStore::with_dir(dir.path(), Vault::from_key([2u8; KEY_LEN]));
        assert_eq!(reader.load_hosts().await, "[]");
    }

    #[tokio::test]
    async fn save_into_missing_directory_propagates() {
        let dir = TempDir::new().unwrap();
        let gone = dir.path().join("nope");
        let store = ConfigStore::with_dir(&gone, Vault::from_key([9u8; KEY_LEN]));
        assert!(matches!(
            store.save_hosts("[]").await,
            Err(Error::Storage(_))
        ));
    }
}
