//! Remote file operations
//!
//! All operations are keyed by session id and resolved to that session's
//! file-transfer subchannel through the registry. A session without a
//! subchannel (serial, or SSH where the subsystem failed to open) reports the
//! distinguishable no-active-session condition; directory listing degrades to
//! an empty list instead.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use russh_sftp::client::SftpSession;
use russh_sftp::protocol::OpenFlags;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, info, warn};

use super::dialog::DialogProvider;
use crate::error::Error;
use crate::session::SessionRegistry;

/// One entry of a remote directory listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    pub name: String,
    pub is_dir: bool,
    pub size: u64,
}

/// Outcome of an upload/download that may be cancelled at the dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferStatus {
    Completed,
    Cancelled,
}

pub struct FileManager {
    registry: Arc<SessionRegistry>,
    dialogs: Arc<dyn DialogProvider>,
}

impl FileManager {
    pub fn new(registry: Arc<SessionRegistry>, dialogs: Arc<dyn DialogProvider>) -> Self {
        Self { registry, dialogs }
    }

    fn subchannel(&self, id: &str) -> Result<Arc<SftpSession>, Error> {
        self.registry
            .file_channel(id)
            .ok_or_else(|| Error::NoSession(id.to_string()))
    }

    /// List a remote directory, prepending a synthetic parent-navigation
    /// entry when the path is not the root. Degrades to an empty list when
    /// the session, its subchannel, or the read is unavailable.
    pub async fn list_directory(&self, id: &str, path: &str) -> Vec<FileEntry> {
        let Some(sftp) = self.registry.file_channel(id) else {
            debug!("list_directory: no file subchannel for session {}", id);
            return Vec::new();
        };

        let read_dir = match sftp.read_dir(path).await {
            Ok(read_dir) => read_dir,
            Err(e) => {
                warn!("list_directory {} failed: {}", path, e);
                return Vec::new();
            }
        };

        let mut entries = Vec::new();
        if path != "/" {
            entries.push(FileEntry {
                name: "..".into(),
                is_dir: true,
                size: 0,
            });
        }
        for entry in read_dir {
            let name = entry.file_name();
            if name == "." || name == ".." {
                continue;
            }
            let metadata = entry.metadata();
            entries.push(FileEntry {
                name,
                is_dir: metadata.is_dir(),
                size: metadata.size.unwrap_or(0),
            });
        }
        entries
    }

    /// Read a whole remote file.
    pub async fn read_file(&self, id: &str, path: &str) -> Result<String, Error> {
        let sftp = self.subchannel(id)?;
        let mut file = sftp
            .open_with_flags(path, OpenFlags::READ)
            .await
            .map_err(|e| Error::RemoteIo(e.to_string()))?;
        let mut content = String::new();
        file.read_to_string(&mut content)
            .await
            .map_err(|e| Error::RemoteIo(e.to_string()))?;
        Ok(content)
    }

    /// Create or truncate a remote file with the given content.
    pub async fn write_file(&self, id: &str, path: &str, content: &str) -> Result<(), Error> {
        let sftp = self.subchannel(id)?;
        let mut file = sftp
            .create(path)
            .await
            .map_err(|e| Error::RemoteIo(e.to_string()))?;
        file.write_all(content.as_bytes())
            .await
            .map_err(|e| Error::RemoteIo(e.to_string()))?;
        file.shutdown()
            .await
            .map_err(|e| Error::RemoteIo(e.to_string()))?;
        Ok(())
    }

    /// Delete a remote file or directory. The prior stat decides: directories
    /// are removed recursively, files directly.
    pub async fn delete(&self, id: &str, path: &str) -> Result<(), Error> {
        let sftp = self.subchannel(id)?;
        let stat = sftp
            .metadata(path)
            .await
            .map_err(|e| Error::RemoteIo(e.to_string()))?;
        if stat.is_dir() {
            remove_dir_recursive(&sftp, path).await?;
        } else {
            sftp.remove_file(path)
                .await
                .map_err(|e| Error::RemoteIo(e.to_string()))?;
        }
        info!("session {}: deleted {}", id, path);
        Ok(())
    }

    pub async fn rename(&self, id: &str, old_path: &str, new_path: &str) -> Result<(), Error> {
        let sftp = self.subchannel(id)?;
        sftp.rename(old_path, new_path)
            .await
            .map_err(|e| Error::RemoteIo(e.to_string()))
    }

    pub async fn make_directory(&self, id: &str, path: &str) -> Result<(), Error> {
        let sftp = self.subchannel(id)?;
        sftp.create_dir(path)
            .await
            .map_err(|e| Error::RemoteIo(e.to_string()))
    }

    /// Upload a dialog-chosen local file into `remote_dir`, streaming the
    /// copy between the two handles.
    pub async fn upload(&self, id: &str, remote_dir: &str) -> Result<TransferStatus, Error> {
        let sftp = self.subchannel(id)?;
        let Some(local_path) = self.dialogs.pick_open_file("Select file to upload").await else {
            return Ok(TransferStatus::Cancelled);
        };

        let file_name = local_path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| Error::Storage("local path has no file name".into()))?
            .to_string();
        let mut local = tokio::fs::File::open(&local_path)
            .await
            .map_err(|e| Error::Storage(format!("{:?}: {}", local_path, e)))?;

        let remote_path = join_remote(remote_dir, &file_name);
        let mut remote = sftp
            .create(&remote_path)
            .await
            .map_err(|e| Error::RemoteIo(e.to_string()))?;

        let bytes = tokio::io::copy(&mut local, &mut remote)
            .await
            .map_err(|e| Error::RemoteIo(e.to_string()))?;
        remote
            .shutdown()
            .await
            .map_err(|e| Error::RemoteIo(e.to_string()))?;

        info!("session {}: uploaded {} bytes to {}", id, bytes, remote_path);
        Ok(TransferStatus::Completed)
    }

    /// Download a remote file to a dialog-chosen local destination.
    pub async fn download(&self, id: &str, remote_path: &str) -> Result<TransferStatus, Error> {
        let sftp = self.subchannel(id)?;
        let file_name = remote_path.rsplit('/').next().unwrap_or(remote_path);
        let Some(local_path) = self
            .dialogs
            .pick_save_file("Select download destination", file_name)
            .await
        else {
            return Ok(TransferStatus::Cancelled);
        };

        let mut remote = sftp
            .open_with_flags(remote_path, OpenFlags::READ)
            .await
            .map_err(|e| Error::RemoteIo(e.to_string()))?;
        let mut local = tokio::fs::File::create(&local_path)
            .await
            .map_err(|e| Error::Storage(format!("{:?}: {}", local_path, e)))?;

        let bytes = tokio::io::copy(&mut remote, &mut local)
            .await
            .map_err(|e| Error::RemoteIo(e.to_string()))?;
        local
            .flush()
            .await
            .map_err(|e| Error::Storage(e.to_string()))?;

        info!(
            "session {}: downloaded {} bytes from {}",
            id, bytes, remote_path
        );
        Ok(TransferStatus::Completed)
    }
}

/// Join a remote directory and a child name without doubling separators.
fn join_remote(dir: &str, name: &str) -> String {
    format!("{}/{}", dir.trim_end_matches('/'), name)
}

/// Depth-first recursive removal; SFTP's directory removal only accepts empty
/// directories.
fn remove_dir_recursive<'a>(
    sftp: &'a SftpSession,
    path: &'a str,
) -> Pin<Box<dyn Future<Output = Result<(), Error>> + Send + 'a>> {
    Box::pin(async move {
        let read_dir = sftp
            .read_dir(path)
            .await
            .map_err(|e| Error::RemoteIo(e.to_string()))?;
        for entry in read_dir {
            let name = entry.file_name();
            if name == "." || name == ".." {
                continue;
            }
            let child = join_remote(path, &name);
            if entry.metadata().is_dir() {
                remove_dir_recursive(sftp, &child).await?;
            } else {
                sftp.remove_file(&child)
                    .await
                    .map_err(|e| Error::RemoteIo(e.to_string()))?;
            }
        }
        sftp.remove_dir(path)
            .await
            .map_err(|e| Error::RemoteIo(e.to_string()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sftp::dialog::NoopDialogs;

    fn manager() -> FileManager {
        FileManager::new(Arc::new(SessionRegistry::new()), Arc::new(NoopDialogs))
    }

    #[tokio::test]
    async fn listing_without_subchannel_is_an_empty_list() {
        assert!(manager().list_directory("ghost", "/").await.is_empty());
    }

    #[tokio::test]
    async fn operations_without_session_report_no_active_session() {
        let files = manager();
        let err = files.read_file("ghost", "/etc/hostname").await.unwrap_err();
        assert!(err.to_string().starts_with("no active session"));

        assert!(matches!(
            files.write_file("ghost", "/tmp/x", "data").await,
            Err(Error::NoSession(_))
        ));
        assert!(matches!(
            files.delete("ghost", "/tmp/x").await,
            Err(Error::NoSession(_))
        ));
        assert!(matches!(
            files.rename("ghost", "/a", "/b").await,
            Err(Error::NoSession(_))
        ));
        assert!(matches!(
            files.make_directory("ghost", "/tmp/d").await,
            Err(Error::NoSession(_))
        ));
        assert!(matches!(
            files.upload("ghost", "/tmp").await,
            Err(Error::NoSession(_))
        ));
        assert!(matches!(
            files.download("ghost", "/tmp/x").await,
            Err(Error::NoSession(_))
        ));
    }

    #[test]
    fn remote_join_does_not_double_separators() {
        assert_eq!(join_remote("/var/log/", "syslog"), "/var/log/syslog");
        assert_eq!(join_remote("/", "etc"), "/etc");
        assert_eq!(join_remote("/home/user", "notes.txt"), "/home/user/notes.txt");
    }

    #[test]
    fn file_entries_serialize_with_camel_case_keys() {
        let entry = FileEntry {
            name: "logs".into(),
            is_dir: true,
            size: 0,
        };
        let json = serde_json::to_string(&entry).unwrap();
        assert_eq!(json, r#"{"name":"logs","isDir":true,"size":0}"#);
    }
}
