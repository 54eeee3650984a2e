//! File transfer over the SFTP subchannel.

pub mod dialog;
pub mod manager;

use russh::client::Handle;
use russh_sftp::client::SftpSession;
use tracing::info;

use crate::error::Error;
use crate::ssh::ClientHandler;

pub use dialog::{DialogProvider, NoopDialogs};
pub use manager::{FileEntry, FileManager, TransferStatus};

/// Open the SFTP subsystem on a fresh channel of the authenticated transport.
///
/// Establishment treats a failure here as non-fatal: the shell still works,
/// file operations degrade.
pub async fn open_subchannel(handle: &Handle<ClientHandler>) -> Result<SftpSession, Error> {
    let channel = handle
        .channel_open_session()
        .await
        .map_err(|e| Error::Session(e.to_string()))?;
    channel
        .request_subsystem(true, "sftp")
        .await
        .map_err(|e| Error::Session(format!("sftp subsystem: {}", e)))?;

    let sftp = SftpSession::new(channel.into_stream())
        .await
        .map_err(|e| Error::Session(format!("sftp subsystem: {}", e)))?;
    info!("sftp subchannel opened");
    Ok(sftp)
}
