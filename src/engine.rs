//! Engine facade
//!
//! The operation surface exposed to the embedding shell: session
//! establishment and teardown, keystroke forwarding, remote file management,
//! and the encrypted profile documents. Establishment runs on the caller's
//! task and blocks until connected or failed; per-session streaming happens on
//! background tasks owned by the pump module.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::ConfigStore;
use crate::error::Error;
use crate::events::EventSink;
use crate::serial;
use crate::session::{pump, SessionKind, SessionRegistry, Transport, INPUT_QUEUE_DEPTH};
use crate::sftp::{self, DialogProvider, FileEntry, FileManager, TransferStatus};
use crate::ssh::{self, SshConfig};

pub struct Engine {
    registry: Arc<SessionRegistry>,
    sink: Arc<dyn EventSink>,
    dialogs: Arc<dyn DialogProvider>,
    files: FileManager,
    config: ConfigStore,
}

impl Engine {
    pub fn new(
        sink: Arc<dyn EventSink>,
        dialogs: Arc<dyn DialogProvider>,
        config: ConfigStore,
    ) -> Self {
        let registry = Arc::new(SessionRegistry::new());
        let files = FileManager::new(registry.clone(), dialogs.clone());
        Self {
            registry,
            sink,
            dialogs,
            files,
            config,
        }
    }

    // ------------------------------------------------------------------
    // Session lifecycle
    // ------------------------------------------------------------------

    /// Establish an SSH session under `id`, blocking until the shell runs or
    /// a step fails. On failure no partial session remains registered.
    pub async fn connect(
        &self,
        id: &str,
        host: &str,
        username: &str,
        password: &str,
        private_key: &str,
    ) -> Result<(), Error> {
        let cancel = CancellationToken::new();
        let shutdown = self
            .registry
            .reserve(id, SessionKind::Ssh, Some(cancel.clone()))?;

        let config = SshConfig {
            host: host.to_string(),
            username: username.to_string(),
            password: password.to_string(),
            private_key: private_key.to_string(),
        };

        match self.establish_ssh(id, config, cancel, shutdown).await {
            Ok(()) => {
                info!("session {} connected", id);
                Ok(())
            }
            Err(e) => {
                // Teardown before reporting: the registry never retains an
                // orphaned partial session.
                self.registry.disconnect(id).await;
                warn!("session {} failed to connect: {}", id, e);
                Err(e)
            }
        }
    }

    async fn establish_ssh(
        &self,
        id: &str,
        config: SshConfig,
        cancel: CancellationToken,
        shutdown: CancellationToken,
    ) -> Result<(), Error> {
        let handle = ssh::connect(&config, &cancel).await?;

        // Best-effort: without the subchannel the shell still works and file
        // operations degrade.
        let sftp = match sftp::open_subchannel(&handle).await {
            Ok(sftp) => Some(Arc::new(sftp)),
            Err(e) => {
                warn!("session {}: file subchannel unavailable: {}", id, e);
                None
            }
        };

        let channel = match ssh::open_shell(&handle).await {
            Ok(channel) => channel,
            Err(e) => {
                drop(sftp);
                let _ = handle
                    .disconnect(russh::Disconnect::ByApplication, "setup failed", "en")
                    .await;
                return Err(e);
            }
        };

        let (reader, writer) = tokio::io::split(channel.into_stream());
        let (input_tx, input_rx) = mpsc::channel(INPUT_QUEUE_DEPTH);

        // A disconnect racing the establishment wins: when the id is gone the
        // just-opened transport is closed here instead of entering the table.
        let transport = Transport::Ssh { handle, sftp };
        if let Err(transport) = self.registry.publish(id, transport, input_tx) {
            transport.close().await;
            return Err(Error::Cancelled);
        }

        pump::spawn_writer(id.to_string(), shutdown.clone(), input_rx, writer);
        pump::spawn_pump(
            self.registry.clone(),
            self.sink.clone(),
            id.to_string(),
            SessionKind::Ssh,
            shutdown,
            reader,
        );
        Ok(())
    }

    /// Open a serial session under `id` at the given baud rate.
    pub async fn connect_serial(
        &self,
        id: &str,
        port_name: &str,
        baud_rate: u32,
    ) -> Result<(), Error> {
        let shutdown = self.registry.reserve(id, SessionKind::Serial, None)?;
        match self.establish_serial(id, port_name, baud_rate, shutdown).await {
            Ok(()) => {
                info!("session {} connected to {}", id, port_name);
                Ok(())
            }
            Err(e) => {
                self.registry.disconnect(id).await;
                warn!("session {} failed to open {}: {}", id, port_name, e);
                Err(e)
            }
        }
    }

    async fn establish_serial(
        &self,
        id: &str,
        port_name: &str,
        baud_rate: u32,
        shutdown: CancellationToken,
    ) -> Result<(), Error> {
        let port = serial::open_port(port_name, baud_rate)?;
        let (reader, writer) = tokio::io::split(port);
        let (input_tx, input_rx) = mpsc::channel(INPUT_QUEUE_DEPTH);

        // The port halves are dropped (closing the port) when a disconnect
        // won the race against the open.
        if self.registry.publish(id, Transport::Serial, input_tx).is_err() {
            return Err(Error::Cancelled);
        }

        pump::spawn_writer(id.to_string(), shutdown.clone(), input_rx, writer);
        pump::spawn_pump(
            self.registry.clone(),
            self.sink.clone(),
            id.to_string(),
            SessionKind::Serial,
            shutdown,
            reader,
        );
        Ok(())
    }

    /// Tear down `id`. Safe on unknown or already-closed ids; cancels an
    /// in-flight establishment.
    pub async fn disconnect(&self, id: &str) {
        self.registry.disconnect(id).await;
    }

    /// Fire-and-forget keystroke write; silently dropped without a session.
    pub fn send_data(&self, id: &str, data: &[u8]) {
        self.registry.send_data(id, data);
    }

    /// Names of the serial ports available on this machine; empty on
    /// enumeration failure.
    pub fn serial_ports(&self) -> Vec<String> {
        serial::list_ports()
    }

    // ------------------------------------------------------------------
    // Remote file management
    // ------------------------------------------------------------------

    pub async fn list_directory(&self, id: &str, path: &str) -> Vec<FileEntry> {
        self.files.list_directory(id, path).await
    }

    pub async fn read_file(&self, id: &str, path: &str) -> Result<String, Error> {
        self.files.read_file(id, path).await
    }

    pub async fn write_file(&self, id: &str, path: &str, content: &str) -> Result<(), Error> {
        self.files.write_file(id, path, content).await
    }

    pub async fn delete_file(&self, id: &str, path: &str) -> Result<(), Error> {
        self.files.delete(id, path).await
    }

    pub async fn rename_file(&self, id: &str, old_path: &str, new_path: &str) -> Result<(), Error> {
        self.files.rename(id, old_path, new_path).await
    }

    pub async fn make_directory(&self, id: &str, path: &str) -> Result<(), Error> {
        self.files.make_directory(id, path).await
    }

    pub async fn upload_file(&self, id: &str, remote_dir: &str) -> Result<TransferStatus, Error> {
        self.files.upload(id, remote_dir).await
    }

    pub async fn download_file(
        &self,
        id: &str,
        remote_path: &str,
    ) -> Result<TransferStatus, Error> {
        self.files.download(id, remote_path).await
    }

    // ------------------------------------------------------------------
    // Profile persistence
    // ------------------------------------------------------------------

    pub async fn load_hosts(&self) -> String {
        self.config.load_hosts().await
    }

    pub async fn save_hosts(&self, hosts_json: &str) -> Result<(), Error> {
        self.config.save_hosts(hosts_json).await
    }

    pub async fn load_ssh_keys(&self) -> String {
        self.config.load_ssh_keys().await
    }

    pub async fn save_ssh_keys(&self, keys_json: &str) -> Result<(), Error> {
        self.config.save_ssh_keys(keys_json).await
    }

    /// Read a dialog-chosen local private key file. `Ok(None)` when the user
    /// cancels.
    pub async fn import_key_file(&self) -> Result<Option<String>, Error> {
        let Some(path) = self.dialogs.pick_open_file("Select SSH private key").await else {
            return Ok(None);
        };
        tokio::fs::read_to_string(&path)
            .await
            .map(Some)
            .map_err(|e| Error::Storage(format!("{:?}: {}", path, e)))
    }
}
