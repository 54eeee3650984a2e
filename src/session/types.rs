//! Session table entry types

use std::sync::Arc;

use russh::client::Handle;
use russh::Disconnect;
use russh_sftp::client::SftpSession;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::ssh::ClientHandler;

/// Depth of the per-session input queue feeding the transport write half.
pub const INPUT_QUEUE_DEPTH: usize = 1024;

/// Which transport a session runs over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionKind {
    Ssh,
    Serial,
}

impl std::fmt::Display for SessionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionKind::Ssh => write!(f, "ssh"),
            SessionKind::Serial => write!(f, "serial"),
        }
    }
}

/// The live connection owned by a session.
pub enum Transport {
    Ssh {
        /// Authenticated SSH transport; channels hang off this handle.
        handle: Handle<ClientHandler>,
        /// File-transfer subchannel. Absent when the subsystem could not be
        /// opened; file operations degrade, the shell still works.
        sftp: Option<Arc<SftpSession>>,
    },
    /// The serial port halves are owned by the pump and writer tasks; the
    /// shutdown token drives their teardown, so there is nothing to hold here.
    Serial,
}

impl Transport {
    /// Close the transport, file subchannel before the connection itself.
    pub async fn close(self) {
        match self {
            Transport::Ssh { handle, sftp } => {
                drop(sftp);
                let _ = handle
                    .disconnect(Disconnect::ByApplication, "session closed", "en")
                    .await;
            }
            Transport::Serial => {}
        }
    }
}

/// One entry in the session table.
///
/// Registered before the transport dial begins so cancellation is always
/// possible, progressively populated as sub-resources become ready, destroyed
/// by explicit disconnect or by the pump on a transport read error.
pub struct Session {
    pub kind: SessionKind,
    /// Cancellation capability for the dial/handshake phase. Only valid while
    /// the transport is being established; cleared on publish.
    pub cancel: Option<CancellationToken>,
    /// Signalled during teardown to stop the pump and writer tasks.
    pub shutdown: CancellationToken,
    pub transport: Option<Transport>,
    /// Keystroke sink; feeds the writer task owning the transport write half.
    pub input: Option<mpsc::Sender<Vec<u8>>>,
}

impl Session {
    pub fn new(kind: SessionKind, cancel: Option<CancellationToken>) -> Self {
        Self {
            kind,
            cancel,
            shutdown: CancellationToken::new(),
            transport: None,
            input: None,
        }
    }

    /// The file-transfer capability, when the session has one.
    pub fn file_channel(&self) -> Option<Arc<SftpSession>> {
        match &self.transport {
            Some(Transport::Ssh { sftp, .. }) => sftp.clone(),
            _ => None,
        }
    }

    /// Tear down everything this session owns, in fixed order and tolerant of
    /// absent handles: abort an in-flight connect, stop the I/O tasks, close
    /// the input sink, then the transport.
    pub async fn close(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }
        self.shutdown.cancel();
        drop(self.input.take());
        if let Some(transport) = self.transport.take() {
            transport.close().await;
        }
    }
}
