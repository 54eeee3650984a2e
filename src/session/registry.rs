//! Session registry
//!
//! One coarse lock guards the id-to-session table. The lock is held only
//! across map reads and writes, never across blocking I/O, so unrelated ids
//! never block each other. All teardown goes through [`SessionRegistry::disconnect`],
//! which is idempotent and the sole authority for closing handles.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use russh_sftp::client::SftpSession;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::types::{Session, SessionKind, Transport};
use crate::error::Error;

#[derive(Default)]
pub struct SessionRegistry {
    table: Mutex<HashMap<String, Session>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve a slot for `id` before any blocking I/O starts, so a
    /// disconnect can always cancel the establishment. Returns the session's
    /// shutdown token, which the I/O tasks must observe.
    ///
    /// Ids are rejected while still bound to a live session; after a
    /// disconnect the id is free for reuse.
    pub fn reserve(
        &self,
        id: &str,
        kind: SessionKind,
        cancel: Option<CancellationToken>,
    ) -> Result<CancellationToken, Error> {
        let mut table = self.table.lock();
        if table.contains_key(id) {
            return Err(Error::DuplicateSession(id.to_string()));
        }
        let session = Session::new(kind, cancel);
        let shutdown = session.shutdown.clone();
        table.insert(id.to_string(), session);
        info!("session {} reserved ({})", id, kind);
        Ok(shutdown)
    }

    /// Publish the established transport and input sink for `id`, ending its
    /// connecting phase.
    ///
    /// A disconnect racing the establishment wins: when the id has been
    /// removed meanwhile, the transport is handed back so the caller can close
    /// it instead of leaking a live connection into the table.
    pub fn publish(
        &self,
        id: &str,
        transport: Transport,
        input: mpsc::Sender<Vec<u8>>,
    ) -> Result<(), Transport> {
        let mut table = self.table.lock();
        match table.get_mut(id) {
            Some(session) => {
                session.transport = Some(transport);
                session.input = Some(input);
                session.cancel = None;
                Ok(())
            }
            None => {
                debug!("session {} was disconnected during establishment", id);
                Err(transport)
            }
        }
    }

    /// Whether `id` currently maps to a session (connecting or live).
    pub fn contains(&self, id: &str) -> bool {
        self.table.lock().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.table.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.lock().is_empty()
    }

    /// The file-transfer subchannel of `id`, when present.
    pub fn file_channel(&self, id: &str) -> Option<Arc<SftpSession>> {
        self.table.lock().get(id).and_then(Session::file_channel)
    }

    /// Fire-and-forget write into the session's input queue. Silently dropped
    /// when the session is absent or has no input sink yet; a full queue drops
    /// the chunk rather than block the caller.
    pub fn send_data(&self, id: &str, data: &[u8]) {
        let tx = { self.table.lock().get(id).and_then(|s| s.input.clone()) };
        match tx {
            Some(tx) => {
                let _ = tx.try_send(data.to_vec());
            }
            None => debug!("send_data dropped: no session {}", id),
        }
    }

    /// Tear down `id`: cancel an in-flight establishment, stop its I/O tasks,
    /// close its handles, and free the id. Idempotent; a no-op for unknown or
    /// already-closed ids. Handle closing happens outside the table lock.
    pub async fn disconnect(&self, id: &str) {
        let session = { self.table.lock().remove(id) };
        match session {
            Some(session) => {
                info!("session {} disconnecting ({})", id, session.kind);
                session.close().await;
            }
            None => debug!("disconnect: no session {}", id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disconnect_is_idempotent() {
        let registry = SessionRegistry::new();
        registry.disconnect("never-created").await;

        registry
            .reserve("t1", SessionKind::Serial, None)
            .unwrap();
        registry.disconnect("t1").await;
        registry.disconnect("t1").await;
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn id_is_free_for_reuse_after_disconnect() {
        let registry = SessionRegistry::new();
        registry.reserve("t1", SessionKind::Ssh, None).unwrap();
        registry.disconnect("t1").await;
        registry.reserve("t1", SessionKind::Serial, None).unwrap();
    }

    #[test]
    fn duplicate_id_is_rejected_while_live() {
        let registry = SessionRegistry::new();
        registry.reserve("t1", SessionKind::Ssh, None).unwrap();
        let err = registry.reserve("t1", SessionKind::Ssh, None).unwrap_err();
        assert!(matches!(err, Error::DuplicateSession(_)));
    }

    #[tokio::test]
    async fn concurrent_creates_on_distinct_ids_all_succeed() {
        let registry = Arc::new(SessionRegistry::new());
        let mut handles = Vec::new();
        for i in 0..32 {
            let registry = registry.clone();
            handles.push(tokio::spawn(async move {
                registry
                    .reserve(&format!("t{}", i), SessionKind::Serial, None)
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(registry.len(), 32);
    }

    #[tokio::test]
    async fn publish_after_disconnect_hands_the_transport_back() {
        let registry = SessionRegistry::new();
        registry
            .reserve("t1", SessionKind::Serial, None)
            .unwrap();
        registry.disconnect("t1").await;

        let (tx, _rx) = mpsc::channel(1);
        let result = registry.publish("t1", Transport::Serial, tx);
        assert!(result.is_err());
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn published_input_receives_send_data() {
        let registry = SessionRegistry::new();
        registry
            .reserve("t1", SessionKind::Serial, None)
            .unwrap();
        let (tx, mut rx) = mpsc::channel(4);
        assert!(registry.publish("t1", Transport::Serial, tx).is_ok());

        registry.send_data("t1", b"ls\n");
        assert_eq!(rx.recv().await.unwrap(), b"ls\n");
    }

    #[test]
    fn send_data_without_session_is_silent() {
        let registry = SessionRegistry::new();
        registry.send_data("ghost", b"ignored");
    }

    #[tokio::test]
    async fn disconnect_cancels_a_connecting_session() {
        let registry = SessionRegistry::new();
        let cancel = CancellationToken::new();
        registry
            .reserve("t1", SessionKind::Ssh, Some(cancel.clone()))
            .unwrap();
        assert!(!cancel.is_cancelled());

        registry.disconnect("t1").await;
        assert!(cancel.is_cancelled());
    }
}
