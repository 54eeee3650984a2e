//! Per-session background I/O tasks
//!
//! Every live session gets one output pump reading the transport and one
//! writer draining the input queue. The pump owns closure detection: on
//! end-of-stream, read error, or teardown it disconnects the session and
//! emits exactly one terminal notification.

use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::registry::SessionRegistry;
use super::types::SessionKind;
use crate::events::{closed_topic, output_topic, EventSink};

/// Read buffer size; large enough to absorb high-volume output without
/// per-byte overhead.
pub const READ_BUF_SIZE: usize = 8192;

/// Terminal message emitted on `closed-<id>` for SSH sessions.
pub const SSH_CLOSED_MESSAGE: &str = "\r\n[connection closed]";

/// Terminal message emitted on `closed-<id>` for serial sessions.
pub const SERIAL_CLOSED_MESSAGE: &str = "\r\n[port closed]";

fn closed_message(kind: SessionKind) -> &'static str {
    match kind {
        SessionKind::Ssh => SSH_CLOSED_MESSAGE,
        SessionKind::Serial => SERIAL_CLOSED_MESSAGE,
    }
}

/// Spawn the output pump for a session that has reached its running state.
///
/// Each successful read forwards the decoded bytes to the sink on
/// `output-<id>`. Every iteration re-validates that the session is still
/// registered, tolerating a disconnect racing the read. On exit the pump
/// invokes disconnect (a no-op if teardown already ran) and emits exactly one
/// `closed-<id>` notification, worded for the session's transport kind.
pub fn spawn_pump<R>(
    registry: Arc<SessionRegistry>,
    sink: Arc<dyn EventSink>,
    id: String,
    kind: SessionKind,
    shutdown: CancellationToken,
    mut reader: R,
) where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let output = output_topic(&id);
        let mut buf = vec![0u8; READ_BUF_SIZE];

        loop {
            if !registry.contains(&id) {
                break;
            }
            tokio::select! {
                _ = shutdown.cancelled() => break,
                read = reader.read(&mut buf) => match read {
                    Ok(0) => {
                        debug!("session {} reached end of stream", id);
                        break;
                    }
                    Ok(n) => sink.emit(&output, &String::from_utf8_lossy(&buf[..n])),
                    Err(e) => {
                        debug!("session {} read failed: {}", id, e);
                        break;
                    }
                },
            }
        }

        registry.disconnect(&id).await;
        sink.emit(&closed_topic(&id), closed_message(kind));
        debug!("output pump for session {} stopped", id);
    });
}

/// Spawn the writer task draining the session's input queue into the
/// transport write half. Exits when the queue closes or teardown is
/// signalled, then shuts the write half down.
pub fn spawn_writer<W>(
    id: String,
    shutdown: CancellationToken,
    mut input: mpsc::Receiver<Vec<u8>>,
    mut writer: W,
) where
    W: AsyncWrite + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                chunk = input.recv() => match chunk {
                    Some(data) => {
                        if let Err(e) = writer.write_all(&data).await {
                            debug!("session {} write failed: {}", id, e);
                            break;
                        }
                    }
                    None => break,
                },
            }
        }
        let _ = writer.shutdown().await;
        debug!("input writer for session {} stopped", id);
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::ChannelSink;
    use std::time::Duration;

    #[tokio::test]
    async fn pump_forwards_output_then_closes_once_on_eof() {
        let registry = Arc::new(SessionRegistry::new());
        let shutdown = registry.reserve("p1", SessionKind::Serial, None).unwrap();
        let (sink, mut events) = ChannelSink::new();

        let (reader, mut writer) = tokio::io::duplex(READ_BUF_SIZE);
        spawn_pump(
            registry.clone(),
            Arc::new(sink),
            "p1".into(),
            SessionKind::Serial,
            shutdown,
            reader,
        );

        writer.write_all(b"hello").await.unwrap();
        let (topic, payload) = events.recv().await.unwrap();
        assert_eq!(topic, "output-p1");
        assert_eq!(payload, "hello");

        // Dropping the peer ends the stream: session torn down, one closed event.
        drop(writer);
        let (topic, payload) = events.recv().await.unwrap();
        assert_eq!(topic, "closed-p1");
        assert_eq!(payload, SERIAL_CLOSED_MESSAGE);
        assert!(registry.is_empty());
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn closed_message_is_worded_for_the_transport_kind() {
        let registry = Arc::new(SessionRegistry::new());
        let shutdown = registry.reserve("p3", SessionKind::Ssh, None).unwrap();
        let (sink, mut events) = ChannelSink::new();

        let (reader, writer) = tokio::io::duplex(READ_BUF_SIZE);
        spawn_pump(
            registry.clone(),
            Arc::new(sink),
            "p3".into(),
            SessionKind::Ssh,
            shutdown,
            reader,
        );

        drop(writer);
        let (topic, payload) = events.recv().await.unwrap();
        assert_eq!(topic, "closed-p3");
        assert_eq!(payload, SSH_CLOSED_MESSAGE);
    }

    #[tokio::test]
    async fn pump_emits_one_closed_event_when_disconnected() {
        let registry = Arc::new(SessionRegistry::new());
        let shutdown = registry.reserve("p2", SessionKind::Serial, None).unwrap();
        let (sink, mut events) = ChannelSink::new();

        let (reader, _writer) = tokio::io::duplex(READ_BUF_SIZE);
        spawn_pump(
            registry.clone(),
            Arc::new(sink),
            "p2".into(),
            SessionKind::Serial,
            shutdown,
            reader,
        );

        registry.disconnect("p2").await;

        let (topic, _) = events.recv().await.unwrap();
        assert_eq!(topic, "closed-p2");

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn writer_forwards_input_until_shutdown() {
        let shutdown = CancellationToken::new();
        let (tx, rx) = mpsc::channel(4);
        let (mut reader, writer) = tokio::io::duplex(64);
        spawn_writer("w1".into(), shutdown.clone(), rx, writer);

        tx.send(b"echo hi\n".to_vec()).await.unwrap();
        let mut buf = [0u8; 16];
        let n = reader.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"echo hi\n");

        shutdown.cancel();
        // Writer shuts its half down; the reader observes EOF.
        let n = reader.read(&mut buf).await.unwrap();
        assert_eq!(n, 0);
    }
}
