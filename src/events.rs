//! Event boundary between the engine and its embedding shell.
//!
//! The engine never talks to a UI directly; it pushes output and lifecycle
//! notifications through an [`EventSink`]. A desktop host implements the
//! trait over its own event bus, tests use [`ChannelSink`].

use tokio::sync::mpsc;

/// Outbound push channel for per-session events.
///
/// Topics are keyed by session id: `output-<id>` carries raw decoded output
/// chunks, `closed-<id>` carries exactly one terminal message per session end.
pub trait EventSink: Send + Sync + 'static {
    fn emit(&self, topic: &str, payload: &str);
}

/// Topic carrying transport output for a session.
pub fn output_topic(session_id: &str) -> String {
    format!("output-{}", session_id)
}

/// Topic carrying the single terminal "closed" notification for a session.
pub fn closed_topic(session_id: &str) -> String {
    format!("closed-{}", session_id)
}

/// [`EventSink`] delivering events into an unbounded mpsc queue.
///
/// Useful for embedders that forward events from a dedicated task, and for
/// asserting event order in tests. Emission never blocks; if the receiver is
/// gone the event is dropped.
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<(String, String)>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<(String, String)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, topic: &str, payload: &str) {
        let _ = self.tx.send((topic.to_string(), payload.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topics_are_keyed_by_session_id() {
        assert_eq!(output_topic("t1"), "output-t1");
        assert_eq!(closed_topic("t1"), "closed-t1");
    }

    #[tokio::test]
    async fn channel_sink_preserves_emission_order() {
        let (sink, mut rx) = ChannelSink::new();
        sink.emit("output-a", "one");
        sink.emit("closed-a", "two");

        assert_eq!(rx.recv().await.unwrap(), ("output-a".into(), "one".into()));
        assert_eq!(rx.recv().await.unwrap(), ("closed-a".into(), "two".into()));
    }

    #[test]
    fn emit_after_receiver_drop_is_silent() {
        let (sink, rx) = ChannelSink::new();
        drop(rx);
        sink.emit("output-a", "late");
    }
}
