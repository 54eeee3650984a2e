//! Session lifecycle: the concurrency-safe session table, per-session entry
//! types, and the background I/O tasks attached to each live session.

pub mod pump;
pub mod registry;
pub mod types;

pub use registry::SessionRegistry;
pub use types::{Session, SessionKind, Transport, INPUT_QUEUE_DEPTH};
