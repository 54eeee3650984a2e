//! NebulaSSH - backend engine for a multi-protocol remote-access terminal
//!
//! The engine establishes, multiplexes, and tears down interactive sessions
//! over SSH (shell plus SFTP file transfer) and local serial ports, and
//! persists connection profiles encrypted at rest with a key held in the OS
//! secret store.
//!
//! The embedding shell supplies two collaborators: an [`EventSink`] receiving
//! per-session output and close notifications, and a [`DialogProvider`] for
//! local path prompts. Everything else - the session table, transport
//! establishment, the per-session stream pumps, the credential vault - lives
//! here.

pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod serial;
pub mod session;
pub mod sftp;
pub mod ssh;

pub use config::{ConfigStore, Keychain, MemorySecretStore, SecretStore, Vault};
pub use engine::Engine;
pub use error::Error;
pub use events::{ChannelSink, EventSink};
pub use session::{SessionKind, SessionRegistry};
pub use sftp::{DialogProvider, FileEntry, FileManager, NoopDialogs, TransferStatus};
