//! Engine error types
//!
//! Every failure surfaced by the engine carries a category tag at the front of
//! its display string, so callers (and the UI binding above them) can match on
//! the prefix without knowing the variant.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// TCP dial failure or dial timeout.
    #[error("connect error: {0}")]
    Connect(String),

    /// SSH handshake failure or handshake timeout.
    #[error("handshake error: {0}")]
    Handshake(String),

    /// Supplied private key could not be parsed. Raised before the key is
    /// ever used on the network.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// Credentials rejected by the server.
    #[error("auth error: {0}")]
    Auth(String),

    /// Opening the session channel failed.
    #[error("session error: {0}")]
    Session(String),

    #[error("pty error: {0}")]
    Pty(String),

    #[error("shell error: {0}")]
    Shell(String),

    #[error("serial error: {0}")]
    Serial(String),

    /// SSH protocol-level failure outside a specific establishment step.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The session was disconnected while it was still being established.
    #[error("connection cancelled")]
    Cancelled,

    /// The id is already bound to a live session.
    #[error("session already exists: {0}")]
    DuplicateSession(String),

    /// No live session (or no file-transfer subchannel) under this id.
    #[error("no active session: {0}")]
    NoSession(String),

    /// Secret-store or filesystem I/O failure.
    #[error("storage error: {0}")]
    Storage(String),

    /// Authentication-tag failure or malformed ciphertext.
    #[error("crypto error: {0}")]
    Crypto(String),

    /// A file-transfer operation failed on the remote side.
    #[error("remote io error: {0}")]
    RemoteIo(String),
}

impl From<russh::Error> for Error {
    fn from(err: russh::Error) -> Self {
        Error::Protocol(err.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Storage(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_strings_are_category_tagged() {
        assert!(Error::Connect("refused".into())
            .to_string()
            .starts_with("connect error"));
        assert!(Error::InvalidKey("bad pem".into())
            .to_string()
            .starts_with("invalid key"));
        assert!(Error::Serial("busy".into())
            .to_string()
            .starts_with("serial error"));
        assert!(Error::NoSession("t1".into())
            .to_string()
            .starts_with("no active session"));
    }
}
