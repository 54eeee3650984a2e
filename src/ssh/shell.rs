//! Interactive shell channel setup

use russh::client::{Handle, Msg};
use russh::{Channel, Pty};
use tracing::debug;

use super::client::ClientHandler;
use crate::error::Error;

pub const TERM: &str = "xterm";
pub const INITIAL_COLS: u32 = 80;
pub const INITIAL_ROWS: u32 = 40;

/// Terminal modes requested at PTY allocation: local echo on, 14400 baud
/// in/out.
const PTY_MODES: &[(Pty, u32)] = &[
    (Pty::ECHO, 1),
    (Pty::TTY_OP_ISPEED, 14400),
    (Pty::TTY_OP_OSPEED, 14400),
];

/// Open a session channel on the authenticated transport, allocate a PTY with
/// the fixed initial geometry, and start the shell.
pub async fn open_shell(handle: &Handle<ClientHandler>) -> Result<Channel<Msg>, Error> {
    let channel = handle
        .channel_open_session()
        .await
        .map_err(|e| Error::Session(e.to_string()))?;
    debug!("session channel opened, requesting pty");

    channel
        .request_pty(false, TERM, INITIAL_COLS, INITIAL_ROWS, 0, 0, PTY_MODES)
        .await
        .map_err(|e| Error::Pty(e.to_string()))?;

    channel
        .request_shell(false)
        .await
        .map_err(|e| Error::Shell(e.to_string()))?;
    debug!("interactive shell started");

    Ok(channel)
}
