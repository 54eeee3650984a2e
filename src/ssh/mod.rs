//! SSH transport establishment and shell channel setup via russh.

pub mod client;
pub mod shell;

pub use client::{connect, parse_private_key, ClientHandler, SshConfig, SSH_PORT};
pub use shell::open_shell;
