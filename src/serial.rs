//! Serial transport
//!
//! Opens a named local port at the requested baud rate with the default
//! framing (8N1). Opening is assumed non-blocking, so unlike SSH there is no
//! cancellation token; the post-open publish check covers a disconnect racing
//! the open.

use tokio_serial::{SerialPortBuilderExt, SerialStream};
use tracing::{info, warn};

use crate::error::Error;

/// Open `port_name` at `baud_rate`.
pub fn open_port(port_name: &str, baud_rate: u32) -> Result<SerialStream, Error> {
    let port = tokio_serial::new(port_name, baud_rate)
        .open_native_async()
        .map_err(|e| Error::Serial(format!("{}: {}", port_name, e)))?;
    info!("opened serial port {} at {} baud", port_name, baud_rate);
    Ok(port)
}

/// Enumerate the serial ports available on this machine; empty on failure.
pub fn list_ports() -> Vec<String> {
    match tokio_serial::available_ports() {
        Ok(ports) => ports.into_iter().map(|p| p.port_name).collect(),
        Err(e) => {
            warn!("serial port enumeration failed: {}", e);
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nonexistent_port_is_a_serial_error() {
        let err = open_port("/dev/nebulassh-no-such-port", 9600).unwrap_err();
        assert!(err.to_string().starts_with("serial error"));
    }

    #[test]
    fn enumeration_never_panics() {
        let _ = list_ports();
    }
}
