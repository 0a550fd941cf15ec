//! # Serial Communication Module
//!
//! Handles the connection to the EnOcean transceiver module.
//!
//! This module handles:
//! - Opening the serial port at 57,600 baud (8N1)
//! - Connecting to a serial-over-TCP bridge instead of a local device
//! - Feeding received chunks through the ESP3 framer ([`EnoceanComm`])

pub mod comm;
pub mod port_trait;

pub use comm::{ChannelStats, EnoceanComm, READ_BUFFER_SIZE};
pub use port_trait::{ByteSource, StreamPort, TcpSocketPort, TokioSerialPort};

use crate::config::SerialConfig;
use crate::error::{EnoceanError, Result};
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info, warn};

/// Default EnOcean device paths to try (in order of preference)
pub const DEFAULT_DEVICE_PATHS: &[&str] = &[
    "/dev/ttyUSB0", // USB300 and other FTDI based sticks
    "/dev/ttyAMA0", // TCM310 on a Raspberry Pi header
];

/// Port name selecting auto-detection over [`DEFAULT_DEVICE_PATHS`]
pub const AUTO_DETECT: &str = "auto";

/// Open the configured connection
///
/// `port` is a device path if it starts with `/`, [`AUTO_DETECT`] to try the
/// default device paths, or otherwise a TCP `host[:port]` (default port
/// `tcp_port`).
///
/// # Errors
///
/// Returns error if the device cannot be opened or the TCP connection fails
pub async fn open_connection(config: &SerialConfig) -> Result<Box<dyn ByteSource>> {
    if config.port == AUTO_DETECT {
        Ok(Box::new(open_with_paths(DEFAULT_DEVICE_PATHS, config.baud_rate)?))
    } else if config.port.starts_with('/') {
        Ok(Box::new(open_with_paths(&[config.port.as_str()], config.baud_rate)?))
    } else {
        Ok(Box::new(connect_tcp(&config.port, config.tcp_port).await?))
    }
}

/// Open the first serial device that can be opened
///
/// # Arguments
///
/// * `paths` - Device paths to try (e.g., &["/dev/ttyUSB0"])
/// * `baud_rate` - Line speed
pub fn open_with_paths(paths: &[&str], baud_rate: u32) -> Result<TokioSerialPort> {
    for path in paths {
        debug!("Trying to open serial port: {}", path);

        match open_port(path, baud_rate) {
            Ok(port) => {
                info!("Successfully opened EnOcean module at {}", path);
                return Ok(StreamPort::new(port, *path));
            }
            Err(e) => {
                warn!("Failed to open {}: {}", path, e);
                continue;
            }
        }
    }

    Err(EnoceanError::SerialPortNotFound(paths.join(", ")))
}

/// Open a specific serial port with ESP3 line settings
fn open_port(path: &str, baud_rate: u32) -> Result<tokio_serial::SerialStream> {
    let port = tokio_serial::new(path, baud_rate)
        .data_bits(tokio_serial::DataBits::Eight)
        .parity(tokio_serial::Parity::None)
        .stop_bits(tokio_serial::StopBits::One)
        .flow_control(tokio_serial::FlowControl::None)
        .open_native_async()
        .map_err(|e| EnoceanError::Serial(format!("Failed to open {}: {}", path, e)))?;

    Ok(port)
}

/// Append the default port if `host` has none
fn tcp_address(host: &str, default_port: u16) -> String {
    if host.contains(':') {
        host.to_string()
    } else {
        format!("{}:{}", host, default_port)
    }
}

/// Connect to a serial-over-TCP bridge
pub async fn connect_tcp(host: &str, default_port: u16) -> Result<TcpSocketPort> {
    let address = tcp_address(host, default_port);
    debug!("Connecting to {}", address);
    let stream = tokio::net::TcpStream::connect(&address)
        .await
        .map_err(|e| EnoceanError::Transport(format!("Failed to connect to {}: {}", address, e)))?;
    info!("Connected to EnOcean bridge at {}", address);
    Ok(StreamPort::new(stream, address))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::esp3::protocol::ESP3_BAUD_RATE;
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpListener;

    fn serial_config(port: &str) -> SerialConfig {
        SerialConfig {
            port: port.to_string(),
            ..SerialConfig::default()
        }
    }

    #[test]
    fn test_device_path_order() {
        assert_eq!(DEFAULT_DEVICE_PATHS[0], "/dev/ttyUSB0");
        assert_eq!(DEFAULT_DEVICE_PATHS[1], "/dev/ttyAMA0");
    }

    #[test]
    fn test_tcp_address() {
        assert_eq!(tcp_address("bridge.local", 2102), "bridge.local:2102");
        assert_eq!(tcp_address("10.0.0.5:4000", 2102), "10.0.0.5:4000");
    }

    #[test]
    fn test_open_with_invalid_paths_returns_error() {
        let invalid_paths = &["/dev/nonexistent0", "/dev/nonexistent1"];
        let result = open_with_paths(invalid_paths, ESP3_BAUD_RATE);

        match result {
            Err(EnoceanError::SerialPortNotFound(msg)) => {
                assert!(msg.contains("/dev/nonexistent0"));
                assert!(msg.contains("/dev/nonexistent1"));
            }
            other => panic!("Expected SerialPortNotFound error, got: {:?}", other.err()),
        }
    }

    #[test]
    fn test_open_with_empty_paths_returns_error() {
        let empty_paths: &[&str] = &[];
        assert!(matches!(
            open_with_paths(empty_paths, ESP3_BAUD_RATE),
            Err(EnoceanError::SerialPortNotFound(_))
        ));
    }

    #[test]
    fn test_open_port_with_invalid_path_returns_error() {
        let result = open_port("/dev/nonexistent_serial_device_12345", ESP3_BAUD_RATE);

        match result {
            Err(EnoceanError::Serial(msg)) => {
                assert!(msg.contains("/dev/nonexistent_serial_device_12345"));
                assert!(msg.contains("Failed to open"));
            }
            other => panic!("Expected Serial error, got: {:?}", other.err()),
        }
    }

    #[tokio::test]
    async fn test_open_connection_with_device_path() {
        let result = open_connection(&serial_config("/dev/nonexistent_enocean")).await;
        assert!(matches!(result, Err(EnoceanError::SerialPortNotFound(_))));
    }

    #[tokio::test]
    async fn test_open_connection_over_tcp() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            socket.write_all(&[0x55, 0x00, 0x07]).await.unwrap();
        });

        let mut source = open_connection(&serial_config(&address)).await.unwrap();
        assert_eq!(source.describe(), address);

        let mut buf = [0u8; 16];
        let mut received = Vec::new();
        while received.len() < 3 {
            let n = source.read_chunk(&mut buf).await.unwrap();
            assert!(n > 0);
            received.extend_from_slice(&buf[..n]);
        }
        assert_eq!(received, vec![0x55, 0x00, 0x07]);
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_connect_tcp_refused() {
        // bind then drop to get a port nobody listens on
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        drop(listener);

        assert!(matches!(
            connect_tcp(&address, 2102).await,
            Err(EnoceanError::Transport(_))
        ));
    }
}
