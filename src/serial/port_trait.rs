//! Trait abstraction over the byte transport to enable testing

use async_trait::async_trait;
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Transport delivering raw byte chunks from the EnOcean module
#[async_trait]
pub trait ByteSource: Send {
    /// Read the next chunk into `buf`
    ///
    /// Returns the number of bytes read, `Ok(0)` once the transport is closed.
    async fn read_chunk(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Human-readable description of the endpoint
    fn describe(&self) -> String;
}

/// Adapter turning any tokio reader into a [`ByteSource`]
pub struct StreamPort<S> {
    stream: S,
    description: String,
}

impl<S> StreamPort<S> {
    pub fn new(stream: S, description: impl Into<String>) -> Self {
        Self {
            stream,
            description: description.into(),
        }
    }
}

impl<S> std::fmt::Debug for StreamPort<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamPort")
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<S> ByteSource for StreamPort<S>
where
    S: AsyncRead + Unpin + Send,
{
    async fn read_chunk(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stream.read(buf).await
    }

    fn describe(&self) -> String {
        self.description.clone()
    }
}

/// Serial port connection (USB300, TCM310 and similar modules)
pub type TokioSerialPort = StreamPort<tokio_serial::SerialStream>;

/// Serial-over-TCP connection (ser2net and similar bridges)
pub type TcpSocketPort = StreamPort<tokio::net::TcpStream>;

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::io::Builder;

    #[tokio::test]
    async fn test_stream_port_delivers_chunks_then_eof() {
        let mock = Builder::new().read(&[0x55, 0x00]).read(&[0x07]).build();
        let mut port = StreamPort::new(mock, "mock");
        let mut buf = [0u8; 16];

        assert_eq!(port.read_chunk(&mut buf).await.unwrap(), 2);
        assert_eq!(&buf[..2], &[0x55, 0x00]);
        assert_eq!(port.read_chunk(&mut buf).await.unwrap(), 1);
        assert_eq!(port.read_chunk(&mut buf).await.unwrap(), 0);
        assert_eq!(port.describe(), "mock");
    }

    #[tokio::test]
    async fn test_stream_port_reports_errors() {
        let mock = Builder::new()
            .read_error(io::Error::new(io::ErrorKind::BrokenPipe, "unplugged"))
            .build();
        let mut port = StreamPort::new(mock, "mock");
        let mut buf = [0u8; 16];

        let err = port.read_chunk(&mut buf).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }
}
