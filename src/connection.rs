use crate::error::{DynaudioError, Result};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

/// Most bytes read back from a single query
pub const RECV_BUFFER_SIZE: usize = 1024;

/// Short-lived TCP transport to the device.
///
/// The hub expects one request per connection, so every call opens its own
/// socket and the stream is dropped (closed) when the call returns, on
/// success and on error alike.
#[derive(Debug, Clone)]
pub struct Connection {
    host: String,
    port: u16,
}

impl Connection {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Connect, write `bytes` and close without reading anything back
    pub async fn send(&self, bytes: &[u8]) -> Result<()> {
        let mut stream = TcpStream::connect((self.host.as_str(), self.port)).await?;
        stream.write_all(bytes).await?;
        stream.shutdown().await?;
        Ok(())
    }

    /// Connect, write `bytes` and read one response.
    ///
    /// `recv_timeout` bounds the connect, the write and the read separately.
    /// An empty vector means the device closed the connection without
    /// answering.
    pub async fn query(&self, bytes: &[u8], recv_timeout: Duration) -> Result<Vec<u8>> {
        let mut stream = timeout(
            recv_timeout,
            TcpStream::connect((self.host.as_str(), self.port)),
        )
        .await
        .map_err(|_| DynaudioError::Timeout)??;

        timeout(recv_timeout, stream.write_all(bytes))
            .await
            .map_err(|_| DynaudioError::Timeout)??;

        let mut buf = vec![0u8; RECV_BUFFER_SIZE];
        let n = timeout(recv_timeout, stream.read(&mut buf))
            .await
            .map_err(|_| DynaudioError::Timeout)??;
        buf.truncate(n);

        tracing::debug!("Read {} bytes from {}:{}", n, self.host, self.port);
        Ok(buf)
    }
}
