//! Outbound BaseStation sink.
//!
//! The bridge writes one newline-terminated line per record. [`LineSink`] is
//! the seam between the bridge and the transport; [`TcpSink`] is the TCP
//! implementation used by the daemon.

use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::shutdown::Shutdown;

/// A destination for formatted BaseStation lines.
#[async_trait]
pub trait LineSink: Send {
    /// Write one line. The implementation appends the newline.
    ///
    /// # Errors
    ///
    /// Returns an error if the line could not be written.
    async fn send_line(&mut self, line: &str) -> Result<()>;

    /// Drop the current connection and open a new one, trying once.
    ///
    /// # Errors
    ///
    /// Returns an error if the new connection could not be established.
    async fn reconnect(&mut self) -> Result<()>;

    /// Close the connection. Further sends fail until a reconnect.
    async fn close(&mut self);
}

/// A TCP connection to a BaseStation consumer.
#[derive(Debug)]
pub struct TcpSink {
    addr: String,
    stream: Option<TcpStream>,
    peer: Option<SocketAddr>,
    timeout: Duration,
}

impl TcpSink {
    /// Connect once, bounded by `timeout`.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection is refused or times out.
    pub async fn connect(addr: impl Into<String>, timeout: Duration) -> Result<Self> {
        let mut sink = Self {
            addr: addr.into(),
            stream: None,
            peer: None,
            timeout,
        };
        sink.open().await?;
        Ok(sink)
    }

    /// Connect, retrying every `interval` until `attempts` is used up.
    ///
    /// `None` retries until the shutdown signal fires.
    ///
    /// # Errors
    ///
    /// Returns the last connection error once attempts are exhausted, or a
    /// connection error if shutdown was requested first.
    pub async fn connect_with_retry(
        addr: impl Into<String>,
        timeout: Duration,
        attempts: Option<u32>,
        interval: Duration,
        shutdown: &Shutdown,
    ) -> Result<Self> {
        let addr = addr.into();
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            info!("Connecting to BaseStation sink at {} (attempt {})", addr, attempt);

            match Self::connect(addr.clone(), timeout).await {
                Ok(sink) => return Ok(sink),
                Err(e) if attempts.is_some_and(|max| attempt >= max) => return Err(e),
                Err(e) => warn!("Unable to connect to {}: {}", addr, e),
            }

            tokio::select! {
                () = shutdown.wait() => {
                    return Err(Error::sink_connect(addr, "shutdown requested before connecting"));
                }
                () = tokio::time::sleep(interval) => {}
            }
        }
    }

    /// Address of the connected peer, if connected.
    #[must_use]
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer
    }

    /// Check if a connection is open.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    async fn open(&mut self) -> Result<()> {
        let stream = tokio::time::timeout(self.timeout, TcpStream::connect(&self.addr))
            .await
            .map_err(|_| Error::sink_connect(&self.addr, "connection timed out"))?
            .map_err(|e| Error::sink_connect(&self.addr, e.to_string()))?;

        stream.set_nodelay(true)?;
        self.peer = stream.peer_addr().ok();
        self.stream = Some(stream);
        info!("Connected to BaseStation sink at {}", self.addr);
        Ok(())
    }
}

#[async_trait]
impl LineSink for TcpSink {
    async fn send_line(&mut self, line: &str) -> Result<()> {
        let stream = self.stream.as_mut().ok_or(Error::SinkDisconnected)?;
        let mut data = Vec::with_capacity(line.len() + 1);
        data.extend_from_slice(line.as_bytes());
        data.push(b'\n');

        let result = tokio::time::timeout(self.timeout, stream.write_all(&data)).await;
        match result {
            Ok(Ok(())) => Ok(()),
            Ok(Err(source)) => {
                self.stream = None;
                Err(Error::SinkWrite {
                    addr: self.peer.unwrap_or_else(|| ([0, 0, 0, 0], 0).into()),
                    source,
                })
            }
            Err(_) => {
                self.stream = None;
                Err(Error::timeout(format!("write to {}", self.addr)))
            }
        }
    }

    async fn reconnect(&mut self) -> Result<()> {
        self.close().await;
        self.open().await
    }

    async fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            debug!("Disconnecting from {}", self.addr);
            let _ = stream.shutdown().await;
        }
    }
}
