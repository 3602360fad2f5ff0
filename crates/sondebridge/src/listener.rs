//! Inbound Horus UDP listener.
//!
//! Receives broadcast datagrams, keeps the payload summaries and hands them to
//! the bridge through a bounded channel in arrival order.

use std::io::ErrorKind;
use std::net::SocketAddr;

use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use crate::error::{Error, Result};
use crate::shutdown::Shutdown;
use crate::telemetry::{parse_packet, TelemetryRecord};

/// Counters reported when the listener stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListenerStats {
    /// Datagrams received.
    pub received: u64,
    /// Datagrams forwarded to the bridge.
    pub accepted: u64,
    /// Datagrams discarded as malformed or of another type.
    pub rejected: u64,
}

/// A bound UDP socket receiving telemetry.
#[derive(Debug)]
pub struct UdpListener {
    socket: UdpSocket,
    max_datagram: usize,
}

impl UdpListener {
    /// Bind to `addr` (`host:port`).
    ///
    /// With `reuse_port` the socket is opened with `SO_REUSEADDR` (and
    /// `SO_REUSEPORT` on unix) so other Horus clients on this host can
    /// listen on the same broadcast port.
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be resolved or bound.
    pub async fn bind(addr: &str, max_datagram: usize, reuse_port: bool) -> Result<Self> {
        let bind_err = |source: std::io::Error| Error::ListenerBind {
            addr: addr.to_string(),
            source,
        };

        let resolved = tokio::net::lookup_host(addr)
            .await
            .map_err(bind_err)?
            .next()
            .ok_or_else(|| {
                bind_err(std::io::Error::new(
                    ErrorKind::AddrNotAvailable,
                    "address did not resolve",
                ))
            })?;

        let socket = open_socket(resolved, reuse_port)
            .and_then(UdpSocket::from_std)
            .map_err(bind_err)?;
        info!("Listening for Horus UDP packets on {}", addr);

        Ok(Self {
            socket,
            max_datagram,
        })
    }

    /// The address the socket is bound to.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket address cannot be queried.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Receive until shutdown or until the bridge drops its receiver.
    pub async fn run(self, tx: mpsc::Sender<TelemetryRecord>, shutdown: Shutdown) -> ListenerStats {
        let mut stats = ListenerStats::default();
        let mut buf = vec![0u8; self.max_datagram];

        loop {
            let received = tokio::select! {
                biased;
                () = shutdown.wait() => break,
                received = self.socket.recv_from(&mut buf) => received,
            };

            let (len, peer) = match received {
                Ok(received) => received,
                Err(e) => {
                    warn!("UDP receive failed: {}", e);
                    continue;
                }
            };
            stats.received += 1;

            match parse_packet(&buf[..len]) {
                Ok(record) => {
                    trace!("Payload summary for {} from {}", record.callsign, peer);
                    if tx.send(record).await.is_err() {
                        debug!("Bridge stopped receiving, closing listener");
                        break;
                    }
                    stats.accepted += 1;
                }
                Err(rejection) => {
                    stats.rejected += 1;
                    debug!("Discarding packet from {}: {}", peer, rejection);
                }
            }
        }

        info!(
            "Closing UDP listener ({} received, {} accepted)",
            stats.received, stats.accepted
        );
        stats
    }
}

fn open_socket(addr: SocketAddr, reuse_port: bool) -> std::io::Result<std::net::UdpSocket> {
    let socket = Socket::new(Domain::for_address(addr), Type::DGRAM, Some(Protocol::UDP))?;
    if reuse_port {
        socket.set_reuse_address(true)?;
        #[cfg(all(unix, not(any(target_os = "solaris", target_os = "illumos"))))]
        socket.set_reuse_port(true)?;
    }
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    Ok(socket.into())
}
