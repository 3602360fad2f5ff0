//! Process wiring for the bridge.
//!
//! [`Daemon::start`] performs the fallible startup steps (open the cache, bind
//! the UDP port, connect the sink); [`Daemon::run`] then moves records from the
//! listener task to the bridge until shutdown.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::info;

use crate::bridge::{Bridge, BridgeStats};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::identifier::IdentifierCache;
use crate::listener::{ListenerStats, UdpListener};
use crate::shutdown::Shutdown;
use crate::sink::TcpSink;

/// Final counters of a daemon run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DaemonReport {
    /// Listener counters.
    pub listener: ListenerStats,
    /// Bridge counters.
    pub bridge: BridgeStats,
}

/// A started bridge, ready to run.
#[derive(Debug)]
pub struct Daemon {
    listener: UdpListener,
    bridge: Bridge<TcpSink>,
    queue_capacity: usize,
    shutdown: Shutdown,
}

impl Daemon {
    /// Run the startup sequence.
    ///
    /// # Errors
    ///
    /// Returns an error if the identifier cache cannot be opened, the UDP port
    /// cannot be bound, or the sink cannot be reached within the configured
    /// attempts. All three are fatal.
    pub async fn start(config: &Config, shutdown: Shutdown) -> Result<Self> {
        let cache = Arc::new(IdentifierCache::from_config(config)?);
        let listener = UdpListener::bind(
            &config.listen_addr(),
            config.listener.max_datagram_bytes,
            config.listener.reuse_port,
        )
        .await?;

        let sink = TcpSink::connect_with_retry(
            config.sink_addr(),
            config.write_timeout(),
            config.connect_attempts(),
            config.connect_retry_interval(),
            &shutdown,
        )
        .await?;

        Ok(Self {
            listener,
            bridge: Bridge::new(cache, sink),
            queue_capacity: config.listener.queue_capacity,
            shutdown,
        })
    }

    /// The bound UDP address.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket address cannot be queried.
    pub fn listen_addr(&self) -> Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Run until the shutdown signal fires.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener task panicked.
    pub async fn run(self) -> Result<DaemonReport> {
        let (tx, rx) = mpsc::channel(self.queue_capacity);

        let listener = tokio::spawn(self.listener.run(tx, self.shutdown.clone()));
        let bridge = self.bridge.run(rx, self.shutdown.clone()).await;

        // The bridge only returns early if the listener went away; make sure
        // both sides stop either way.
        self.shutdown.trigger();
        let listener = listener
            .await
            .map_err(|e| Error::internal(format!("listener task failed: {e}")))?;

        Ok(DaemonReport { listener, bridge })
    }
}

/// Start the bridge and run it until Ctrl-C.
///
/// # Errors
///
/// Returns an error if startup fails.
pub async fn run_until_interrupted(config: &Config) -> Result<DaemonReport> {
    let shutdown = Shutdown::new();
    shutdown.trigger_on_ctrl_c();

    let daemon = Daemon::start(config, shutdown).await?;
    let report = daemon.run().await?;

    info!(
        "Bridge finished: {} packets received, {} messages sent",
        report.listener.received,
        report.bridge.sent + report.bridge.resent
    );
    Ok(report)
}
