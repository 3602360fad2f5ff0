//! Telemetry to BaseStation bridge.
//!
//! The [`Bridge`] owns the entity store and a handle to the identifier cache,
//! turns each [`TelemetryRecord`] into a BaseStation line and writes it to a
//! [`LineSink`]. Per-record failures are logged and never stop processing.

use std::sync::Arc;

use chrono::{Local, NaiveDateTime};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::entity::EntityStore;
use crate::error::Result;
use crate::format::{kph_to_knots, meters_to_feet, PositionMessage};
use crate::identifier::IdentifierCache;
use crate::logging::SBS_TARGET;
use crate::shutdown::Shutdown;
use crate::sink::LineSink;
use crate::telemetry::TelemetryRecord;

/// What happened to one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Written on the first attempt.
    Sent,
    /// Written after a reconnect.
    Resent,
    /// Formatted but lost because the sink stayed unavailable.
    Dropped,
    /// Not formatted; the record or the identifier cache failed.
    Failed,
}

/// Per-outcome counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BridgeStats {
    /// Lines written on the first attempt.
    pub sent: u64,
    /// Lines written after a reconnect.
    pub resent: u64,
    /// Lines dropped after the retry failed.
    pub dropped: u64,
    /// Records that could not be turned into a line.
    pub failed: u64,
}

impl BridgeStats {
    fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Sent => self.sent += 1,
            Outcome::Resent => self.resent += 1,
            Outcome::Dropped => self.dropped += 1,
            Outcome::Failed => self.failed += 1,
        }
    }

    /// Records processed in total.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.sent + self.resent + self.dropped + self.failed
    }
}

/// Orchestrates entity tracking, identifier resolution and output.
#[derive(Debug)]
pub struct Bridge<S> {
    entities: EntityStore,
    cache: Arc<IdentifierCache>,
    sink: S,
    stats: BridgeStats,
}

impl<S: LineSink> Bridge<S> {
    /// Create a bridge writing to `sink`.
    #[must_use]
    pub fn new(cache: Arc<IdentifierCache>, sink: S) -> Self {
        Self {
            entities: EntityStore::new(),
            cache,
            sink,
            stats: BridgeStats::default(),
        }
    }

    /// Counters so far.
    #[must_use]
    pub fn stats(&self) -> BridgeStats {
        self.stats
    }

    /// Entity state tracked so far.
    #[must_use]
    pub fn entities(&self) -> &EntityStore {
        &self.entities
    }

    /// The sink lines are written to.
    #[must_use]
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Process one record observed at `now`.
    pub async fn handle(&mut self, record: &TelemetryRecord, now: NaiveDateTime) -> Outcome {
        let outcome = match self.render(record, now) {
            Ok(line) => {
                debug!(target: SBS_TARGET, "{}", line);
                self.deliver(&line).await
            }
            Err(e) if e.is_format_error() => {
                warn!("Skipping record for {}: {}", record.callsign, e);
                Outcome::Failed
            }
            Err(e) => {
                error!("Identifier lookup failed for {}: {}", record.callsign, e);
                Outcome::Failed
            }
        };

        self.stats.record(outcome);
        outcome
    }

    /// Build the BaseStation line for `record`.
    ///
    /// # Errors
    ///
    /// Returns an error if a field cannot be converted or the identifier
    /// cache cannot be read or written.
    pub fn render(&mut self, record: &TelemetryRecord, now: NaiveDateTime) -> Result<String> {
        let altitude_ft = meters_to_feet(record.altitude)?;
        let speed_kn = kph_to_knots(record.speed)?;

        #[allow(clippy::cast_precision_loss)]
        let climb_rate = self
            .entities
            .observe(&record.callsign, altitude_ft as f64, now);
        let identifier = self.cache.resolve(&record.callsign, now)?;

        PositionMessage {
            identifier: &identifier,
            callsign: &record.callsign,
            timestamp: now,
            latitude: record.latitude,
            longitude: record.longitude,
            altitude_ft,
            speed_kn,
            heading: record.heading,
            climb_rate,
        }
        .to_line()
    }

    async fn deliver(&mut self, line: &str) -> Outcome {
        let first = match self.sink.send_line(line).await {
            Ok(()) => return Outcome::Sent,
            Err(e) => e,
        };
        warn!("Error writing to BaseStation sink ({}), reconnecting", first);

        if let Err(e) = self.sink.reconnect().await {
            error!("Reconnect failed ({}), dropping message", e);
            return Outcome::Dropped;
        }

        match self.sink.send_line(line).await {
            Ok(()) => {
                info!("Resent message after reconnect");
                Outcome::Resent
            }
            Err(e) => {
                error!("Could not send after reconnect ({}), dropping message", e);
                Outcome::Dropped
            }
        }
    }

    /// Process records until shutdown or until the channel closes.
    ///
    /// Records still queued when shutdown fires are not processed. The sink
    /// is closed before returning.
    pub async fn run(
        mut self,
        mut rx: mpsc::Receiver<TelemetryRecord>,
        shutdown: Shutdown,
    ) -> BridgeStats {
        loop {
            let record = tokio::select! {
                biased;
                () = shutdown.wait() => break,
                record = rx.recv() => record,
            };

            let Some(record) = record else {
                debug!("Record channel closed");
                break;
            };
            self.handle(&record, Local::now().naive_local()).await;
        }

        rx.close();
        self.sink.close().await;
        info!(
            "Bridge stopped ({} sent, {} resent, {} dropped, {} failed)",
            self.stats.sent, self.stats.resent, self.stats.dropped, self.stats.failed
        );
        self.stats
    }
}
