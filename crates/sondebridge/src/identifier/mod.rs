//! Callsign to identifier assignment.
//!
//! BaseStation consumers key aircraft on a 24-bit Mode-S address, so every
//! radiosonde callsign is mapped to a synthetic one: a two hex digit prefix
//! followed by a four digit slot number (`BD0000` .. `BD9999`). At most
//! `capacity` callsigns hold an identifier at a time; when full, the callsign
//! resolved least recently gives up its identifier to the newcomer.
//!
//! The JSON state file is the single source of truth. Every resolution reads
//! it, applies the change and writes it back while holding the cache lock, so
//! assignments survive restarts and external edits are picked up.

pub mod store;

use std::fmt;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{Error, Result};

pub use store::{RecordSet, StateFile};

/// Number of distinct slot numbers available under one prefix.
pub const MAX_IDENTIFIERS: usize = 10_000;

/// Timestamp layout used in the state file.
pub const TIMESTAMP_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

/// A synthetic aircraft identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identifier(String);

impl Identifier {
    /// Build the identifier for slot `index` under `prefix`.
    ///
    /// The slot is zero-padded to four digits.
    #[must_use]
    pub fn from_slot(prefix: &str, index: usize) -> Self {
        Self(format!("{prefix}{index:04}"))
    }

    /// The identifier text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Identifier {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The persisted assignment for one callsign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifierRecord {
    /// Assigned identifier.
    #[serde(rename = "icao")]
    pub identifier: Identifier,
    /// Time of the most recent resolution.
    #[serde(rename = "timestamp", with = "timestamp_format")]
    pub last_used: NaiveDateTime,
}

mod timestamp_format {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::TIMESTAMP_FORMAT;

    pub fn serialize<S: Serializer>(
        value: &NaiveDateTime,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.format(TIMESTAMP_FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<NaiveDateTime, D::Error> {
        let s = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&s, TIMESTAMP_FORMAT).map_err(serde::de::Error::custom)
    }
}

/// Bounded, persistent, least-recently-used identifier cache.
#[derive(Debug)]
pub struct IdentifierCache {
    store: Mutex<StateFile>,
    capacity: usize,
    prefix: String,
}

impl IdentifierCache {
    /// Open a cache backed by the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if `capacity` is outside `1..=MAX_IDENTIFIERS` or the
    /// state directory cannot be created.
    pub fn open(path: impl AsRef<Path>, capacity: usize, prefix: impl Into<String>) -> Result<Self> {
        if capacity == 0 || capacity > MAX_IDENTIFIERS {
            return Err(Error::ConfigValidation {
                message: format!("identifier capacity must be within 1..={MAX_IDENTIFIERS}"),
            });
        }

        let store = StateFile::open(path)?;
        info!(
            "Identifier cache at {} (capacity {})",
            store.path().display(),
            capacity
        );

        Ok(Self {
            store: Mutex::new(store),
            capacity,
            prefix: prefix.into(),
        })
    }

    /// Open the cache described by the configuration.
    ///
    /// # Errors
    ///
    /// See [`IdentifierCache::open`].
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::open(
            config.cache_path(),
            config.cache.capacity,
            config.cache.identifier_prefix.clone(),
        )
    }

    /// Maximum number of callsigns held at once.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Path of the backing state file.
    #[must_use]
    pub fn path(&self) -> std::path::PathBuf {
        self.lock().path().to_path_buf()
    }

    /// Return the identifier for `callsign`, assigning one if needed.
    ///
    /// The record's `last_used` moves to `now` (whole seconds, the resolution
    /// of the state file). A new callsign arriving at capacity evicts the
    /// record with the oldest `last_used`, ties going to the lowest callsign,
    /// and takes over its identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if the state file cannot be read or written. A corrupt
    /// file is not an error; it is replaced by the updated set.
    pub fn resolve(&self, callsign: &str, now: NaiveDateTime) -> Result<Identifier> {
        let store = self.lock();
        let mut records = store.load()?;

        let identifier = match records.get(callsign) {
            Some(existing) => existing.identifier.clone(),
            None => self.assign(callsign, &mut records)?,
        };

        records.insert(
            callsign.to_string(),
            IdentifierRecord {
                identifier: identifier.clone(),
                last_used: truncate_to_seconds(now),
            },
        );
        store.save(&records)?;

        Ok(identifier)
    }

    /// Look up a callsign without touching its recency.
    ///
    /// # Errors
    ///
    /// Returns an error if the state file cannot be read.
    pub fn lookup(&self, callsign: &str) -> Result<Option<Identifier>> {
        let records = self.lock().load()?;
        Ok(records.get(callsign).map(|r| r.identifier.clone()))
    }

    /// All records, most recently used first.
    ///
    /// # Errors
    ///
    /// Returns an error if the state file cannot be read.
    pub fn snapshot(&self) -> Result<Vec<(String, IdentifierRecord)>> {
        let records = self.lock().load()?;
        let mut entries: Vec<_> = records.into_iter().collect();
        entries.sort_by(|a, b| b.1.last_used.cmp(&a.1.last_used).then(a.0.cmp(&b.0)));
        Ok(entries)
    }

    /// Number of callsigns currently holding an identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if the state file cannot be read.
    pub fn len(&self) -> Result<usize> {
        Ok(self.lock().load()?.len())
    }

    /// Check if no callsign holds an identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if the state file cannot be read.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Drop every record.
    ///
    /// Returns the number of records removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the state file cannot be read or written.
    pub fn clear(&self) -> Result<usize> {
        let store = self.lock();
        let removed = store.load()?.len();
        store.save(&RecordSet::new())?;
        info!("Cleared {} identifier records", removed);
        Ok(removed)
    }

    fn assign(&self, callsign: &str, records: &mut RecordSet) -> Result<Identifier> {
        let mut recycled = None;

        // More than one eviction only happens after the capacity was lowered.
        while records.len() >= self.capacity {
            let Some(oldest) = records
                .iter()
                .min_by(|a, b| a.1.last_used.cmp(&b.1.last_used))
                .map(|(callsign, _)| callsign.clone())
            else {
                break;
            };

            if let Some(evicted) = records.remove(&oldest) {
                info!(
                    "Evicted {} ({}) to make room for {}",
                    oldest, evicted.identifier, callsign
                );
                recycled = Some(evicted.identifier);
            }
        }

        let identifier = match recycled {
            Some(identifier) if !is_held(records, &identifier) => identifier,
            _ => self.next_free(records)?,
        };

        info!("Assigned {} to {}", identifier, callsign);
        Ok(identifier)
    }

    /// Slot numbered after the current record count, or the lowest free slot
    /// if that one is taken.
    fn next_free(&self, records: &RecordSet) -> Result<Identifier> {
        let candidate = Identifier::from_slot(&self.prefix, records.len());
        if !is_held(records, &candidate) {
            return Ok(candidate);
        }

        debug!("Slot {} already held, searching for a free one", candidate);
        (0..MAX_IDENTIFIERS)
            .map(|index| Identifier::from_slot(&self.prefix, index))
            .find(|identifier| !is_held(records, identifier))
            .ok_or(Error::IdentifierExhausted {
                capacity: self.capacity,
            })
    }

    fn lock(&self) -> MutexGuard<'_, StateFile> {
        // The guarded value is only a path; a panic elsewhere cannot leave it inconsistent.
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn is_held(records: &RecordSet, identifier: &Identifier) -> bool {
    records.values().any(|r| &r.identifier == identifier)
}

fn truncate_to_seconds(ts: NaiveDateTime) -> NaiveDateTime {
    ts.with_nanosecond(0).unwrap_or(ts)
}
