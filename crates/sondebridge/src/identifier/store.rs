//! JSON state file backing the identifier cache.
//!
//! The file maps callsign to `{"icao": ..., "timestamp": "YYYY/MM/DD HH:MM:SS"}`.
//! Writes go to a temporary file in the same directory which is then renamed
//! over the target, so readers never observe a half-written file.

use std::collections::BTreeMap;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, warn};

use super::IdentifierRecord;
use crate::error::{Error, Result};

/// Records keyed by callsign.
pub type RecordSet = BTreeMap<String, IdentifierRecord>;

/// Handle to the identifier state file.
#[derive(Debug)]
pub struct StateFile {
    path: PathBuf,
}

impl StateFile {
    /// Create a handle for the given path, creating parent directories.
    ///
    /// The file itself is not created until the first save.
    ///
    /// # Errors
    ///
    /// Returns an error if the parent directory cannot be created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let parent = parent_dir(&path);
        if !parent.exists() {
            std::fs::create_dir_all(&parent).map_err(|source| Error::DirectoryCreate {
                path: parent.clone(),
                source,
            })?;
        }

        Ok(Self { path })
    }

    /// Path of the state file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load every record from disk.
    ///
    /// A missing or blank file is an empty set. A file that does not parse is
    /// logged and treated as empty; the next save overwrites it.
    ///
    /// # Errors
    ///
    /// Returns an error only if the file exists but cannot be read.
    pub fn load(&self) -> Result<RecordSet> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(RecordSet::new()),
            Err(source) => {
                return Err(Error::CacheRead {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        if contents.trim().is_empty() {
            return Ok(RecordSet::new());
        }

        match serde_json::from_str::<RecordSet>(&contents) {
            Ok(records) => Ok(records),
            Err(e) => {
                warn!(
                    "Identifier state at {} is corrupt ({}), starting from an empty set",
                    self.path.display(),
                    e
                );
                Ok(RecordSet::new())
            }
        }
    }

    /// Replace the file contents with `records`.
    ///
    /// # Errors
    ///
    /// Returns an error if the temporary file cannot be written or renamed.
    pub fn save(&self, records: &RecordSet) -> Result<()> {
        let json = serde_json::to_vec(records)?;
        let write_err = |source| Error::CacheWrite {
            path: self.path.clone(),
            source,
        };

        let mut tmp = NamedTempFile::new_in(parent_dir(&self.path)).map_err(write_err)?;
        tmp.write_all(&json).map_err(write_err)?;
        tmp.as_file().sync_all().map_err(write_err)?;
        tmp.persist(&self.path).map_err(|e| write_err(e.error))?;

        debug!(
            "Saved {} identifier records to {}",
            records.len(),
            self.path.display()
        );
        Ok(())
    }
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifier::Identifier;
    use chrono::NaiveDate;

    fn record(identifier: &str, hour: u32) -> IdentifierRecord {
        IdentifierRecord {
            identifier: Identifier::from(identifier),
            last_used: NaiveDate::from_ymd_opt(2024, 5, 1)
                .unwrap()
                .and_hms_opt(hour, 30, 15)
                .unwrap(),
        }
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let file = StateFile::open(dir.path().join("icaos.json")).unwrap();
        assert!(file.load().unwrap().is_empty());
    }

    #[test]
    fn test_load_blank_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("icaos.json");
        std::fs::write(&path, "\n").unwrap();

        let file = StateFile::open(&path).unwrap();
        assert!(file.load().unwrap().is_empty());
    }

    #[test]
    fn test_load_corrupt_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("icaos.json");
        std::fs::write(&path, "{\"S1\": {\"icao\": \"BD00").unwrap();

        let file = StateFile::open(&path).unwrap();
        assert!(file.load().unwrap().is_empty());
    }

    #[test]
    fn test_load_bad_timestamp_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("icaos.json");
        std::fs::write(
            &path,
            r#"{"S1": {"icao": "BD0000", "timestamp": "2024-05-01T12:00:00"}}"#,
        )
        .unwrap();

        let file = StateFile::open(&path).unwrap();
        assert!(file.load().unwrap().is_empty());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let file = StateFile::open(dir.path().join("icaos.json")).unwrap();

        let mut records = RecordSet::new();
        records.insert("S1".to_string(), record("BD0000", 10));
        records.insert("S2".to_string(), record("BD0001", 11));
        file.save(&records).unwrap();

        assert_eq!(file.load().unwrap(), records);
    }

    #[test]
    fn test_saved_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("icaos.json");
        let file = StateFile::open(&path).unwrap();

        let mut records = RecordSet::new();
        records.insert("S1".to_string(), record("BD0000", 9));
        file.save(&records).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            raw,
            r#"{"S1":{"icao":"BD0000","timestamp":"2024/05/01 09:30:15"}}"#
        );
    }

    #[test]
    fn test_reads_reference_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("icaos.json");
        std::fs::write(
            &path,
            r#"{"N1234567": {"icao": "BD0003", "timestamp": "2023/12/31 23:59:59"}}"#,
        )
        .unwrap();

        let records = StateFile::open(&path).unwrap().load().unwrap();
        let rec = &records["N1234567"];
        assert_eq!(rec.identifier.as_str(), "BD0003");
        assert_eq!(
            rec.last_used,
            NaiveDate::from_ymd_opt(2023, 12, 31)
                .unwrap()
                .and_hms_opt(23, 59, 59)
                .unwrap()
        );
    }

    #[test]
    fn test_save_replaces_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("icaos.json");
        std::fs::write(&path, "garbage").unwrap();

        let file = StateFile::open(&path).unwrap();
        let mut records = file.load().unwrap();
        records.insert("S1".to_string(), record("BD0000", 1));
        file.save(&records).unwrap();

        assert_eq!(file.load().unwrap().len(), 1);
    }

    #[test]
    fn test_save_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let file = StateFile::open(dir.path().join("icaos.json")).unwrap();

        for i in 0..5 {
            let mut records = RecordSet::new();
            records.insert(format!("S{i}"), record("BD0000", i));
            file.save(&records).unwrap();
        }

        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_open_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b").join("icaos.json");

        let file = StateFile::open(&nested).unwrap();
        assert!(nested.parent().unwrap().exists());
        assert_eq!(file.path(), nested);
    }

    #[test]
    fn test_parent_dir_of_bare_file_name() {
        assert_eq!(parent_dir(Path::new("icaos.json")), PathBuf::from("."));
        assert_eq!(
            parent_dir(Path::new("/var/lib/icaos.json")),
            PathBuf::from("/var/lib")
        );
    }
}
