//! Location storage with a geohash secondary index.
//!
//! Records are stored at full geohash precision, but queries look up cells
//! at whatever precision the search radius selects. The index therefore
//! holds one entry per record for every precision a query can ask for,
//! keyed by the geohash prefix of that length, so a cell lookup is a plain
//! exact-match read.
//!
//! [`MemoryStore`] optionally writes through to an append-only JSON-lines
//! log (default `~/.geohash-locator/locations.jsonl`). Each put appends one
//! record; replaying the log in order rebuilds the store.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fs;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

use super::types::Location;
use crate::error::StoreError;
use crate::geo::geohash::MAX_PRECISION;
use crate::geo::precision::MIN_QUERY_PRECISION;

/// Precisions held in the secondary index.
pub const INDEXED_PRECISIONS: RangeInclusive<usize> = MIN_QUERY_PRECISION..=MAX_PRECISION;

/// A key-value store of locations with exact-match lookup by geohash cell.
#[async_trait]
pub trait LocationStore: Send + Sync {
    /// Insert or replace the record keyed by `location.id`.
    async fn put(&self, location: Location) -> Result<(), StoreError>;

    /// All records whose geohash, truncated to `cell.len()`, equals `cell`.
    async fn query_cell(&self, cell: &str) -> Result<Vec<Location>, StoreError>;

    /// Number of stored records.
    async fn len(&self) -> Result<usize, StoreError>;
}

#[derive(Default)]
struct Tables {
    records: HashMap<String, Location>,
    /// cell → ids, in insertion order
    by_cell: HashMap<String, Vec<String>>,
}

impl Tables {
    /// Insert a record, returning the one it replaced.
    fn insert(&mut self, location: Location) -> Option<Location> {
        let previous = self.remove(&location.id);
        for key in location.cell_keys(INDEXED_PRECISIONS) {
            self.by_cell
                .entry(key.to_string())
                .or_default()
                .push(location.id.clone());
        }
        self.records.insert(location.id.clone(), location);
        previous
    }

    fn remove(&mut self, id: &str) -> Option<Location> {
        let old = self.records.remove(id)?;
        for key in old.cell_keys(INDEXED_PRECISIONS) {
            if let Some(ids) = self.by_cell.get_mut(key) {
                ids.retain(|i| i != id);
                if ids.is_empty() {
                    self.by_cell.remove(key);
                }
            }
        }
        Some(old)
    }

    fn lookup(&self, cell: &str) -> Vec<Location> {
        self.by_cell
            .get(cell)
            .map(|ids| ids.iter().filter_map(|id| self.records.get(id).cloned()).collect())
            .unwrap_or_default()
    }
}

/// Outcome of reading a log back at startup.
#[derive(Debug, Default)]
struct Replay {
    records: Vec<Location>,
    /// Lines that did not parse or failed validation.
    skipped: usize,
}

/// In-process store, optionally persisted to an append-only log.
///
/// Readers only ever take the in-memory lock. Appends are serialized by
/// `write_gate` and finish before the record becomes visible, so the log
/// order always matches the order puts were applied.
pub struct MemoryStore {
    log: Option<PathBuf>,
    tables: RwLock<Tables>,
    write_gate: tokio::sync::Mutex<()>,
}

impl MemoryStore {
    /// A store with no persistence.
    pub fn new() -> Self {
        Self::with_tables(None, Tables::default())
    }

    fn with_tables(log: Option<PathBuf>, tables: Tables) -> Self {
        Self {
            log,
            tables: RwLock::new(tables),
            write_gate: tokio::sync::Mutex::new(()),
        }
    }

    /// Replay a log file, creating an empty store if it is missing.
    ///
    /// Unreadable lines and invalid records are skipped; every geohash is
    /// re-derived from its coordinates. A log holding skipped or superseded
    /// lines is compacted in place.
    pub fn open(path: PathBuf) -> Self {
        let replay = Self::read_log(&path);
        let mut tables = Tables::default();
        for record in &replay.records {
            tables.insert(record.clone());
        }

        let superseded = replay.records.len() - tables.records.len();
        if replay.skipped > 0 || superseded > 0 {
            tracing::warn!(
                path = %path.display(),
                skipped = replay.skipped,
                superseded,
                "compacting location log"
            );
            if let Err(e) = Self::compact(&path, &replay.records) {
                tracing::warn!(path = %path.display(), error = %e, "log compaction failed");
            }
        }
        tracing::info!(path = %path.display(), records = tables.records.len(), "location store loaded");

        Self::with_tables(Some(path), tables)
    }

    fn read_log(path: &Path) -> Replay {
        let data = match fs::read_to_string(path) {
            Ok(data) => data,
            Err(_) => return Replay::default(),
        };

        let mut replay = Replay::default();
        for (n, line) in data.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<Location>(line) {
                Ok(location) => replay.records.push(location),
                Err(e) => {
                    tracing::warn!(line = n + 1, error = %e, "skipping invalid log line");
                    replay.skipped += 1;
                }
            }
        }
        replay
    }

    /// Rewrite the log with only the last record per id, keeping replay order.
    fn compact(path: &Path, records: &[Location]) -> Result<(), StoreError> {
        let last: HashMap<&str, usize> = records
            .iter()
            .enumerate()
            .map(|(i, r)| (r.id.as_str(), i))
            .collect();

        let mut out = Vec::new();
        for (i, record) in records.iter().enumerate() {
            if last.get(record.id.as_str()) == Some(&i) {
                serde_json::to_writer(&mut out, record)?;
                out.push(b'\n');
            }
        }

        let tmp = path.with_extension("jsonl.tmp");
        fs::write(&tmp, out)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Append one record to the log. A failed write is truncated away so the
    /// next append starts on a clean line.
    async fn append(&self, location: &Location) -> Result<(), StoreError> {
        let Some(path) = &self.log else {
            return Ok(());
        };
        let mut line = serde_json::to_vec(location)?;
        line.push(b'\n');

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;
        let len = file.metadata().await?.len();

        let written = match file.write_all(&line).await {
            Ok(()) => file.flush().await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            if let Err(trunc) = file.set_len(len).await {
                tracing::warn!(path = %path.display(), error = %trunc, "cannot truncate partial append");
            }
            return Err(e.into());
        }
        Ok(())
    }

}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LocationStore for MemoryStore {
    async fn put(&self, location: Location) -> Result<(), StoreError> {
        let _gate = self.write_gate.lock().await;
        self.append(&location).await?;
        self.tables.write().insert(location);
        Ok(())
    }

    async fn query_cell(&self, cell: &str) -> Result<Vec<Location>, StoreError> {
        Ok(self.tables.read().lookup(cell))
    }

    async fn len(&self) -> Result<usize, StoreError> {
        Ok(self.tables.read().records.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::NewLocation;
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    fn loc(id: &str, lat: f64, lon: f64) -> Location {
        Location::index(NewLocation {
            id: id.into(),
            name: format!("{} place", id),
            latitude: lat,
            longitude: lon,
        })
        .unwrap()
    }

    fn ids(locations: &[Location]) -> Vec<&str> {
        locations.iter().map(|l| l.id.as_str()).collect()
    }

    #[tokio::test]
    async fn test_query_every_indexed_precision() {
        let store = MemoryStore::new();
        store.put(loc("nyc", 40.7128, -74.0060)).await.unwrap();

        for p in INDEXED_PRECISIONS {
            let cell = &"dr5regw3p"[..p];
            assert_eq!(ids(&store.query_cell(cell).await.unwrap()), vec!["nyc"], "p={}", p);
        }
        assert!(store.query_cell("d").await.unwrap().is_empty());
        assert!(store.query_cell("dr5regw3q").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cell_returns_insertion_order() {
        let store = MemoryStore::new();
        store.put(loc("b", 40.7128, -74.0060)).await.unwrap();
        store.put(loc("a", 40.7129, -74.0061)).await.unwrap();
        store.put(loc("tokyo", 35.6762, 139.6503)).await.unwrap();

        assert_eq!(ids(&store.query_cell("dr5reg").await.unwrap()), vec!["b", "a"]);
        assert_eq!(store.len().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_replace_moves_index_entries() {
        let store = MemoryStore::new();
        store.put(loc("x", 40.7128, -74.0060)).await.unwrap();
        store.put(loc("x", 51.5074, -0.1278)).await.unwrap();

        assert!(store.query_cell("dr5reg").await.unwrap().is_empty());
        assert_eq!(ids(&store.query_cell("gcpvj").await.unwrap()), vec!["x"]);
        assert_eq!(store.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_deserialized_stale_record_is_indexed_at_its_position() {
        let store = MemoryStore::new();
        let json = r#"{"id":"A","name":"Cafe","latitude":40.7128,"longitude":-74.006,"geohash":"zzzzzzzzz"}"#;
        let record: Location = serde_json::from_str(json).unwrap();
        store.put(record).await.unwrap();

        assert_eq!(ids(&store.query_cell("dr5reg").await.unwrap()), vec!["A"]);
        assert!(store.query_cell("zz").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_log_persistence() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("locations.jsonl");

        {
            let store = MemoryStore::open(path.clone());
            store.put(loc("syd", -33.8688, 151.2093)).await.unwrap();
        }

        let store = MemoryStore::open(path);
        let found = store.query_cell("r3gx2").await.unwrap();
        assert_eq!(ids(&found), vec!["syd"]);
        assert_eq!(found[0].name, "syd place");
    }

    #[tokio::test]
    async fn test_put_appends_one_line() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("locations.jsonl");
        let store = MemoryStore::open(path.clone());

        store.put(loc("a", 40.7128, -74.0060)).await.unwrap();
        store.put(loc("b", 51.5074, -0.1278)).await.unwrap();
        store.put(loc("a", 35.6762, 139.6503)).await.unwrap();

        let data = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = data.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("dr5regw3p"));
        assert!(lines[2].contains("xn76cydhz"));
        assert_eq!(store.len().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_replay_keeps_last_write_and_compacts() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("locations.jsonl");
        let log = [
            r#"{"id": "b", "name": "first", "latitude": 40.7128, "longitude": -74.006}"#,
            r#"{"id": "A", "name": "Cafe", "latitude": 40.7128, "longitude": -74.006, "geohash": "s0000"}"#,
            r#"{"id": "bad", "name": "Nowhere", "latitude": 400.0, "longitude": 0.0}"#,
            r#"{"id": "b", "name": "second", "latitude": 40.7129, "longitude": -74.0061}"#,
            r#"{"id": "torn", "name": "#,
        ]
        .join("\n");
        fs::write(&path, log).unwrap();

        let store = MemoryStore::open(path.clone());
        assert_eq!(store.len().await.unwrap(), 2);
        assert!(store.query_cell("s0000").await.unwrap().is_empty());
        let found = store.query_cell("dr5regw").await.unwrap();
        assert_eq!(ids(&found), vec!["A", "b"]);
        assert_eq!(found[1].name, "second");

        let compacted = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = compacted.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("\"A\""));
        assert!(lines[1].contains("second"));

        // The compacted log replays to the same store.
        let reopened = MemoryStore::open(path);
        assert_eq!(ids(&reopened.query_cell("dr5regw").await.unwrap()), vec!["A", "b"]);
    }

    #[tokio::test]
    async fn test_corrupt_log_starts_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("locations.jsonl");
        fs::write(&path, "{ not json").unwrap();

        let store = MemoryStore::open(path);
        assert_eq!(store.len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_failed_append_leaves_store_unchanged() {
        let dir = TempDir::new().unwrap();
        // A directory where the log file should be makes the open fail.
        let path = dir.path().join("locations.jsonl");
        fs::create_dir_all(path.join("occupied")).unwrap();

        let store = MemoryStore::open(path);
        let err = store.put(loc("nyc", 40.7128, -74.0060)).await.unwrap_err();
        assert!(matches!(err, StoreError::Io(_)));
        assert_eq!(store.len().await.unwrap(), 0);
        assert!(store.query_cell("dr5reg").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reads_do_not_wait_for_pending_write() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(MemoryStore::open(dir.path().join("locations.jsonl")));
        store.put(loc("a", 40.7128, -74.0060)).await.unwrap();

        // Hold the write gate so the next put parks before its append.
        let gate = store.write_gate.lock().await;
        let writer = {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.put(loc("b", 40.7129, -74.0061)).await })
        };
        tokio::task::yield_now().await;

        let found = tokio::time::timeout(Duration::from_millis(200), store.query_cell("dr5reg"))
            .await
            .expect("read blocked behind a write")
            .unwrap();
        assert_eq!(ids(&found), vec!["a"]);
        assert_eq!(store.len().await.unwrap(), 1);

        drop(gate);
        writer.await.unwrap().unwrap();
        assert_eq!(ids(&store.query_cell("dr5reg").await.unwrap()), vec!["a", "b"]);
    }
}
