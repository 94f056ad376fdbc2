/*!
 * Event Store
 * Append-only JSON-lines log of outcome records
 *
 * Writes are serialized through a write guard; loads take the read guard and
 * copy the whole file, so readers always see whole lines. Record ids are
 * unique within a load.
 */

use super::record::OutcomeRecord;
use crate::core::errors::{RecordError, StoreError, StoreResult};
use ahash::AHashSet;
use parking_lot::RwLock;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Record filter; unset fields match everything
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordQuery {
    pub subject: Option<String>,
    pub success: Option<bool>,
}

impl RecordQuery {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    #[inline]
    pub fn success(mut self, success: bool) -> Self {
        self.success = Some(success);
        self
    }

    #[inline]
    pub fn matches(&self, record: &OutcomeRecord) -> bool {
        if let Some(subject) = &self.subject {
            if record.subject() != subject {
                return false;
            }
        }

        if let Some(success) = self.success {
            if record.success() != success {
                return false;
            }
        }

        true
    }
}

/// Append-only event log
#[derive(Debug, Clone)]
pub struct EventStore {
    path: PathBuf,
    lock: Arc<RwLock<()>>,
}

impl EventStore {
    /// Create a store at `path`; the file is created on first append
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            lock: Arc::new(RwLock::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record as a single line
    pub fn append(&self, record: &OutcomeRecord) -> StoreResult<()> {
        let mut line = record.to_line().map_err(|source| StoreError::Serialize {
            record_id: record.id().to_string(),
            source,
        })?;
        line.push('\n');

        let _guard = self.lock.write();

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| self.io_error(source))?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|source| self.io_error(source))?;
        file.write_all(line.as_bytes())
            .map_err(|source| self.io_error(source))?;

        debug!(
            record_id = record.id(),
            subject = record.subject(),
            success = record.success(),
            "Record appended"
        );
        Ok(())
    }

    /// Append on the blocking pool, bounded by `timeout`
    ///
    /// Dropping the returned future stops waiting; a write already handed to the
    /// blocking pool still completes.
    pub async fn append_with_timeout(
        &self,
        record: OutcomeRecord,
        timeout: Duration,
    ) -> StoreResult<()> {
        let store = self.clone();
        let task = tokio::task::spawn_blocking(move || store.append(&record));
        match tokio::time::timeout(timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join)) => Err(StoreError::Join(join.to_string())),
            Err(_) => Err(StoreError::Timeout(timeout)),
        }
    }

    /// All readable records in append order; a missing log is empty
    ///
    /// Malformed lines, including ones that are not UTF-8, are logged and
    /// skipped. A record id seen earlier in the log is skipped too, so a
    /// caller that retries a timed-out append cannot double-count it.
    pub fn load_all(&self) -> StoreResult<Vec<OutcomeRecord>> {
        let content = {
            let _guard = self.lock.read();
            match fs::read(&self.path) {
                Ok(content) => content,
                Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
                Err(source) => return Err(self.io_error(source)),
            }
        };

        let mut seen = AHashSet::new();
        let mut records = Vec::new();
        for (idx, raw) in content.split(|b| *b == b'\n').enumerate() {
            let record = match Self::parse_line(raw, idx + 1) {
                Ok(Some(record)) => record,
                Ok(None) => continue,
                Err(e) => {
                    warn!(path = %self.path.display(), error = %e, "Skipping malformed record");
                    continue;
                }
            };
            if !seen.insert(record.id().to_string()) {
                debug!(record_id = record.id(), line = idx + 1, "Skipping duplicate record");
                continue;
            }
            records.push(record);
        }
        Ok(records)
    }

    fn parse_line(raw: &[u8], line_no: usize) -> Result<Option<OutcomeRecord>, RecordError> {
        let line = std::str::from_utf8(raw).map_err(|e| RecordError::Malformed {
            line: line_no,
            reason: e.to_string(),
        })?;
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        OutcomeRecord::from_line(line, line_no).map(Some)
    }

    /// Records matching `query`; every call re-reads the log
    pub fn filter(
        &self,
        query: RecordQuery,
    ) -> StoreResult<impl Iterator<Item = OutcomeRecord>> {
        Ok(self
            .load_all()?
            .into_iter()
            .filter(move |record| query.matches(record)))
    }

    /// Number of readable records
    pub fn len(&self) -> StoreResult<usize> {
        Ok(self.load_all()?.len())
    }

    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}
