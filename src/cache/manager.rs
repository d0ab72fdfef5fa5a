//! Cache store for persisting provider results to disk
//!
//! Provides a `CacheStore` that keeps one JSON record per [`CacheKind`].
//! The store reports a record's age but never decides freshness itself; each
//! provider compares the age against its own freshness window.

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::time::{Duration, SystemTime};
use thiserror::Error;
use tracing::{debug, error, warn};

/// The purpose a cached record serves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheKind {
    /// Approximate coordinates from the geolocation service
    Location,
    /// Place name and temperature from the weather service
    Weather,
}

impl CacheKind {
    /// File name used for this kind inside the cache directory
    pub fn file_name(self) -> &'static str {
        match self {
            CacheKind::Location => "location.cache",
            CacheKind::Weather => "weather.cache",
        }
    }
}

impl fmt::Display for CacheKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKind::Location => write!(f, "location"),
            CacheKind::Weather => write!(f, "weather"),
        }
    }
}

/// Errors from writing or removing cache files
#[derive(Debug, Error)]
pub enum CacheError {
    /// The record could not be serialized
    #[error("failed to serialize {kind} cache record: {source}")]
    Serialize {
        kind: CacheKind,
        #[source]
        source: serde_json::Error,
    },

    /// Filesystem operation failed
    #[error("cache I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// On-disk layout of a cache file
#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry<T> {
    /// Which provider owns this record
    kind: CacheKind,
    /// The cached payload
    data: T,
    /// When the record was written
    cached_at: DateTime<Utc>,
}

/// A record read back from the cache, with its age
#[derive(Debug)]
pub struct CachedRecord<T> {
    /// Which provider owns this record
    pub kind: CacheKind,
    /// The cached payload
    pub data: T,
    /// When the record was written
    pub cached_at: DateTime<Utc>,
    /// Wall-clock time elapsed since the file was last modified
    pub age: Duration,
}

/// Reads, writes and invalidates cache records in a single directory
///
/// There is at most one record per kind; writing replaces the previous one.
/// A file that exists but fails to parse as the expected kind is deleted on
/// read and reported as absent, so a corrupt cache heals itself.
#[derive(Debug, Clone)]
pub struct CacheStore {
    /// Directory where cache files are stored
    cache_dir: PathBuf,
}

impl CacheStore {
    /// Creates a store rooted at `cache_dir`
    pub fn with_dir(cache_dir: PathBuf) -> Self {
        Self { cache_dir }
    }

    /// Returns the path to the cache file for `kind`
    pub fn path(&self, kind: CacheKind) -> PathBuf {
        self.cache_dir.join(kind.file_name())
    }

    /// Ensures the cache directory exists
    fn ensure_dir(&self) -> io::Result<()> {
        fs::create_dir_all(&self.cache_dir)
    }

    /// Writes `data` as the record for `kind`, replacing any previous record
    pub fn write<T: Serialize>(&self, kind: CacheKind, data: &T) -> Result<(), CacheError> {
        let path = self.path(kind);
        self.ensure_dir().map_err(|source| CacheError::Io {
            path: self.cache_dir.clone(),
            source,
        })?;

        let entry = CacheEntry {
            kind,
            data,
            cached_at: Utc::now(),
        };
        let json = serde_json::to_string_pretty(&entry)
            .map_err(|source| CacheError::Serialize { kind, source })?;

        fs::write(&path, json).map_err(|source| CacheError::Io { path, source })
    }

    /// Reads the record for `kind`
    ///
    /// # Returns
    /// * `Some(CachedRecord<T>)` if the file exists and parses as a `kind` record
    /// * `None` if the file is missing, unreadable, or invalid (invalid files are deleted)
    pub fn read<T: DeserializeOwned>(&self, kind: CacheKind) -> Option<CachedRecord<T>> {
        let path = self.path(kind);
        let modified = match fs::metadata(&path).and_then(|m| m.modified()) {
            Ok(modified) => modified,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cannot stat {} cache", kind);
                return None;
            }
        };

        let parsed = fs::read_to_string(&path)
            .map_err(|e| e.to_string())
            .and_then(|content| {
                serde_json::from_str::<CacheEntry<T>>(&content).map_err(|e| e.to_string())
            });

        let entry = match parsed {
            Ok(entry) if entry.kind == kind => entry,
            Ok(entry) => {
                error!(path = %path.display(), found = %entry.kind, "{} cache holds the wrong kind of record", kind);
                self.discard(kind);
                return None;
            }
            Err(reason) => {
                error!(path = %path.display(), %reason, "{} cache seems to be invalid", kind);
                self.discard(kind);
                return None;
            }
        };

        let age = SystemTime::now()
            .duration_since(modified)
            .unwrap_or(Duration::ZERO);
        debug!(age_secs = age.as_secs(), "found {} cache", kind);

        Some(CachedRecord {
            kind,
            data: entry.data,
            cached_at: entry.cached_at,
            age,
        })
    }

    /// Removes the record for `kind`; a missing file is not an error
    pub fn invalidate(&self, kind: CacheKind) -> Result<(), CacheError> {
        let path = self.path(kind);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(CacheError::Io { path, source }),
        }
    }

    fn discard(&self, kind: CacheKind) {
        if let Err(e) = self.invalidate(kind) {
            warn!(error = %e, "could not remove invalid {} cache", kind);
        }
    }
}
