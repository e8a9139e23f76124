use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

/// Default freshness window for cached entries.
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cache entry {path} is not valid json: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid cache key {0:?}")]
    InvalidKey(String),
}

/// One JSON file per slug under a root directory.
///
/// Freshness is the file's modification time; nothing is ever evicted. Writes are
/// neither locked nor atomic, so two processes writing the same slug race and the
/// last writer wins.
#[derive(Debug, Clone)]
pub struct CacheStore {
    root: PathBuf,
}

impl CacheStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, slug: &str) -> Result<PathBuf, CacheError> {
        if slug.is_empty() || slug.contains(['/', '\\']) || slug.starts_with('.') {
            return Err(CacheError::InvalidKey(slug.to_string()));
        }
        Ok(self.root.join(format!("{slug}.json")))
    }

    /// Returns the stored value when it exists and is at most `max_age` old.
    pub fn read<T: DeserializeOwned>(
        &self,
        slug: &str,
        max_age: Duration,
    ) -> Result<Option<T>, CacheError> {
        self.ensure_root()?;
        let path = self.path_for(slug)?;

        let modified = match fs::metadata(&path).and_then(|m| m.modified()) {
            Ok(modified) => modified,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(slug, "cache miss");
                return Ok(None);
            }
            Err(source) => return Err(CacheError::Io { path, source }),
        };
        let age = SystemTime::now()
            .duration_since(modified)
            .unwrap_or(Duration::ZERO);
        if age > max_age {
            debug!(slug, age_secs = age.as_secs(), "cache entry expired");
            return Ok(None);
        }

        let file = match File::open(&path) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(CacheError::Io { path, source }),
        };
        let value = serde_json::from_reader(BufReader::new(file))
            .map_err(|source| CacheError::Json { path: path.clone(), source })?;
        debug!(slug, age_secs = age.as_secs(), "cache hit");
        Ok(Some(value))
    }

    /// Replaces the value stored under `slug`. The file is flushed and synced before returning.
    pub fn write<T: Serialize>(&self, slug: &str, value: &T) -> Result<(), CacheError> {
        self.ensure_root()?;
        let path = self.path_for(slug)?;

        let file = File::create(&path).map_err(|source| CacheError::Io {
            path: path.clone(),
            source,
        })?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, value).map_err(|source| CacheError::Json {
            path: path.clone(),
            source,
        })?;
        let file = writer
            .into_inner()
            .map_err(|err| CacheError::Io {
                path: path.clone(),
                source: err.into_error(),
            })?;
        file.sync_all()
            .map_err(|source| CacheError::Io { path: path.clone(), source })?;
        debug!(slug, path = %path.display(), "cache write");
        Ok(())
    }

    fn ensure_root(&self) -> Result<(), CacheError> {
        fs::create_dir_all(&self.root).map_err(|source| CacheError::Io {
            path: self.root.clone(),
            source,
        })
    }
}
