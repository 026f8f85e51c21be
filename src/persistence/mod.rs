//! Durable storage for engine state
//!
//! The engine persists two snapshots: the credit ledger and the report
//! history. Backends only load and save whole snapshots; the engine decides
//! when to save.

mod paths;

pub use paths::{data_dir, default_data_dir, ensure_data_dir, ledger_path, reports_path};

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt data in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Backend unavailable: {0}")]
    Unavailable(String),
}

pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// Load/save of one snapshot type
pub trait SnapshotBackend<T>: Send + Sync {
    /// `Ok(None)` when nothing has been saved yet
    fn load(&self) -> PersistenceResult<Option<T>>;

    fn save(&self, value: &T) -> PersistenceResult<()>;
}

/// Pretty-printed JSON file, replaced atomically on save
#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> PersistenceError {
        PersistenceError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl<T> SnapshotBackend<T> for JsonFileBackend
where
    T: Serialize + DeserializeOwned,
{
    fn load(&self) -> PersistenceResult<Option<T>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_error(e)),
        };

        let value = serde_json::from_str(&content).map_err(|source| PersistenceError::Json {
            path: self.path.clone(),
            source,
        })?;
        debug!("Loaded {}", self.path.display());
        Ok(Some(value))
    }

    fn save(&self, value: &T) -> PersistenceResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }

        let json = serde_json::to_string_pretty(value).map_err(|source| PersistenceError::Json {
            path: self.path.clone(),
            source,
        })?;

        // Sibling temp file then rename, so readers never see a half-written
        // snapshot. The name is unique per save so concurrent writers never
        // share one.
        let tmp = self
            .path
            .with_extension(format!("json.{}.tmp", uuid::Uuid::new_v4().simple()));
        std::fs::write(&tmp, json).map_err(|e| self.io_error(e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| self.io_error(e))?;

        debug!("Saved {}", self.path.display());
        Ok(())
    }
}

/// In-memory backend for tests and ephemeral sessions
pub struct MemoryBackend<T> {
    value: Mutex<Option<T>>,
    saves: AtomicUsize,
    fail_saves: bool,
}

impl<T> Default for MemoryBackend<T> {
    fn default() -> Self {
        Self {
            value: Mutex::new(None),
            saves: AtomicUsize::new(0),
            fail_saves: false,
        }
    }
}

impl<T: Clone> MemoryBackend<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend pre-loaded with a value
    pub fn with_value(value: T) -> Self {
        Self {
            value: Mutex::new(Some(value)),
            ..Self::default()
        }
    }

    /// Backend whose saves always fail
    pub fn failing() -> Self {
        Self {
            fail_saves: true,
            ..Self::default()
        }
    }

    /// Last saved value
    pub fn value(&self) -> Option<T> {
        self.value.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Number of successful saves
    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl<T: Clone + Send> SnapshotBackend<T> for MemoryBackend<T> {
    fn load(&self) -> PersistenceResult<Option<T>> {
        Ok(self.value())
    }

    fn save(&self, value: &T) -> PersistenceResult<()> {
        if self.fail_saves {
            return Err(PersistenceError::Unavailable(
                "memory backend configured to fail".to_string(),
            ));
        }
        *self.value.lock().unwrap_or_else(|e| e.into_inner()) = Some(value.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Counter {
        count: u32,
    }

    #[test]
    fn test_missing_file_loads_none() {
        let dir = TempDir::new().unwrap();
        let backend = JsonFileBackend::new(dir.path().join("nothing.json"));
        let loaded: Option<Counter> = backend.load().unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let backend = JsonFileBackend::new(dir.path().join("nested").join("counter.json"));
        backend.save(&Counter { count: 3 }).unwrap();

        let loaded: Option<Counter> = backend.load().unwrap();
        assert_eq!(loaded, Some(Counter { count: 3 }));
        let names: Vec<String> = std::fs::read_dir(dir.path().join("nested"))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["counter.json"]);
    }

    #[test]
    fn test_concurrent_saves_use_separate_temp_files() {
        let dir = TempDir::new().unwrap();
        let backend = JsonFileBackend::new(dir.path().join("counter.json"));

        std::thread::scope(|s| {
            for count in 0..8 {
                let backend = &backend;
                s.spawn(move || {
                    for _ in 0..20 {
                        SnapshotBackend::<Counter>::save(backend, &Counter { count }).unwrap();
                    }
                });
            }
        });

        let loaded: Option<Counter> = backend.load().unwrap();
        assert!(loaded.is_some_and(|c| c.count < 8));
        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("counter.json");
        std::fs::write(&path, "{ not json").unwrap();

        let backend = JsonFileBackend::new(&path);
        let result: PersistenceResult<Option<Counter>> = backend.load();
        assert!(matches!(result, Err(PersistenceError::Json { .. })));
    }

    #[test]
    fn test_memory_backend() {
        let backend = MemoryBackend::new();
        assert_eq!(backend.load().unwrap(), None::<Counter>);
        backend.save(&Counter { count: 1 }).unwrap();
        assert_eq!(backend.value(), Some(Counter { count: 1 }));
        assert_eq!(backend.saves(), 1);

        let failing = MemoryBackend::<Counter>::failing();
        assert!(failing.save(&Counter { count: 1 }).is_err());
        assert_eq!(failing.saves(), 0);
    }
}
