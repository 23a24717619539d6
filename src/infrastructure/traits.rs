//! I/O boundary traits for testability
//!
//! The session only talks to durable storage, the host's prompt fields and the
//! filesystem through these traits, so every collaborator can be swapped for an
//! in-memory double.

use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, instrument};

/// Filesystem abstraction for testability.
pub trait FileSystem: Send + Sync {
    /// Read file contents to string.
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Write string content to file.
    fn write(&self, path: &Path, content: &str) -> io::Result<()>;

    /// Check if path exists.
    fn exists(&self, path: &Path) -> bool;

    /// Create directory and all parent directories.
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Rename/move a file.
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Remove a file.
    fn remove_file(&self, path: &Path) -> io::Result<()>;

    /// Create parent directories if needed.
    fn ensure_parent(&self, path: &Path) -> io::Result<()>;
}

/// Durable key-value storage holding the serialized composition.
pub trait KeyValueStore: Send + Sync {
    /// Stored value, `None` when the key was never written.
    fn get(&self, key: &str) -> io::Result<Option<String>>;

    fn set(&self, key: &str, value: &str) -> io::Result<()>;

    /// Removing an absent key is not an error.
    fn remove(&self, key: &str) -> io::Result<()>;
}

/// The two host-owned text fields receiving the compiled prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptField {
    Positive,
    Negative,
}

impl fmt::Display for PromptField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PromptField::Positive => write!(f, "positive"),
            PromptField::Negative => write!(f, "negative"),
        }
    }
}

/// Write-only sink for the host's prompt fields. Never read back.
pub trait HostFields: Send + Sync {
    fn write(&self, field: PromptField, text: &str) -> io::Result<()>;
}

fn poisoned() -> io::Error {
    io::Error::other("lock poisoned")
}

fn lock<T>(mutex: &Mutex<T>) -> io::Result<MutexGuard<'_, T>> {
    mutex.lock().map_err(|_| poisoned())
}

// ============================================================
// REAL IMPLEMENTATIONS
// ============================================================

/// Real filesystem implementation.
#[derive(Debug, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn write(&self, path: &Path, content: &str) -> io::Result<()> {
        std::fs::write(path, content)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        std::fs::create_dir_all(path)
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        std::fs::rename(from, to)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        std::fs::remove_file(path)
    }

    fn ensure_parent(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                self.create_dir_all(parent)?;
            }
        }
        Ok(())
    }
}

/// Key-value store keeping one `<key>.json` file per key under a directory.
///
/// Writes go to a temporary sibling first and are renamed into place, so a crash
/// mid-write leaves the previous value intact.
pub struct FileStore {
    fs: Arc<dyn FileSystem>,
    dir: PathBuf,
}

impl FileStore {
    pub fn new(fs: Arc<dyn FileSystem>, dir: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            dir: dir.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path holding `key`. Keys are plain names, never paths.
    pub fn path_for(&self, key: &str) -> io::Result<PathBuf> {
        let valid = !key.is_empty()
            && !key.starts_with('.')
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if !valid {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid storage key: '{key}'"),
            ));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> io::Result<Option<String>> {
        let path = self.path_for(key)?;
        if !self.fs.exists(&path) {
            return Ok(None);
        }
        self.fs.read_to_string(&path).map(Some)
    }

    #[instrument(level = "debug", skip(self, value))]
    fn set(&self, key: &str, value: &str) -> io::Result<()> {
        let path = self.path_for(key)?;
        self.fs.ensure_parent(&path)?;
        let tmp = path.with_extension("json.tmp");
        self.fs.write(&tmp, value)?;
        self.fs.rename(&tmp, &path)?;
        debug!("stored {} bytes at {}", value.len(), path.display());
        Ok(())
    }

    fn remove(&self, key: &str) -> io::Result<()> {
        let path = self.path_for(key)?;
        if self.fs.exists(&path) {
            self.fs.remove_file(&path)?;
        }
        Ok(())
    }
}

/// Host fields backed by two plain text files, for hosts that watch files.
pub struct FileFields {
    fs: Arc<dyn FileSystem>,
    positive: PathBuf,
    negative: PathBuf,
}

impl FileFields {
    pub fn new(fs: Arc<dyn FileSystem>, positive: PathBuf, negative: PathBuf) -> Self {
        Self {
            fs,
            positive,
            negative,
        }
    }

    /// `positive.txt` and `negative.txt` inside `dir`.
    pub fn in_dir(fs: Arc<dyn FileSystem>, dir: &Path) -> Self {
        Self::new(fs, dir.join("positive.txt"), dir.join("negative.txt"))
    }
}

impl HostFields for FileFields {
    fn write(&self, field: PromptField, text: &str) -> io::Result<()> {
        let path = match field {
            PromptField::Positive => &self.positive,
            PromptField::Negative => &self.negative,
        };
        self.fs.ensure_parent(path)?;
        self.fs.write(path, text)
    }
}

// ============================================================
// IN-MEMORY IMPLEMENTATIONS
// ============================================================

/// Volatile key-value store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-filled with one entry.
    pub fn with_entry(key: &str, value: &str) -> Self {
        let entries = HashMap::from([(key.to_string(), value.to_string())]);
        Self {
            entries: Mutex::new(entries),
        }
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> io::Result<Option<String>> {
        Ok(lock(&self.entries)?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> io::Result<()> {
        lock(&self.entries)?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> io::Result<()> {
        lock(&self.entries)?.remove(key);
        Ok(())
    }
}

/// Host fields kept in memory; the embedding host reads them back.
#[derive(Debug, Default)]
pub struct MemoryFields {
    positive: Mutex<String>,
    negative: Mutex<String>,
}

impl MemoryFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn positive(&self) -> String {
        self.read(PromptField::Positive)
    }

    pub fn negative(&self) -> String {
        self.read(PromptField::Negative)
    }

    fn slot(&self, field: PromptField) -> &Mutex<String> {
        match field {
            PromptField::Positive => &self.positive,
            PromptField::Negative => &self.negative,
        }
    }

    fn read(&self, field: PromptField) -> String {
        lock(self.slot(field))
            .map(|text| text.clone())
            .unwrap_or_default()
    }
}

impl HostFields for MemoryFields {
    fn write(&self, field: PromptField, text: &str) -> io::Result<()> {
        let mut slot = lock(self.slot(field))?;
        slot.clear();
        slot.push_str(text);
        Ok(())
    }
}
