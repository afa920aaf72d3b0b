use std::io;
use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::util::{atomic_copy, atomic_write};

// ============================================================================
// Storage Seam
// ============================================================================

/// Document-persistence primitives behind the feed store.
///
/// The store depends only on this interface, so tests can run against an
/// in-memory implementation and the production path stays a single
/// file-backed implementation. All methods operate on raw bytes; the store
/// owns the JSON encoding.
pub trait Storage: Send + Sync {
    /// Read the canonical document bytes, `None` if no file exists yet.
    fn read_primary(&self) -> io::Result<Option<Vec<u8>>>;

    /// Read the single-slot backup, `None` if no backup exists.
    fn read_backup(&self) -> io::Result<Option<Vec<u8>>>;

    /// Replace the canonical document: copy the current contents (if any)
    /// to the single-slot backup, then write `contents` atomically so an
    /// external reader never observes a partial document.
    fn replace(&self, contents: &[u8]) -> io::Result<()>;

    /// Write a timestamped snapshot that is never overwritten, distinct
    /// from the rolling backup slot. Returns the snapshot location.
    fn snapshot(&self, contents: &[u8]) -> io::Result<PathBuf>;
}

// ============================================================================
// File-backed Storage
// ============================================================================

const DATA_FILE: &str = "feed-data.json";
const BACKUP_SUFFIX: &str = "bak";

/// Production [`Storage`]: one JSON file plus a `.bak` sibling in a data
/// directory.
pub struct FileStorage {
    data_file: PathBuf,
    backup_file: PathBuf,
}

impl FileStorage {
    /// Open storage rooted at `dir`, creating the directory if needed.
    pub fn open(dir: &Path) -> io::Result<Self> {
        std::fs::create_dir_all(dir)?;
        let data_file = dir.join(DATA_FILE);
        let backup_file = data_file.with_extension(format!("json.{BACKUP_SUFFIX}"));
        Ok(Self {
            data_file,
            backup_file,
        })
    }

    /// Open storage at `dir`, falling back to `default_dir` when `dir`
    /// cannot be created (bad mount, permissions). Startup must not abort
    /// over a misconfigured path override.
    pub fn open_or_default(dir: &Path, default_dir: &Path) -> io::Result<Self> {
        match Self::open(dir) {
            Ok(storage) => Ok(storage),
            Err(e) => {
                tracing::warn!(
                    path = %dir.display(),
                    fallback = %default_dir.display(),
                    error = %e,
                    "Data directory unusable, falling back to default"
                );
                Self::open(default_dir)
            }
        }
    }

    /// Location of the canonical data file.
    pub fn data_file(&self) -> &Path {
        &self.data_file
    }
}

fn read_optional(path: &Path) -> io::Result<Option<Vec<u8>>> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

impl Storage for FileStorage {
    fn read_primary(&self) -> io::Result<Option<Vec<u8>>> {
        read_optional(&self.data_file)
    }

    fn read_backup(&self) -> io::Result<Option<Vec<u8>>> {
        read_optional(&self.backup_file)
    }

    fn replace(&self, contents: &[u8]) -> io::Result<()> {
        if self.data_file.exists() {
            atomic_copy(&self.data_file, &self.backup_file)?;
        }
        atomic_write(&self.data_file, contents)
    }

    fn snapshot(&self, contents: &[u8]) -> io::Result<PathBuf> {
        let stamp = Utc::now().format("%Y%m%d_%H%M%S");
        let base = self
            .data_file
            .with_extension(format!("json.backup.{stamp}"));

        // Never overwrite an earlier snapshot taken in the same second.
        let mut path = base.clone();
        let mut n = 1;
        while path.exists() {
            path = PathBuf::from(format!("{}.{n}", base.display()));
            n += 1;
        }

        atomic_write(&path, contents)?;
        Ok(path)
    }
}

// ============================================================================
// In-memory Storage (test fake)
// ============================================================================

/// In-memory [`Storage`] for unit tests: same backup/replace semantics as
/// [`FileStorage`], no filesystem.
#[derive(Default)]
pub struct MemoryStorage {
    inner: std::sync::Mutex<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    primary: Option<Vec<u8>>,
    backup: Option<Vec<u8>>,
    snapshots: Vec<Vec<u8>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the primary slot directly, bypassing backup rotation.
    /// Lets tests plant corrupt or missing primaries.
    pub fn set_primary(&self, contents: Option<Vec<u8>>) {
        self.inner.lock().unwrap().primary = contents;
    }

    /// Overwrite the backup slot directly.
    pub fn set_backup(&self, contents: Option<Vec<u8>>) {
        self.inner.lock().unwrap().backup = contents;
    }

    pub fn snapshot_count(&self) -> usize {
        self.inner.lock().unwrap().snapshots.len()
    }
}

impl Storage for MemoryStorage {
    fn read_primary(&self) -> io::Result<Option<Vec<u8>>> {
        Ok(self.inner.lock().unwrap().primary.clone())
    }

    fn read_backup(&self) -> io::Result<Option<Vec<u8>>> {
        Ok(self.inner.lock().unwrap().backup.clone())
    }

    fn replace(&self, contents: &[u8]) -> io::Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(current) = inner.primary.take() {
            inner.backup = Some(current);
        }
        inner.primary = Some(contents.to_vec());
        Ok(())
    }

    fn snapshot(&self, contents: &[u8]) -> io::Result<PathBuf> {
        let mut inner = self.inner.lock().unwrap();
        inner.snapshots.push(contents.to_vec());
        Ok(PathBuf::from(format!(
            "memory://snapshot/{}",
            inner.snapshots.len()
        )))
    }
}
