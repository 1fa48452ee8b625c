//! JSON-file backed raw store.
//!
//! Each store is one `<dir>/<name>.json` file holding a flat object of string
//! entries. The whole map is kept in memory; writes replace the file atomically
//! (temp file in the same directory, then rename).
//!
//! `apply` hands persisting to one background writer per store, so a burst of
//! applies costs a few whole-file writes rather than one each. `commit` waits
//! for that writer and writes synchronously.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::{debug, instrument, warn};

use super::memory::EntryTable;
use super::{
    PendingChanges, RawChangeListener, RawEditor, RawStore, StoreError, StoreProvider,
    SubscriptionId,
};

struct FileInner {
    name: String,
    path: PathBuf,
    table: EntryTable,
    /// Serializes writers of the backing file.
    write_lock: Mutex<()>,
    background: Mutex<BackgroundFlush>,
    /// Signalled when the background writer exits.
    background_idle: Condvar,
}

/// State of the per-store background writer started by `apply`.
#[derive(Default)]
struct BackgroundFlush {
    /// Memory holds changes the writer has not picked up yet.
    dirty: bool,
    /// A writer thread is alive. At most one per store.
    running: bool,
}

/// A [`RawStore`] persisted to a single JSON file.
///
/// Clones share state. Open stores through a [`FileBackend`] so that every
/// handle for one name shares a single in-memory copy.
#[derive(Clone)]
pub struct FileStore {
    inner: Arc<FileInner>,
}

impl FileStore {
    /// Load the store at `path`, or start empty if the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the file cannot be read and
    /// [`StoreError::Corrupt`] if it is not a JSON object of strings.
    #[instrument(level = "debug", skip(path), fields(path = %path.as_ref().display()))]
    pub fn open(name: &str, path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let entries = match fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str::<BTreeMap<String, String>>(&text).map_err(
                |source| StoreError::Corrupt {
                    path: path.clone(),
                    source,
                },
            )?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        debug!(entries = entries.len(), "Opened store file");

        Ok(Self {
            inner: Arc::new(FileInner {
                name: name.to_owned(),
                path,
                table: EntryTable::new(entries),
                write_lock: Mutex::new(()),
                background: Mutex::new(BackgroundFlush::default()),
                background_idle: Condvar::new(),
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    /// Write the current entries to disk.
    pub fn flush(&self) -> Result<(), StoreError> {
        let _guard = self
            .inner
            .write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        // Snapshot under the write lock so the last writer always writes the newest state
        let snapshot = self.inner.table.snapshot();
        self.write_atomic(&snapshot)
            .map_err(|source| StoreError::Io {
                path: self.inner.path.clone(),
                source,
            })
    }

    /// Block until the background writer has written everything applied so far.
    pub fn wait_for_background_writes(&self) {
        let mut state = self.background();
        while state.running {
            state = self
                .inner
                .background_idle
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    fn background(&self) -> MutexGuard<'_, BackgroundFlush> {
        self.inner
            .background
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Mark memory dirty and make sure a writer is running.
    ///
    /// Applies that land while the writer is busy coalesce into its next write.
    fn schedule_flush(&self) {
        {
            let mut state = self.background();
            state.dirty = true;
            if state.running {
                return;
            }
            state.running = true;
        }

        let store = self.clone();
        let spawned = thread::Builder::new()
            .name(format!("oxprefs-flush-{}", self.inner.name))
            .spawn(move || store.run_background_writer());
        if let Err(e) = spawned {
            warn!(store = %self.inner.name, error = %e, "Could not start background writer, writing inline");
            self.run_background_writer();
        }
    }

    fn run_background_writer(&self) {
        loop {
            {
                let mut state = self.background();
                if !state.dirty {
                    state.running = false;
                    self.inner.background_idle.notify_all();
                    return;
                }
                state.dirty = false;
            }
            if let Err(e) = self.flush() {
                warn!(store = %self.inner.name, error = %e, "Background write failed");
            }
        }
    }

    /// Drop any scheduled background write and wait out one in progress.
    ///
    /// Callers flush right after, which covers everything the writer skipped.
    fn cancel_background_writes(&self) {
        let mut state = self.background();
        state.dirty = false;
        while state.running {
            state = self
                .inner
                .background_idle
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    fn write_atomic(&self, entries: &BTreeMap<String, String>) -> io::Result<()> {
        let path = &self.inner.path;
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent)?;

        let mut temp_file = tempfile::NamedTempFile::new_in(parent)?;
        serde_json::to_writer_pretty(&mut temp_file, entries)?;
        temp_file.write_all(b"\n")?;
        temp_file.as_file().sync_all()?;
        temp_file.persist(path).map_err(|e| e.error)?;
        Ok(())
    }
}

impl fmt::Debug for FileStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileStore")
            .field("name", &self.inner.name)
            .field("path", &self.inner.path)
            .finish_non_exhaustive()
    }
}

impl RawStore for FileStore {
    fn name(&self) -> &str {
        &self.inner.name
    }

    fn get(&self, key: &str) -> Option<String> {
        self.inner.table.get(key)
    }

    fn contains(&self, key: &str) -> bool {
        self.inner.table.contains(key)
    }

    fn all_entries(&self) -> BTreeMap<String, String> {
        self.inner.table.snapshot()
    }

    fn edit(&self) -> Box<dyn RawEditor> {
        Box::new(FileEditor {
            store: self.clone(),
            pending: PendingChanges::default(),
        })
    }

    fn subscribe(&self, listener: RawChangeListener) -> SubscriptionId {
        self.inner.table.subscribe(listener)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.table.unsubscribe(id)
    }
}

struct FileEditor {
    store: FileStore,
    pending: PendingChanges,
}

impl FileEditor {
    fn apply_in_memory(&mut self) -> Vec<String> {
        let changes = std::mem::take(&mut self.pending);
        self.store.inner.table.apply(changes)
    }
}

impl RawEditor for FileEditor {
    fn put(&mut self, key: &str, value: &str) {
        self.pending.put(key, value);
    }

    fn remove(&mut self, key: &str) {
        self.pending.remove(key);
    }

    fn clear(&mut self) {
        self.pending.clear();
    }

    fn apply(&mut self) {
        let changed = self.apply_in_memory();
        self.store.inner.table.notify(&self.store, &changed);
        if changed.is_empty() {
            return;
        }

        self.store.schedule_flush();
    }

    fn commit(&mut self) -> bool {
        let changed = self.apply_in_memory();
        self.store.cancel_background_writes();
        let result = self.store.flush();
        self.store.inner.table.notify(&self.store, &changed);
        match result {
            Ok(()) => true,
            Err(e) => {
                warn!(store = %self.store.inner.name, error = %e, "Commit failed to persist");
                false
            }
        }
    }
}

/// Provider mapping store names to JSON files in one directory.
pub struct FileBackend {
    dir: PathBuf,
    stores: DashMap<String, FileStore>,
}

impl FileBackend {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            stores: DashMap::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file backing `name`.
    pub fn path_for(&self, name: &str) -> Result<PathBuf, StoreError> {
        validate_name(name)?;
        Ok(self.dir.join(format!("{name}.json")))
    }

    /// Open (or create) the file store called `name`.
    pub fn store(&self, name: &str) -> Result<FileStore, StoreError> {
        let path = self.path_for(name)?;
        match self.stores.entry(name.to_owned()) {
            Entry::Occupied(entry) => Ok(entry.get().clone()),
            Entry::Vacant(entry) => {
                let store = FileStore::open(name, path)?;
                entry.insert(store.clone());
                Ok(store)
            }
        }
    }
}

impl fmt::Debug for FileBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileBackend")
            .field("dir", &self.dir)
            .field("open_stores", &self.stores.len())
            .finish()
    }
}

impl StoreProvider for FileBackend {
    fn open(&self, name: &str) -> Result<Arc<dyn RawStore>, StoreError> {
        Ok(Arc::new(self.store(name)?))
    }
}

/// Store names become file names, so they must be a single path component.
fn validate_name(name: &str) -> Result<(), StoreError> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '\0']);
    if invalid {
        return Err(StoreError::InvalidName(name.to_owned()));
    }
    Ok(())
}
