//! The store owns every published entry: the retained history readings,
//! the per-field and derived entries of the most recent batch, the
//! append-only log and the `latest` symlink.
//!
//! All mutation goes through one lock scope per operation, so readers
//! never observe a half-applied batch. Nothing performs I/O while the
//! lock is held.

use std::collections::{hash_map, HashMap, VecDeque};
use std::sync::Mutex;

use chrono::{DateTime, Utc};

use crate::record::Record;

/// Name of the append-only operational log entry.
pub const LOG_NAME: &str = "log";

/// Name of the symlink targeting the most recent reading.
pub const LATEST_NAME: &str = "latest";

/// Name the synthetic root directory entry answers to.
pub const ROOT_NAME: &str = "/";

/// What an entry is, filesystem-wise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// The root of the published hierarchy. The namespace is flat, so
    /// there is exactly one of these and it is synthesized on demand.
    Directory,

    /// A regular file.
    File,

    /// A symbolic link; the payload is the target name.
    Symlink,
}

/// One named, typed, timestamped unit of published content.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    name: String,
    kind: EntryKind,
    payload: String,
    created_at: DateTime<Utc>,
    modified_at: DateTime<Utc>,
    accessed_at: DateTime<Utc>,
}

impl Entry {
    fn new(kind: EntryKind, name: impl Into<String>, payload: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            kind,
            payload: payload.into(),
            created_at: at,
            modified_at: at,
            accessed_at: at,
        }
    }

    /// Replace the payload, updating the modification time.
    fn set_payload(&mut self, payload: impl Into<String>, at: DateTime<Utc>) {
        self.payload = payload.into();
        self.modified_at = at;
    }

    /// The entry's unique name within the store.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Directory, file or symlink.
    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    /// The raw published content.
    pub fn payload(&self) -> &str {
        &self.payload
    }

    /// When the entry was created.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// When the payload was last replaced or appended to.
    pub fn modified_at(&self) -> DateTime<Utc> {
        self.modified_at
    }

    /// When the entry was last accessed.
    pub fn accessed_at(&self) -> DateTime<Utc> {
        self.accessed_at
    }

    /// The payload bytes in `[offset, offset + length)`.
    ///
    /// Out-of-range offsets yield an empty slice, a range reaching past
    /// the end yields the available suffix. Never fails.
    pub fn read_at(&self, offset: u64, length: u32) -> &[u8] {
        let bytes = self.payload.as_bytes();
        let start = usize::try_from(offset).unwrap_or(usize::MAX).min(bytes.len());
        let end = start.saturating_add(length as usize).min(bytes.len());
        &bytes[start..end]
    }
}

/// Everything one accepted record publishes as a unit: the raw fields,
/// plus any derived values the projection rules produced from them.
#[derive(Debug, Clone)]
pub struct Batch {
    record: Record,
    derived: Vec<(String, String)>,
}

impl Batch {
    /// A batch with no derived values yet.
    pub fn new(record: Record) -> Self {
        Self {
            record,
            derived: Vec::new(),
        }
    }

    /// Add a derived `name`/`value` pair.
    pub fn push_derived(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.derived.push((name.into(), value.into()));
    }

    /// The record this batch was produced from.
    pub fn record(&self) -> &Record {
        &self.record
    }
}

#[derive(Debug)]
struct Inner {
    entries: HashMap<String, Entry>,

    /// Names of retained history readings, oldest first.
    history: VecDeque<String>,

    /// Names published by the most recent batch (raw and derived),
    /// replaced wholesale on the next one.
    projected: Vec<String>,

    created_at: DateTime<Utc>,
}

impl Inner {
    fn log(&mut self, message: &str) {
        let log = self
            .entries
            .get_mut(LOG_NAME)
            .expect("The log entry exists for the store's whole lifetime");

        log.payload.push_str(message);
        log.payload.push('\n');
        log.modified_at = Utc::now();
    }

    fn insert_projected(&mut self, entry: Entry) {
        self.projected.push(entry.name.clone());
        self.entries.insert(entry.name.clone(), entry);
    }

    fn root(&self) -> Entry {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();

        Entry::new(EntryKind::Directory, ROOT_NAME, names.join("\n"), self.created_at)
    }
}

/// The thread-safe, bounded, time-ordered collection of published
/// entries.
///
/// Intended to be shared (`Arc`) between the acquisition task and
/// whatever serves foreground queries.
#[derive(Debug)]
pub struct Store {
    keep: usize,
    inner: Mutex<Inner>,
}

impl Store {
    /// A store retaining at most `keep` history readings.
    ///
    /// The log entry exists from the start; the `latest` symlink only
    /// appears with the first published reading.
    pub fn new(keep: usize) -> Self {
        let now = Utc::now();

        let mut entries = HashMap::new();
        entries.insert(
            LOG_NAME.to_string(),
            Entry::new(EntryKind::File, LOG_NAME, "", now),
        );

        Self {
            keep,
            inner: Mutex::new(Inner {
                entries,
                history: VecDeque::new(),
                projected: Vec::new(),
                created_at: now,
            }),
        }
    }

    /// How many history readings are retained.
    pub fn keep(&self) -> usize {
        self.keep
    }

    /// Publish a batch as one atomic step.
    ///
    /// In order: insert the history reading, retarget `latest`, drop the
    /// previous batch's entries, insert this batch's raw and derived
    /// entries, evict history readings beyond the retention bound.
    /// A reader holding the lock between any two of these never runs;
    /// it sees the store strictly before or strictly after.
    pub fn publish(&self, batch: Batch) {
        let at = batch.record().received_at();
        let name = batch.record().name();
        let composite = batch.record().composite();

        let inner = &mut *self.lock();

        // Two records within the same second share a name. The later one
        // replaces the payload in place; the history queue must not be
        // double-pushed or the eviction count drifts.
        match inner.entries.entry(name.clone()) {
            hash_map::Entry::Occupied(mut occupied) => {
                occupied.get_mut().set_payload(composite, at);
            }
            hash_map::Entry::Vacant(vacant) => {
                vacant.insert(Entry::new(EntryKind::File, name.clone(), composite, at));
                inner.history.push_back(name.clone());
            }
        }

        match inner.entries.entry(LATEST_NAME.to_string()) {
            hash_map::Entry::Occupied(mut occupied) => {
                occupied.get_mut().set_payload(name.clone(), at);
            }
            hash_map::Entry::Vacant(vacant) => {
                vacant.insert(Entry::new(EntryKind::Symlink, LATEST_NAME, name.clone(), at));
            }
        }

        for old in inner.projected.drain(..) {
            inner.entries.remove(&old);
        }

        for (index, value) in batch.record().fields().iter().enumerate() {
            let field_name = format!(".f{}", index + 1);
            inner.insert_projected(Entry::new(EntryKind::File, field_name, value.clone(), at));
        }

        for (derived_name, value) in batch.derived {
            if derived_name == LOG_NAME || derived_name == LATEST_NAME {
                inner.log(&format!(
                    "Projection `{derived_name}` skipped: the name is reserved"
                ));
                continue;
            }

            inner.insert_projected(Entry::new(EntryKind::File, derived_name, value, at));
        }

        while inner.history.len() > self.keep {
            if let Some(oldest) = inner.history.pop_front() {
                inner.entries.remove(&oldest);
            }
        }
    }

    /// Append one line to the log entry.
    pub fn append_log(&self, message: &str) {
        self.lock().log(message);
    }

    /// Exact-name lookup.
    ///
    /// The root name maps to a synthetic directory entry whose payload
    /// lists all current names.
    pub fn get(&self, name: &str) -> Option<Entry> {
        let inner = self.lock();

        if name == ROOT_NAME || name.is_empty() {
            return Some(inner.root());
        }

        inner.entries.get(name).cloned()
    }

    /// A consistent snapshot of all current entries, sorted by name.
    ///
    /// The snapshot may be stale the moment the lock is released; each
    /// call still reflects a single instant, with no entry duplicated or
    /// half-updated.
    pub fn list(&self) -> Vec<Entry> {
        let inner = self.lock();

        let mut entries: Vec<Entry> = inner.entries.values().cloned().collect();
        entries.sort_unstable_by(|a, b| a.name.cmp(&b.name));
        entries
    }

    /// All current entry names, sorted.
    pub fn names(&self) -> Vec<String> {
        let inner = self.lock();

        let mut names: Vec<String> = inner.entries.keys().cloned().collect();
        names.sort_unstable();
        names
    }

    /// The payload bytes of `name` in `[offset, offset + length)`.
    ///
    /// Unknown names and out-of-range offsets yield empty bytes, never
    /// an error.
    pub fn read_at(&self, name: &str, offset: u64, length: u32) -> Vec<u8> {
        match self.get(name) {
            Some(entry) => entry.read_at(offset, length).to_vec(),
            None => Vec::new(),
        }
    }

    /// The name the `latest` symlink currently targets, if any reading
    /// has been published.
    pub fn latest(&self) -> Option<String> {
        let inner = self.lock();

        inner
            .entries
            .get(LATEST_NAME)
            .map(|entry| entry.payload.clone())
    }

    /// How many history readings are currently retained.
    pub fn reading_count(&self) -> usize {
        self.lock().history.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner
            .lock()
            .expect("Store lock should not be poisoned")
    }
}
