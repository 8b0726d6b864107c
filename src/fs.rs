//! Projects store entries as file metadata and contents.
//!
//! This is the surface an external mount transport dispatches its
//! `getattr`/`readdir`/`read`/`readlink` calls to. Lookups that miss
//! report [`Error::NoSuchEntry`]; `read` is deliberately total and
//! answers unknown paths with empty bytes, so transient races with the
//! acquisition side never surface as read errors.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::{
    error::Error,
    store::{Entry, EntryKind, Store},
};

const DIR_MODE: u32 = 0o755;
const FILE_MODE: u32 = 0o644;
const LINK_MODE: u32 = 0o644;

/// Metadata for one published entry, in the shape a mount transport
/// wants to fill stat structures from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileAttr {
    /// Directory, file or symlink.
    pub kind: EntryKind,

    /// Byte length of the payload.
    pub size: u64,

    /// Permission bits; everything published is world-readable and
    /// owner-writable in name only (there is no write path).
    pub mode: u32,

    /// Link count, always 1.
    pub nlink: u32,

    /// Owner, the running process's user.
    pub uid: u32,

    /// Owner, the running process's group.
    pub gid: u32,

    /// Creation time.
    pub created_at: DateTime<Utc>,

    /// Last payload change.
    pub modified_at: DateTime<Utc>,

    /// Last access.
    pub accessed_at: DateTime<Utc>,
}

impl FileAttr {
    fn from_entry(entry: &Entry) -> Self {
        let mode = match entry.kind() {
            EntryKind::Directory => DIR_MODE,
            EntryKind::File => FILE_MODE,
            EntryKind::Symlink => LINK_MODE,
        };

        Self {
            kind: entry.kind(),
            size: entry.payload().len() as u64,
            mode,
            nlink: 1,
            uid: process_uid(),
            gid: process_gid(),
            created_at: entry.created_at(),
            modified_at: entry.modified_at(),
            accessed_at: entry.accessed_at(),
        }
    }
}

#[cfg(unix)]
fn process_uid() -> u32 {
    nix::unistd::getuid().as_raw()
}

#[cfg(unix)]
fn process_gid() -> u32 {
    nix::unistd::getgid().as_raw()
}

#[cfg(not(unix))]
fn process_uid() -> u32 {
    0
}

#[cfg(not(unix))]
fn process_gid() -> u32 {
    0
}

/// Read-only filesystem view over a [`Store`].
#[derive(Debug, Clone)]
pub struct Filesystem {
    store: Arc<Store>,
}

impl Filesystem {
    /// A view over the given store.
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    /// Metadata for `path`.
    pub fn getattr(&self, path: &str) -> Result<FileAttr, Error> {
        match self.store.get(normalize(path)) {
            Some(entry) => Ok(FileAttr::from_entry(&entry)),
            None => Err(Error::NoSuchEntry(path.to_string())),
        }
    }

    /// Every current entry name. Only the root is a directory;
    /// the namespace is flat.
    pub fn readdir(&self, path: &str) -> Result<Vec<String>, Error> {
        if !normalize(path).is_empty() {
            return Err(Error::NoSuchEntry(path.to_string()));
        }

        Ok(self.store.names())
    }

    /// Up to `length` payload bytes starting at `offset`.
    ///
    /// Unknown paths and out-of-range offsets yield empty bytes,
    /// never an error.
    pub fn read(&self, path: &str, length: u32, offset: u64) -> Vec<u8> {
        self.store.read_at(normalize(path), offset, length)
    }

    /// The target of the symlink at `path`.
    pub fn readlink(&self, path: &str) -> Result<String, Error> {
        match self.store.get(normalize(path)) {
            Some(entry) if entry.kind() == EntryKind::Symlink => Ok(entry.payload().to_string()),
            _ => Err(Error::NoSuchEntry(path.to_string())),
        }
    }
}

fn normalize(path: &str) -> &str {
    path.strip_prefix('/').unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::record::Record;
    use crate::store::Batch;

    fn published() -> Filesystem {
        let store = Arc::new(Store::new(10));

        let at = Utc.timestamp_opt(1_651_246_965, 0).unwrap();
        let record = Record::parse("12.5;98.3;1", at).unwrap();
        store.publish(Batch::new(record));

        Filesystem::new(store)
    }

    #[test]
    fn root_is_a_directory() {
        let fs = published();

        let attr = fs.getattr("/").unwrap();
        assert_eq!(attr.kind, EntryKind::Directory);
        assert_eq!(attr.mode, 0o755);
        assert_eq!(attr.nlink, 1);
    }

    #[test]
    fn reading_attrs_copy_entry_times() {
        let fs = published();

        let attr = fs.getattr("/1651246965").unwrap();
        assert_eq!(attr.kind, EntryKind::File);
        assert_eq!(attr.mode, 0o644);
        assert_eq!(
            attr.modified_at,
            Utc.timestamp_opt(1_651_246_965, 0).unwrap()
        );
        // "1651246965;12.5;98.3;1"
        assert_eq!(attr.size, 22);
    }

    #[test]
    fn unknown_path_has_no_attrs() {
        let fs = published();

        let err = fs.getattr("/nope").unwrap_err();
        assert_eq!(err, Error::NoSuchEntry("/nope".into()));
    }

    #[test]
    fn readdir_is_root_only() {
        let fs = published();

        let names = fs.readdir("/").unwrap();
        assert_eq!(names, [".f1", ".f2", ".f3", "1651246965", "latest", "log"]);

        assert!(fs.readdir("/log").is_err());
    }

    #[test]
    fn read_is_total() {
        let fs = published();

        assert_eq!(fs.read("/.f2", 1024, 0), b"98.3");
        assert_eq!(fs.read("/.f2", 1024, 2), b".3");
        assert_eq!(fs.read("/.f2", 1024, 1024), b"");
        assert_eq!(fs.read("/no-such-entry", 1024, 0), b"");
    }

    #[test]
    fn readlink_follows_latest() {
        let fs = published();

        assert_eq!(fs.readlink("/latest").unwrap(), "1651246965");

        // Regular files are not links.
        assert!(fs.readlink("/log").is_err());
    }

    #[test]
    fn readlink_before_any_reading_is_a_miss() {
        let fs = Filesystem::new(Arc::new(Store::new(10)));

        assert!(fs.readlink("/latest").is_err());
    }
}
