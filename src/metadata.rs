//! Entry metadata values and the filesystem metadata collector.
//!
//! Metadata capture is allow-list driven: the caller names the keys it wants
//! in [`TraverserOptions::metadata_keys`](crate::TraverserOptions) and every
//! producer (archive decoders, the filesystem collector) fills in only those
//! keys it can serve. An empty allow-list captures nothing.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use crate::hierarchy::PathHierarchy;

/// File type of a traversal entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FileKind {
    /// A regular file.
    Regular,
    /// A directory.
    Directory,
    /// A symbolic link.
    Symlink,
    /// A node with a known but uncommon type (fifo, device, ...).
    Other,
    /// The type could not be determined.
    #[default]
    Unknown,
}

impl FileKind {
    /// Classic `S_IFMT`-style mode bits for this kind, 0 when unknown.
    pub fn mode_bits(self) -> u64 {
        match self {
            FileKind::Regular => 0o100000,
            FileKind::Directory => 0o040000,
            FileKind::Symlink => 0o120000,
            FileKind::Other | FileKind::Unknown => 0,
        }
    }

    pub fn is_file(self) -> bool {
        matches!(self, FileKind::Regular)
    }

    pub fn is_directory(self) -> bool {
        matches!(self, FileKind::Directory)
    }
}

/// An extended attribute record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Xattr {
    pub name: String,
    pub value: Vec<u8>,
}

/// A sparse-file region record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SparseRegion {
    pub offset: u64,
    pub length: u64,
}

/// A content-digest record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Digest {
    pub algorithm: String,
    pub value: Vec<u8>,
}

/// One metadata value.
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataValue {
    None,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Str(String),
    Bytes(Vec<u8>),
    Time { seconds: i64, nanoseconds: i64 },
    Device { major: u64, minor: u64 },
    FileFlags { set: u64, clear: u64 },
    Xattrs(Vec<Xattr>),
    Sparse(Vec<SparseRegion>),
    Digests(Vec<Digest>),
}

impl MetadataValue {
    /// Returns the string payload, if this value holds one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetadataValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the unsigned payload, widening signed values when possible.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            MetadataValue::UInt(v) => Some(*v),
            MetadataValue::Int(v) => u64::try_from(*v).ok(),
            _ => None,
        }
    }
}

/// Metadata captured for one entry, keyed by the allow-listed key names.
pub type MetadataMap = BTreeMap<String, MetadataValue>;

/// Metadata collected for a root filesystem path.
#[derive(Debug, Clone, Default)]
pub struct RootMetadata {
    /// File size in bytes; 0 for non-regular nodes.
    pub size: u64,
    /// Node type as reported by the filesystem.
    pub kind: FileKind,
    /// Allow-listed metadata values.
    pub metadata: MetadataMap,
}

/// Collects filesystem metadata for the root path of a traversal.
///
/// Only hierarchies whose root component is a single path are inspected.
/// Filesystem errors yield an empty result without faulting; the traversal
/// will surface any real problem when the stream is opened.
pub fn collect_root_metadata(
    hierarchy: &PathHierarchy,
    allowed_keys: &BTreeSet<String>,
) -> RootMetadata {
    let mut info = RootMetadata::default();

    let Some(root) = hierarchy.first().and_then(|entry| entry.as_single()) else {
        return info;
    };

    let path = Path::new(root);
    let Ok(symlink_meta) = fs::symlink_metadata(path) else {
        return info;
    };

    // Follow the link for size/kind when the target resolves; keep the
    // symlink type when it does not.
    let file_type = symlink_meta.file_type();
    if file_type.is_symlink() {
        info.kind = FileKind::Symlink;
    } else if file_type.is_dir() {
        info.kind = FileKind::Directory;
    } else if file_type.is_file() {
        info.kind = FileKind::Regular;
        info.size = symlink_meta.len();
    } else {
        info.kind = FileKind::Other;
    }

    if allowed_keys.is_empty() {
        return info;
    }

    let wants = |key: &str| allowed_keys.contains(key);

    if wants("pathname") {
        let tail = hierarchy.last().expect("nonempty hierarchy has a tail");
        let pathname = tail
            .as_single()
            .map(str::to_string)
            .unwrap_or_else(|| tail.to_string());
        info.metadata
            .insert("pathname".into(), MetadataValue::Str(pathname));
    }

    if wants("filetype") {
        info.metadata
            .insert("filetype".into(), MetadataValue::UInt(info.kind.mode_bits()));
    }

    if wants("size") {
        info.metadata
            .insert("size".into(), MetadataValue::UInt(symlink_meta.len()));
    }

    if wants("mtime") {
        if let Ok(mtime) = symlink_meta.modified() {
            let (seconds, nanoseconds) =
                match mtime.duration_since(std::time::SystemTime::UNIX_EPOCH) {
                    Ok(d) => (d.as_secs() as i64, d.subsec_nanos() as i64),
                    Err(e) => (-(e.duration().as_secs() as i64), 0),
                };
            info.metadata.insert(
                "mtime".into(),
                MetadataValue::Time {
                    seconds,
                    nanoseconds,
                },
            );
        }
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::MetadataExt;

        if wants("mode") {
            info.metadata.insert(
                "mode".into(),
                MetadataValue::UInt(u64::from(symlink_meta.mode()) & 0o7777),
            );
        }
        if wants("uid") {
            info.metadata
                .insert("uid".into(), MetadataValue::Int(i64::from(symlink_meta.uid())));
        }
        if wants("gid") {
            info.metadata
                .insert("gid".into(), MetadataValue::Int(i64::from(symlink_meta.gid())));
        }
        // uname/gname are not resolved from the user database; only the
        // numeric IDs are captured for filesystem nodes. Archive headers
        // carry their own name strings.
    }

    info
}
