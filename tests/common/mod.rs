//! Shared fixture builders for the integration suites.
//!
//! Archives are built in memory with `tar::Builder` and `flate2` and
//! written into per-test temp directories, so every test sees a fresh,
//! fully known tree.

#![allow(dead_code)]

use std::io::{Cursor, Write};
use std::path::Path;

use archive_r::{Entry, PathHierarchy, Traverser, TraverserOptions};

/// One fixture archive member.
pub enum Member<'a> {
    File(&'a str, &'a [u8]),
    Dir(&'a str),
}

/// Builds an uncompressed tar archive.
pub fn tar_bytes(members: &[Member]) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    for member in members {
        match member {
            Member::File(name, data) => {
                let mut header = tar::Header::new_gnu();
                header.set_size(data.len() as u64);
                header.set_mode(0o644);
                header.set_mtime(1_700_000_000);
                header.set_cksum();
                builder
                    .append_data(&mut header, name, Cursor::new(*data))
                    .unwrap();
            }
            Member::Dir(name) => {
                let mut header = tar::Header::new_gnu();
                header.set_entry_type(tar::EntryType::Directory);
                header.set_size(0);
                header.set_mode(0o755);
                header.set_cksum();
                let name = format!("{}/", name);
                builder
                    .append_data(&mut header, name, Cursor::new(&b""[..]))
                    .unwrap();
            }
        }
    }
    builder.into_inner().unwrap()
}

/// Gzip-compresses a byte slice.
pub fn gz(data: &[u8]) -> Vec<u8> {
    let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// Builds a `.tar.gz` of file members.
pub fn targz_files(files: &[(&str, &[u8])]) -> Vec<u8> {
    let members: Vec<Member> = files
        .iter()
        .map(|&(name, data)| Member::File(name, data))
        .collect();
    gz(&tar_bytes(&members))
}

/// Writes bytes into the temp dir and returns the path as a string.
pub fn write_fixture(dir: &Path, name: &str, bytes: &[u8]) -> String {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, bytes).unwrap();
    path.to_string_lossy().into_owned()
}

/// The deeply nested fixture:
///
/// ```text
/// deeply_nested.tar.gz
/// ├── level1.tar.gz
/// │   ├── level2.tar.gz
/// │   │   ├── level3.tar.gz
/// │   │   │   └── deep.txt            "deep content"
/// │   │   ├── archive.tar.gz.part001  (first half of a split tar.gz)
/// │   │   ├── archive.tar.gz.part002  (second half)
/// │   │   └── archive.tar.gz.part003  (empty)
/// │   └── root.txt                    "inner root"
/// └── root.txt                        "top root\n"
/// ```
pub fn deeply_nested_fixture(dir: &Path) -> String {
    let split_payload = targz_files(&[
        ("file1.txt", b"content1\n"),
        ("file2.txt", b"content2\n"),
    ]);
    // Split inside the gzip header: a lone fragment can never be mistaken
    // for a complete archive, so unmarked parts stay childless.
    let (part1, part2) = split_payload.split_at(4);

    let level3 = targz_files(&[("deep.txt", b"deep content")]);
    let level2 = targz_files(&[
        ("level3.tar.gz", &level3),
        ("archive.tar.gz.part001", part1),
        ("archive.tar.gz.part002", part2),
        ("archive.tar.gz.part003", b""),
    ]);
    let level1 = targz_files(&[("level2.tar.gz", &level2), ("root.txt", b"inner root")]);
    let root = targz_files(&[("level1.tar.gz", &level1), ("root.txt", b"top root\n")]);

    write_fixture(dir, "deeply_nested.tar.gz", &root)
}

/// Observation of one yielded entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observed {
    pub path: String,
    pub depth: usize,
    pub is_dir: bool,
    pub size: u64,
}

/// Collects `(path, depth, is_dir, size)` for a whole traversal, with the
/// root path prefix replaced by the root's file name for stable assertions.
pub fn collect(root_path: &str, options: TraverserOptions) -> Vec<Observed> {
    let traverser =
        Traverser::new(vec![archive_r::make_single_path(root_path)], options).unwrap();
    let root_name = Path::new(root_path)
        .file_name()
        .unwrap()
        .to_string_lossy()
        .into_owned();
    (&traverser)
        .into_iter()
        .map(|entry| Observed {
            path: relative_path(&entry.path(), root_path, &root_name),
            depth: entry.depth(),
            is_dir: entry.is_directory(),
            size: entry.size(),
        })
        .collect()
}

/// Rewrites an absolute entry path into a fixture-relative one.
pub fn relative_path(full: &str, root_path: &str, root_name: &str) -> String {
    if full == root_path {
        return root_name.to_string();
    }
    match full.strip_prefix(&format!("{}/", root_path)) {
        Some(rest) => format!("{}/{}", root_name, rest),
        None => full.to_string(),
    }
}

/// Reads an entry to end-of-payload.
pub fn read_entry_fully(entry: &mut Entry) -> Vec<u8> {
    let mut out = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        let n = entry.read(&mut buf).unwrap();
        if n == 0 {
            break;
        }
        out.extend_from_slice(&buf[..n]);
    }
    out
}

/// Convenience: hierarchy display relative to a root path.
pub fn display_of(hierarchy: &PathHierarchy, root_path: &str, root_name: &str) -> String {
    relative_path(&hierarchy.to_string(), root_path, root_name)
}
