//! Root-stream factory integration tests.
//!
//! The factory slot is process-wide; tests here serialize on one guard.

mod common;

use common::*;

use std::sync::{Arc, Mutex};

use archive_r::{
    make_single_path, register_root_stream_factory, DataStream, PathHierarchy, Result,
    Traverser, TraverserOptions,
};

static SLOT_GUARD: Mutex<()> = Mutex::new(());

/// An in-memory stream usable as a virtual root.
struct MemoryStream {
    hierarchy: PathHierarchy,
    data: Arc<Vec<u8>>,
    pos: usize,
    ended: bool,
}

impl DataStream for MemoryStream {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let n = (self.data.len() - self.pos).min(buf.len());
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        if n == 0 {
            self.ended = true;
        }
        Ok(n)
    }

    fn rewind(&mut self) -> Result<()> {
        self.pos = 0;
        self.ended = false;
        Ok(())
    }

    fn at_end(&self) -> bool {
        self.ended
    }

    fn source_hierarchy(&self) -> PathHierarchy {
        self.hierarchy.clone()
    }
}

#[test]
fn test_factory_serves_virtual_roots() {
    let _guard = SLOT_GUARD.lock().unwrap_or_else(|p| p.into_inner());

    let archive = Arc::new(targz_files(&[
        ("virtual/one.txt", b"from memory"),
        ("virtual/two.txt", b"also memory"),
    ]));
    let served = archive.clone();
    register_root_stream_factory(Some(Arc::new(move |hierarchy: &PathHierarchy| {
        let is_virtual = hierarchy
            .first()
            .and_then(|entry| entry.as_single())
            .is_some_and(|path| path == "virtual.tar.gz");
        is_virtual.then(|| {
            Box::new(MemoryStream {
                hierarchy: hierarchy.clone(),
                data: served.clone(),
                pos: 0,
                ended: false,
            }) as Box<dyn DataStream>
        })
    })));

    let traverser = Traverser::new(
        vec![make_single_path("virtual.tar.gz")],
        TraverserOptions::new(),
    )
    .unwrap();

    let mut contents = Vec::new();
    let mut paths = Vec::new();
    for mut entry in &traverser {
        paths.push(entry.path());
        if entry.depth() == 1 {
            contents.push(read_entry_fully(&mut entry));
        }
    }
    register_root_stream_factory(None);

    assert_eq!(
        paths,
        vec![
            "virtual.tar.gz",
            "virtual.tar.gz/virtual/one.txt",
            "virtual.tar.gz/virtual/two.txt",
        ]
    );
    assert_eq!(contents, vec![b"from memory".to_vec(), b"also memory".to_vec()]);
}

#[test]
fn test_factory_none_falls_back_to_filesystem() {
    let _guard = SLOT_GUARD.lock().unwrap_or_else(|p| p.into_inner());

    register_root_stream_factory(Some(Arc::new(|_: &PathHierarchy| None)));

    let dir = tempfile::TempDir::new().unwrap();
    let root = write_fixture(
        dir.path(),
        "fallback.tar.gz",
        &targz_files(&[("disk.txt", b"from disk")]),
    );

    let traverser =
        Traverser::new(vec![make_single_path(&root)], TraverserOptions::new()).unwrap();
    let names: Vec<_> = (&traverser).into_iter().map(|e| e.name()).collect();
    register_root_stream_factory(None);

    assert_eq!(names[1], "disk.txt");
}
