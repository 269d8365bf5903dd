//! Nested-archive traversal integration tests.

mod common;

use common::*;

use archive_r::{make_single_path, Traverser, TraverserOptions};

fn expected_deeply_nested(root_size: u64) -> Vec<Observed> {
    let observed = |path: &str, depth: usize, size: u64| Observed {
        path: path.to_string(),
        depth,
        is_dir: false,
        size,
    };
    let part2_size = {
        let payload = targz_files(&[
            ("file1.txt", b"content1\n"),
            ("file2.txt", b"content2\n"),
        ]);
        (payload.len() - 4) as u64
    };
    vec![
        observed("deeply_nested.tar.gz", 0, root_size),
        observed("deeply_nested.tar.gz/level1.tar.gz", 1, level1_size()),
        observed(
            "deeply_nested.tar.gz/level1.tar.gz/level2.tar.gz",
            2,
            level2_size(),
        ),
        observed(
            "deeply_nested.tar.gz/level1.tar.gz/level2.tar.gz/level3.tar.gz",
            3,
            level3_size(),
        ),
        observed(
            "deeply_nested.tar.gz/level1.tar.gz/level2.tar.gz/level3.tar.gz/deep.txt",
            4,
            12,
        ),
        observed(
            "deeply_nested.tar.gz/level1.tar.gz/level2.tar.gz/archive.tar.gz.part001",
            3,
            4,
        ),
        observed(
            "deeply_nested.tar.gz/level1.tar.gz/level2.tar.gz/archive.tar.gz.part002",
            3,
            part2_size,
        ),
        observed(
            "deeply_nested.tar.gz/level1.tar.gz/level2.tar.gz/archive.tar.gz.part003",
            3,
            0,
        ),
        observed("deeply_nested.tar.gz/level1.tar.gz/root.txt", 2, 10),
        observed("deeply_nested.tar.gz/root.txt", 1, 9),
    ]
}

fn level3_size() -> u64 {
    targz_files(&[("deep.txt", b"deep content")]).len() as u64
}

fn level2_size() -> u64 {
    let payload = targz_files(&[
        ("file1.txt", b"content1\n"),
        ("file2.txt", b"content2\n"),
    ]);
    let (part1, part2) = payload.split_at(4);
    let level3 = targz_files(&[("deep.txt", b"deep content")]);
    targz_files(&[
        ("level3.tar.gz", &level3),
        ("archive.tar.gz.part001", part1),
        ("archive.tar.gz.part002", part2),
        ("archive.tar.gz.part003", b""),
    ])
    .len() as u64
}

fn level1_size() -> u64 {
    let payload = targz_files(&[
        ("file1.txt", b"content1\n"),
        ("file2.txt", b"content2\n"),
    ]);
    let (part1, part2) = payload.split_at(4);
    let level3 = targz_files(&[("deep.txt", b"deep content")]);
    let level2 = targz_files(&[
        ("level3.tar.gz", &level3),
        ("archive.tar.gz.part001", part1),
        ("archive.tar.gz.part002", part2),
        ("archive.tar.gz.part003", b""),
    ]);
    targz_files(&[("level2.tar.gz", &level2), ("root.txt", b"inner root")]).len() as u64
}

#[test]
fn test_deeply_nested_preorder() {
    let dir = tempfile::TempDir::new().unwrap();
    let root = deeply_nested_fixture(dir.path());
    let root_size = std::fs::metadata(&root).unwrap().len();

    let observed = collect(&root, TraverserOptions::new());
    assert_eq!(observed, expected_deeply_nested(root_size));
}

#[test]
fn test_depth_equals_hierarchy_length_minus_one() {
    let dir = tempfile::TempDir::new().unwrap();
    let root = deeply_nested_fixture(dir.path());

    let traverser =
        Traverser::new(vec![make_single_path(&root)], TraverserOptions::new()).unwrap();
    for entry in &traverser {
        assert_eq!(entry.depth(), entry.path_hierarchy().len() - 1);
    }
}

#[test]
fn test_traversal_is_deterministic() {
    let dir = tempfile::TempDir::new().unwrap();
    let root = deeply_nested_fixture(dir.path());

    let first = collect(&root, TraverserOptions::new());
    let second = collect(&root, TraverserOptions::new());
    assert_eq!(first, second);
}

#[test]
fn test_nested_archive_precedes_its_contents() {
    let dir = tempfile::TempDir::new().unwrap();
    let root = deeply_nested_fixture(dir.path());

    let traverser =
        Traverser::new(vec![make_single_path(&root)], TraverserOptions::new()).unwrap();
    let hierarchies: Vec<_> = (&traverser)
        .into_iter()
        .map(|e| e.path_hierarchy().clone())
        .collect();

    // Every archive that was descended into is immediately followed by an
    // entry it prefixes.
    for pair in hierarchies.windows(2) {
        let (parent, child) = (&pair[0], &pair[1]);
        if child.len() > parent.len() {
            assert_eq!(child.prefix_until(parent.len() - 1), *parent);
        }
    }
}

#[test]
fn test_multiple_roots_traverse_in_order() {
    let dir = tempfile::TempDir::new().unwrap();
    let first = write_fixture(
        dir.path(),
        "first.tar.gz",
        &targz_files(&[("a.txt", b"aa")]),
    );
    let second = write_fixture(
        dir.path(),
        "second.tar.gz",
        &targz_files(&[("b.txt", b"bbb")]),
    );

    let traverser = Traverser::new(
        vec![make_single_path(&first), make_single_path(&second)],
        TraverserOptions::new(),
    )
    .unwrap();
    let paths: Vec<_> = (&traverser).into_iter().map(|e| e.path()).collect();

    assert_eq!(
        paths,
        vec![
            first.clone(),
            format!("{}/a.txt", first),
            second.clone(),
            format!("{}/b.txt", second),
        ]
    );
}

#[test]
fn test_entry_name_and_path_forms() {
    let dir = tempfile::TempDir::new().unwrap();
    let root = write_fixture(
        dir.path(),
        "names.tar.gz",
        &targz_files(&[("dir/inner.txt", b"x")]),
    );

    let traverser =
        Traverser::new(vec![make_single_path(&root)], TraverserOptions::new()).unwrap();
    let entries: Vec<_> = (&traverser).into_iter().collect();

    assert_eq!(entries[1].name(), "dir/inner.txt");
    assert_eq!(entries[1].path(), format!("{}/dir/inner.txt", root));
    assert!(entries[1].is_file());
}

#[test]
fn test_metadata_capture_respects_allow_list() {
    let dir = tempfile::TempDir::new().unwrap();
    let root = write_fixture(
        dir.path(),
        "meta.tar.gz",
        &targz_files(&[("data.bin", b"0123")]),
    );

    let options = TraverserOptions::new()
        .metadata_key("pathname")
        .metadata_key("size");
    let traverser = Traverser::new(vec![make_single_path(&root)], options).unwrap();
    let entries: Vec<_> = (&traverser).into_iter().collect();

    let inner = &entries[1];
    assert_eq!(inner.metadata()["pathname"].as_str(), Some("data.bin"));
    assert_eq!(inner.metadata()["size"].as_u64(), Some(4));
    assert!(!inner.metadata().contains_key("mode"));

    // Without an allow-list nothing is captured.
    let bare = Traverser::new(
        vec![make_single_path(&root)],
        TraverserOptions::new(),
    )
    .unwrap();
    for entry in &bare {
        assert!(entry.metadata().is_empty());
    }
}
