//! Traverser: walks roots and yields entries in pre-order.
//!
//! Each root is either a filesystem directory (walked recursively in
//! lexicographic order) or an archive candidate (a file, a multi-volume
//! group, or a composite). Archive contents are produced by an
//! [`ArchiveStackOrchestrator`] driven one engine step per iterator
//! increment; the header of a nested archive is always yielded before its
//! contents.
//!
//! # Example
//!
//! ```rust,no_run
//! use archive_r::{make_single_path, Traverser, TraverserOptions};
//!
//! fn list(path: &str) -> archive_r::Result<()> {
//!     let traverser = Traverser::new(
//!         vec![make_single_path(path)],
//!         TraverserOptions::new(),
//!     )?;
//!     for entry in &traverser {
//!         println!("{} ({} bytes)", entry.path(), entry.size());
//!     }
//!     Ok(())
//! }
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use walkdir::WalkDir;

use crate::entry::{Entry, LiveLink};
use crate::error::{EntryFault, Error, Result};
use crate::hierarchy::{
    make_single_path, merge_multi_volume_sources_ordered, PathHierarchy,
};
use crate::hooks;
use crate::metadata::{collect_root_metadata, FileKind, MetadataMap};
use crate::options::TraverserOptions;
use crate::orchestrator::{ArchiveStackOrchestrator, YieldedHeader};
use crate::volume_manager::MultiVolumeManager;

/// State shared between one iterator and the entries it yields.
pub(crate) struct TraversalCore {
    pub(crate) manager: MultiVolumeManager,
    pub(crate) orchestrator: Option<ArchiveStackOrchestrator>,
    /// Bumped at every increment; entries carry the generation they were
    /// yielded under and count as live only while it matches.
    pub(crate) generation: u64,
    /// Descent override registered by the live entry for the next advance.
    pub(crate) pending_descent: Option<bool>,
}

/// Iterator-based traversal of archives and directories.
///
/// Traverser instances are not thread-safe; create one per thread.
#[derive(Debug)]
pub struct Traverser {
    roots: Vec<PathHierarchy>,
    options: TraverserOptions,
}

impl Traverser {
    /// Creates a traverser over one or more root hierarchies.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] when the root list is empty or
    /// any root hierarchy is empty.
    pub fn new(roots: Vec<PathHierarchy>, options: TraverserOptions) -> Result<Self> {
        if roots.is_empty() {
            return Err(Error::InvalidArgument(
                "traverser requires at least one root".into(),
            ));
        }
        if roots.iter().any(PathHierarchy::is_empty) {
            return Err(Error::InvalidArgument(
                "root hierarchies cannot be empty".into(),
            ));
        }
        Ok(Self { roots, options })
    }

    /// Starts a traversal. Each call walks the roots from the beginning.
    pub fn entries(&self) -> Entries {
        Entries {
            roots: self.roots.clone(),
            options: self.options.clone(),
            core: Rc::new(RefCell::new(TraversalCore {
                manager: MultiVolumeManager::new(),
                orchestrator: None,
                generation: 0,
                pending_descent: None,
            })),
            state: WalkState::Roots,
            next_root: 0,
            prev: None,
        }
    }
}

impl<'a> IntoIterator for &'a Traverser {
    type Item = Entry;
    type IntoIter = Entries;

    fn into_iter(self) -> Entries {
        self.entries()
    }
}

struct PrevYield {
    hierarchy: PathHierarchy,
    kind: FileKind,
    default_descend: bool,
    from_directory_walk: bool,
}

enum WalkState {
    /// Pick the next root.
    Roots,
    /// Walking a directory root.
    Directory(walkdir::IntoIter),
    /// An orchestrator in the core is producing archive entries; after it
    /// finishes, either resume the suspended directory walk or move to the
    /// next root.
    Archive { resume: Option<walkdir::IntoIter> },
    /// All roots done; service root-level multi-volume groups.
    RootGroups,
    Done,
}

/// The entry iterator of a [`Traverser`].
///
/// Faults never abort iteration: they are dispatched to the registered
/// fault callback and the traversal continues with the next sibling or the
/// next root.
pub struct Entries {
    roots: Vec<PathHierarchy>,
    options: TraverserOptions,
    core: Rc<RefCell<TraversalCore>>,
    state: WalkState,
    next_root: usize,
    prev: Option<PrevYield>,
}

impl Entries {
    fn make_entry(
        &mut self,
        hierarchy: PathHierarchy,
        size: u64,
        kind: FileKind,
        metadata: MetadataMap,
        from_directory_walk: bool,
    ) -> Entry {
        let generation = self.core.borrow().generation;
        self.prev = Some(PrevYield {
            hierarchy: hierarchy.clone(),
            kind,
            default_descend: self.options.descend_archives,
            from_directory_walk,
        });
        Entry::managed(
            hierarchy,
            size,
            kind,
            metadata,
            self.options.clone(),
            LiveLink {
                core: Rc::downgrade(&self.core),
                generation,
            },
        )
    }

    fn entry_from_header(&mut self, header: YieldedHeader) -> Entry {
        self.make_entry(
            header.hierarchy,
            header.size,
            header.kind,
            header.metadata,
            false,
        )
    }

    /// Suspends the directory walk and opens `hierarchy` as an archive
    /// root. On failure the walk resumes in place.
    fn start_file_archive(&mut self, hierarchy: &PathHierarchy) -> bool {
        let WalkState::Directory(walker) =
            std::mem::replace(&mut self.state, WalkState::Done)
        else {
            unreachable!("file archives start only from a directory walk");
        };

        let mut orchestrator = ArchiveStackOrchestrator::new(self.options.clone());
        match orchestrator.open_root_hierarchy(hierarchy) {
            Ok(()) => {
                self.core.borrow_mut().orchestrator = Some(orchestrator);
                self.state = WalkState::Archive {
                    resume: Some(walker),
                };
                true
            }
            Err(err) => {
                hooks::dispatch_fault(&err.into_fault(hierarchy.clone()));
                self.state = WalkState::Directory(walker);
                false
            }
        }
    }

    /// Applies the previous entry's descent intent. Returns the descent
    /// flag to feed into the orchestrator's next engine step.
    fn resolve_previous_intent(&mut self) -> bool {
        let Some(prev) = self.prev.take() else {
            return false;
        };
        let pending = self.core.borrow_mut().pending_descent.take();
        let descend = pending.unwrap_or(prev.default_descend);

        if prev.from_directory_walk {
            match prev.kind {
                FileKind::Directory => {
                    if !descend {
                        if let WalkState::Directory(walker) = &mut self.state {
                            walker.skip_current_dir();
                        }
                    }
                }
                FileKind::Regular => {
                    if descend && self.start_file_archive(&prev.hierarchy) {
                        return true;
                    }
                }
                // Symlinks and special nodes are never descended into.
                _ => {}
            }
            false
        } else {
            descend && matches!(prev.kind, FileKind::Regular)
        }
    }

    /// Runs one engine step of the active orchestrator.
    fn advance_archive(&mut self, descend: bool) -> Result<Option<YieldedHeader>> {
        let core = &mut *self.core.borrow_mut();
        let TraversalCore {
            manager,
            orchestrator,
            ..
        } = core;
        match orchestrator.as_mut() {
            Some(orchestrator) => orchestrator.advance(descend, manager),
            None => Ok(None),
        }
    }

    fn begin_root(&mut self, root: PathHierarchy) -> Option<Entry> {
        // Directory roots walk the filesystem.
        if let Some(path) = root.first().and_then(|entry| entry.as_single()) {
            if std::fs::metadata(path).map(|meta| meta.is_dir()).unwrap_or(false) {
                let walker = WalkDir::new(path)
                    .follow_links(false)
                    .sort_by_file_name()
                    .into_iter();
                self.state = WalkState::Directory(walker);
                return None;
            }
        }

        // Everything else is an archive candidate: yield the root itself,
        // then (descent permitting) its contents.
        let info = collect_root_metadata(&root, &self.options.metadata_keys);
        let kind = match info.kind {
            FileKind::Directory => FileKind::Directory,
            FileKind::Symlink => FileKind::Symlink,
            // Multi-volume and composite roots observe as files.
            _ => FileKind::Regular,
        };

        let mut orchestrator = ArchiveStackOrchestrator::new(self.options.clone());
        if let Err(err) = orchestrator.open_root_hierarchy(&root) {
            hooks::dispatch_fault(&err.into_fault(root.clone()));
            self.state = WalkState::Roots;
            return None;
        }
        self.core.borrow_mut().orchestrator = Some(orchestrator);
        self.state = WalkState::Archive { resume: None };
        Some(self.make_entry(root, info.size, kind, info.metadata, false))
    }

    fn finish_archive(&mut self, resume: Option<walkdir::IntoIter>) {
        self.core.borrow_mut().orchestrator = None;
        self.state = match resume {
            Some(walker) => WalkState::Directory(walker),
            None => WalkState::Roots,
        };
    }

    fn next_directory_entry(
        &mut self,
        mut walker: walkdir::IntoIter,
    ) -> Option<Entry> {
        loop {
            match walker.next() {
                Some(Ok(dir_entry)) => {
                    let hierarchy =
                        make_single_path(dir_entry.path().to_string_lossy());
                    let file_type = dir_entry.file_type();
                    let kind = if file_type.is_dir() {
                        FileKind::Directory
                    } else if file_type.is_symlink() {
                        FileKind::Symlink
                    } else if file_type.is_file() {
                        FileKind::Regular
                    } else {
                        FileKind::Other
                    };
                    let info =
                        collect_root_metadata(&hierarchy, &self.options.metadata_keys);
                    self.state = WalkState::Directory(walker);
                    return Some(self.make_entry(
                        hierarchy,
                        info.size,
                        kind,
                        info.metadata,
                        true,
                    ));
                }
                Some(Err(err)) => {
                    // An unreadable sibling: report and keep walking.
                    let hierarchy = err
                        .path()
                        .map(|p| make_single_path(p.to_string_lossy()))
                        .unwrap_or_default();
                    let errno = err
                        .io_error()
                        .and_then(|io| io.raw_os_error())
                        .unwrap_or(0);
                    hooks::dispatch_fault(&EntryFault::with_errno(
                        format!("Failed to read directory entry: {}", err),
                        errno,
                        hierarchy,
                    ));
                }
                None => {
                    self.state = WalkState::Roots;
                    return None;
                }
            }
        }
    }

    /// Activates the next root-level multi-volume group, yielding its
    /// synthetic aggregate entry.
    fn next_root_group(&mut self) -> Option<Entry> {
        loop {
            let group = self.core.borrow_mut().manager.pop(&PathHierarchy::new())?;

            let merged = merge_multi_volume_sources_ordered(&group.parts, group.ordering);
            if merged.is_empty() {
                let context = group.parts.first().cloned().unwrap_or_default();
                hooks::dispatch_fault(&EntryFault::new(
                    format!(
                        "Failed to resolve multi-volume group '{}'",
                        group.base_name
                    ),
                    context,
                ));
                continue;
            }

            let mut orchestrator = ArchiveStackOrchestrator::new(self.options.clone());
            if let Err(err) = orchestrator.open_root_hierarchy(&merged) {
                hooks::dispatch_fault(&err.into_fault(merged.clone()));
                continue;
            }
            self.core.borrow_mut().orchestrator = Some(orchestrator);
            self.state = WalkState::Archive { resume: None };
            return Some(self.make_entry(
                merged,
                0,
                FileKind::Regular,
                MetadataMap::new(),
                false,
            ));
        }
    }
}

impl Iterator for Entries {
    type Item = Entry;

    fn next(&mut self) -> Option<Entry> {
        let mut archive_descend = self.resolve_previous_intent();
        self.core.borrow_mut().generation += 1;

        loop {
            match std::mem::replace(&mut self.state, WalkState::Done) {
                WalkState::Roots => {
                    if self.next_root >= self.roots.len() {
                        self.state = WalkState::RootGroups;
                        continue;
                    }
                    let root = self.roots[self.next_root].clone();
                    self.next_root += 1;
                    self.state = WalkState::Roots;
                    match self.begin_root(root) {
                        Some(entry) => return Some(entry),
                        None => continue,
                    }
                }
                WalkState::Directory(walker) => {
                    match self.next_directory_entry(walker) {
                        Some(entry) => return Some(entry),
                        None => continue,
                    }
                }
                WalkState::Archive { resume } => {
                    let step = self.advance_archive(archive_descend);
                    archive_descend = false;
                    match step {
                        Ok(Some(header)) => {
                            self.state = WalkState::Archive { resume };
                            return Some(self.entry_from_header(header));
                        }
                        Ok(None) => {
                            self.finish_archive(resume);
                        }
                        Err(err) => {
                            // Unrecoverable for this root; report it and
                            // continue with whatever comes next.
                            let hierarchy = self
                                .core
                                .borrow()
                                .orchestrator
                                .as_ref()
                                .map(ArchiveStackOrchestrator::head_hierarchy)
                                .unwrap_or_default();
                            hooks::dispatch_fault(&err.into_fault(hierarchy));
                            self.finish_archive(resume);
                        }
                    }
                }
                WalkState::RootGroups => {
                    self.state = WalkState::RootGroups;
                    match self.next_root_group() {
                        Some(entry) => return Some(entry),
                        None => {
                            self.state = WalkState::Done;
                            return None;
                        }
                    }
                }
                WalkState::Done => return None,
            }
        }
    }
}
