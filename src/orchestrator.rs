//! The archive stack orchestrator.
//!
//! One orchestrator drives the traversal of one root: it owns the cursor,
//! consults the multi-volume manager at end-of-archive boundaries, and
//! implements the engine step executed once per iterator increment. Faults
//! raised by nested archives are dispatched and stepped past; only
//! non-recoverable errors escape.

use crate::cursor::ArchiveStackCursor;
use crate::error::{Error, Result};
use crate::hierarchy::{merge_multi_volume_sources_ordered, PathHierarchy};
use crate::hooks;
use crate::metadata::{FileKind, MetadataMap};
use crate::options::TraverserOptions;
use crate::volume_manager::{MultiVolumeManager, PendingGroup};

/// One archive header produced by an engine step.
#[derive(Debug, Clone)]
pub(crate) struct YieldedHeader {
    pub hierarchy: PathHierarchy,
    pub name: String,
    pub size: u64,
    pub kind: FileKind,
    pub metadata: MetadataMap,
    /// `true` for the synthetic entry representing an activated
    /// multi-volume group.
    pub synthetic_group: bool,
}

pub(crate) struct ArchiveStackOrchestrator {
    cursor: ArchiveStackCursor,
    options: TraverserOptions,
}

impl ArchiveStackOrchestrator {
    pub(crate) fn new(options: TraverserOptions) -> Self {
        let mut cursor = ArchiveStackCursor::new();
        cursor.configure(&options);
        Self { cursor, options }
    }

    /// Synchronizes the cursor to a root hierarchy (depth 1).
    pub(crate) fn open_root_hierarchy(&mut self, hierarchy: &PathHierarchy) -> Result<()> {
        self.cursor.synchronize_to_hierarchy(hierarchy)
    }

    /// Synchronizes to an arbitrary hierarchy for a detached entry,
    /// capturing faults internally.
    pub(crate) fn synchronize_to_hierarchy(&mut self, hierarchy: &PathHierarchy) -> bool {
        match self.cursor.synchronize_to_hierarchy(hierarchy) {
            Ok(()) => true,
            Err(err) => {
                hooks::dispatch_fault(&err.into_fault(hierarchy.clone()));
                false
            }
        }
    }

    /// Reads from the stream backing the most recently yielded entry.
    pub(crate) fn read_head(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.cursor.read(buf)
    }

    /// Hierarchy of the stream the next [`Self::read_head`] targets.
    pub(crate) fn head_hierarchy(&self) -> PathHierarchy {
        self.cursor.head_hierarchy()
    }

    /// The engine step: executed once per iterator increment.
    ///
    /// When `descend_requested` is set, the previously yielded entry's
    /// payload is entered first; nested-archive open failures are dispatched
    /// as faults and traversal falls through to the sibling advance. At end
    /// of each archive, pending multi-volume groups of that scope activate
    /// before the stack unwinds.
    ///
    /// Returns `None` when this root is exhausted.
    pub(crate) fn advance(
        &mut self,
        descend_requested: bool,
        manager: &mut MultiVolumeManager,
    ) -> Result<Option<YieldedHeader>> {
        if descend_requested {
            if let Err(err) = self.cursor.descend() {
                if !err.is_recoverable() {
                    return Err(err);
                }
                let hierarchy = self.cursor.head_hierarchy();
                hooks::dispatch_fault(&err.into_fault(hierarchy));
            }
        }

        loop {
            if self.cursor.current_archive().is_none() {
                return Ok(None);
            }

            match self.cursor.next() {
                Ok(true) => return Ok(Some(self.yield_current())),
                Ok(false) => {
                    let scope = self
                        .cursor
                        .current_archive()
                        .map(|archive| archive.borrow().source_hierarchy())
                        .unwrap_or_default();

                    if let Some(group) = manager.pop(&scope) {
                        match self.activate_group(group) {
                            Ok(yielded) => return Ok(Some(yielded)),
                            Err(err) if err.is_recoverable() => {
                                hooks::dispatch_fault(&err.into_fault(scope));
                                continue;
                            }
                            Err(err) => return Err(err),
                        }
                    }

                    if !self.cursor.ascend() {
                        return Ok(None);
                    }
                }
                Err(err) if err.is_recoverable() => {
                    // A malformed archive mid-walk: report it, abandon this
                    // level, and resume with the enclosing archive.
                    let hierarchy = self.cursor.current_entry_hierarchy();
                    hooks::dispatch_fault(&err.into_fault(hierarchy));
                    if !self.cursor.ascend() {
                        return Ok(None);
                    }
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Synchronizes the cursor onto the aggregated stream of a pending
    /// group and yields its synthetic archive entry. Descent into the
    /// aggregate happens on the following increment, so the caller keeps
    /// per-entry control over it.
    fn activate_group(&mut self, group: PendingGroup) -> Result<YieldedHeader> {
        let merged = merge_multi_volume_sources_ordered(&group.parts, group.ordering);
        if merged.is_empty() {
            let context = group.parts.first().cloned().unwrap_or_default();
            return Err(Error::fault(
                format!(
                    "Failed to resolve multi-volume group '{}'",
                    group.base_name
                ),
                context,
            ));
        }

        self.cursor.synchronize_to_hierarchy(&merged)?;

        let name = merged
            .last()
            .map(|tail| tail.to_string())
            .unwrap_or_default();
        Ok(YieldedHeader {
            hierarchy: merged,
            name,
            size: 0,
            kind: FileKind::Regular,
            metadata: MetadataMap::new(),
            synthetic_group: true,
        })
    }

    fn yield_current(&self) -> YieldedHeader {
        let archive = self
            .cursor
            .current_archive()
            .expect("advance positioned an archive");
        let archive = archive.borrow();

        // Nodes the decoder cannot classify are files by default.
        let kind = match archive.entry_kind() {
            FileKind::Unknown => FileKind::Regular,
            kind => kind,
        };

        YieldedHeader {
            hierarchy: archive.current_hierarchy(),
            name: archive.entry_name().to_string(),
            size: archive.entry_size(),
            kind,
            metadata: archive.entry_metadata(&self.options.metadata_keys),
            synthetic_group: false,
        }
    }
}
