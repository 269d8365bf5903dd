//! The user-facing entry handle.
//!
//! Entries come in two states. A *live* entry is the one most recently
//! yielded by an iterator: its payload reads go straight through the
//! traversal's open decoder stack, and it can register descent and
//! multi-volume intents for the next advance. Once the iterator moves on
//! (or the entry is cloned), the handle is *detached*: it keeps its
//! hierarchy and an options snapshot, and `read` transparently reopens the
//! whole archive chain, which makes detached entries repeatable readers
//! long after the producing traversal has finished.

use std::cell::RefCell;
use std::rc::Weak;

use crate::error::{Error, Result};
use crate::hierarchy::{PartOrdering, PathHierarchy};
use crate::hooks;
use crate::metadata::{FileKind, MetadataMap};
use crate::options::TraverserOptions;
use crate::orchestrator::ArchiveStackOrchestrator;
use crate::traverser::TraversalCore;

pub(crate) struct LiveLink {
    pub(crate) core: Weak<RefCell<TraversalCore>>,
    pub(crate) generation: u64,
}

/// One addressable item inside a traversal: a filesystem node or an archive
/// header.
pub struct Entry {
    hierarchy: PathHierarchy,
    size: u64,
    kind: FileKind,
    metadata: MetadataMap,
    descent_enabled: bool,
    options: TraverserOptions,
    live: Option<LiveLink>,
    reader: Option<Box<ArchiveStackOrchestrator>>,
}

impl Entry {
    pub(crate) fn managed(
        hierarchy: PathHierarchy,
        size: u64,
        kind: FileKind,
        metadata: MetadataMap,
        options: TraverserOptions,
        live: LiveLink,
    ) -> Self {
        let descent_enabled = options.descend_archives;
        Self {
            hierarchy,
            size,
            kind,
            metadata,
            descent_enabled,
            options,
            live: Some(live),
            reader: None,
        }
    }

    /// Full path: the hierarchy's display form.
    pub fn path(&self) -> String {
        self.hierarchy.to_string()
    }

    /// The entry's hierarchy.
    pub fn path_hierarchy(&self) -> &PathHierarchy {
        &self.hierarchy
    }

    /// Display form of the tail component.
    pub fn name(&self) -> String {
        self.hierarchy
            .last()
            .map(|tail| tail.to_string())
            .unwrap_or_default()
    }

    /// Payload size in bytes as reported by the producer.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Nesting depth: hierarchy length minus one.
    pub fn depth(&self) -> usize {
        self.hierarchy.len().saturating_sub(1)
    }

    pub fn file_kind(&self) -> FileKind {
        self.kind
    }

    pub fn is_file(&self) -> bool {
        self.kind.is_file()
    }

    pub fn is_directory(&self) -> bool {
        self.kind.is_directory()
    }

    /// Whether the traversal will descend into this entry at the next
    /// advance.
    pub fn descent_enabled(&self) -> bool {
        self.descent_enabled
    }

    /// Metadata captured under the caller's allow-list.
    pub fn metadata(&self) -> &MetadataMap {
        &self.metadata
    }

    fn with_live_core<T>(
        &self,
        apply: impl FnOnce(&mut TraversalCore) -> Result<T>,
    ) -> Result<T> {
        let Some(link) = &self.live else {
            return Err(Error::InvalidArgument(
                "entry is not managed by a traverser".into(),
            ));
        };
        let Some(core) = link.core.upgrade() else {
            return Err(Error::InvalidArgument(
                "the producing traversal has ended".into(),
            ));
        };
        let mut core = core.borrow_mut();
        if core.generation != link.generation {
            return Err(Error::InvalidArgument(
                "the iterator has advanced past this entry".into(),
            ));
        }
        apply(&mut core)
    }

    /// Enables or disables descent into this entry at the next advance.
    ///
    /// Legal only while the entry is live.
    pub fn set_descent(&mut self, enabled: bool) -> Result<()> {
        self.with_live_core(|core| {
            core.pending_descent = Some(enabled);
            Ok(())
        })?;
        self.descent_enabled = enabled;
        Ok(())
    }

    /// Marks this entry as a part of the multi-volume group `base_name`
    /// (parts sorted lexicographically).
    ///
    /// Legal only while the entry is live.
    pub fn set_multi_volume_group(&mut self, base_name: &str) -> Result<()> {
        self.set_multi_volume_group_ordered(base_name, PartOrdering::Natural)
    }

    /// [`Entry::set_multi_volume_group`] with an explicit part ordering.
    pub fn set_multi_volume_group_ordered(
        &mut self,
        base_name: &str,
        ordering: PartOrdering,
    ) -> Result<()> {
        let hierarchy = self.hierarchy.clone();
        self.with_live_core(|core| core.manager.mark(&hierarchy, base_name, ordering))
    }

    /// Reads the entry's payload. Returns 0 at end of payload.
    ///
    /// Live entries read from the traversal's current stream and lose their
    /// descent flag (reading consumes the payload descent would have
    /// consumed). Detached entries reopen their hierarchy through a private
    /// archive stack; after a full read the next call starts over from the
    /// beginning.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        let live_result = self.try_live_read(buf);
        match live_result {
            Some(result) => result,
            None => self.read_detached(buf),
        }
    }

    /// Attempts the live read path. `None` means "fall back to detached".
    fn try_live_read(&mut self, buf: &mut [u8]) -> Option<Result<usize>> {
        let link = self.live.as_ref()?;
        let core = link.core.upgrade()?;
        let mut core = core.borrow_mut();
        if core.generation != link.generation {
            return None;
        }

        core.pending_descent = Some(false);
        self.descent_enabled = false;

        let orchestrator = core.orchestrator.as_mut()?;
        if orchestrator.head_hierarchy() != self.hierarchy {
            // A filesystem-walk entry: no decoder is positioned on it.
            return None;
        }
        Some(orchestrator.read_head(buf))
    }

    fn read_detached(&mut self, buf: &mut [u8]) -> Result<usize> {
        if self.reader.is_none() {
            let mut orchestrator =
                Box::new(ArchiveStackOrchestrator::new(self.options.clone()));
            if !orchestrator.synchronize_to_hierarchy(&self.hierarchy) {
                return Err(Error::fault(
                    "Failed to reopen entry hierarchy",
                    self.hierarchy.clone(),
                ));
            }
            self.reader = Some(orchestrator);
        }

        let orchestrator = self.reader.as_mut().expect("reader was just ensured");
        match orchestrator.read_head(buf) {
            Ok(0) => {
                // Fully consumed; drop the private stack so another read
                // starts over from the beginning.
                self.reader = None;
                Ok(0)
            }
            Ok(n) => Ok(n),
            Err(err) => {
                self.reader = None;
                let fault = err.into_fault(self.hierarchy.clone());
                hooks::dispatch_fault(&fault);
                Err(Error::Fault(fault))
            }
        }
    }
}

/// Cloning detaches: the copy keeps hierarchy, type, size, metadata and the
/// option snapshot, but drops the live link to the producing traversal.
impl Clone for Entry {
    fn clone(&self) -> Self {
        Self {
            hierarchy: self.hierarchy.clone(),
            size: self.size,
            kind: self.kind,
            metadata: self.metadata.clone(),
            descent_enabled: self.descent_enabled,
            options: self.options.clone(),
            live: None,
            reader: None,
        }
    }
}

impl std::fmt::Debug for Entry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Entry")
            .field("path", &self.path())
            .field("size", &self.size)
            .field("kind", &self.kind)
            .field("depth", &self.depth())
            .field("live", &self.live.is_some())
            .finish()
    }
}
