//! The archive stack cursor.
//!
//! The cursor maintains the chain of open archives as a stack of stream
//! slots. Slot 0 holds the root stream; every deeper slot holds the entry
//! payload stream feeding the decoder one level up. The topmost decoder is
//! the *current archive*; reading from the top-of-stack stream is the only
//! way to consume the current entry's payload.

use std::cell::RefCell;
use std::rc::Rc;

use smallvec::SmallVec;

use crate::archive::ArchiveDecoder;
use crate::error::{Error, Result};
use crate::hierarchy::PathHierarchy;
use crate::hooks;
use crate::options::TraverserOptions;
use crate::stream::{share, EntryPayloadStream, SharedStream, SystemFileStream};

pub(crate) struct ArchiveStackCursor {
    options: TraverserOptions,
    stack: SmallVec<[Option<SharedStream>; 6]>,
    current: Option<Rc<RefCell<ArchiveDecoder>>>,
}

impl ArchiveStackCursor {
    pub(crate) fn new() -> Self {
        Self {
            options: TraverserOptions::default(),
            stack: SmallVec::new(),
            current: None,
        }
    }

    pub(crate) fn configure(&mut self, options: &TraverserOptions) {
        self.options = options.clone();
    }

    #[allow(dead_code)] // Part of the cursor surface
    pub(crate) fn reset(&mut self) {
        self.options = TraverserOptions::default();
        self.stack.clear();
        self.current = None;
    }

    #[allow(dead_code)] // Part of the cursor surface
    pub(crate) fn depth(&self) -> usize {
        self.stack.len()
    }

    pub(crate) fn current_archive(&self) -> Option<&Rc<RefCell<ArchiveDecoder>>> {
        self.current.as_ref()
    }

    /// Hierarchy of the stream the next read targets: the top-of-stack
    /// stream's source.
    pub(crate) fn head_hierarchy(&self) -> PathHierarchy {
        match self.stack.last() {
            Some(Some(stream)) => stream.borrow().source_hierarchy(),
            _ => PathHierarchy::new(),
        }
    }

    /// Hierarchy of the current archive's current entry.
    pub(crate) fn current_entry_hierarchy(&self) -> PathHierarchy {
        if self.stack.first().map_or(true, Option::is_none) {
            return PathHierarchy::new();
        }
        match &self.current {
            Some(archive) => archive.borrow().current_hierarchy(),
            None => match self.stack.first() {
                Some(Some(stream)) => stream.borrow().source_hierarchy(),
                _ => PathHierarchy::new(),
            },
        }
    }

    /// Wraps a decoder around the top-of-stack stream and pushes a fresh
    /// empty slot for its entries.
    ///
    /// When the current entry's payload was already partially consumed, the
    /// stream is rewound first so the new decoder sees the payload from its
    /// first byte.
    pub(crate) fn descend(&mut self) -> Result<()> {
        let Some(slot) = self.stack.last() else {
            return Err(Error::Logic("descend on an empty stream stack".into()));
        };
        let Some(stream) = slot.clone() else {
            return Err(Error::Logic("descend requires a stream at the top".into()));
        };

        if let Some(archive) = &self.current {
            if !archive.borrow().content_ready() {
                stream.borrow_mut().rewind()?;
            }
        }

        let decoder = ArchiveDecoder::open(stream, &self.options, self.current.clone())?;
        self.current = Some(Rc::new(RefCell::new(decoder)));
        self.stack.push(None);
        Ok(())
    }

    /// Pops the top slot; the decoder below resumes its former position.
    /// Returns `false` when the stack is already empty.
    pub(crate) fn ascend(&mut self) -> bool {
        if self.stack.is_empty() {
            return false;
        }
        self.stack.pop();
        self.current = self
            .current
            .take()
            .and_then(|archive| archive.borrow().parent());
        true
    }

    /// Advances the current archive to its next header and installs the
    /// entry's payload stream as the new top of stack. Returns `false` at
    /// end of archive.
    pub(crate) fn next(&mut self) -> Result<bool> {
        let Some(archive) = self.current.clone() else {
            return Ok(false);
        };

        loop {
            if !archive.borrow_mut().next_header()? {
                return Ok(false);
            }
            if archive.borrow().has_current_entry() {
                break;
            }
        }

        let hierarchy = self.current_entry_hierarchy();
        let stream = self.create_stream(&hierarchy)?;
        *self.stack.last_mut().expect("stack holds current level") = Some(stream);
        Ok(true)
    }

    /// Synchronizes the stack to an arbitrary target hierarchy.
    ///
    /// Walks the target component by component: levels whose stream already
    /// matches the prefix are reused, everything deeper is torn down and
    /// rebuilt, descending between levels until the final component's stream
    /// is installed (and rewound) at the top of the stack.
    pub(crate) fn synchronize_to_hierarchy(&mut self, target: &PathHierarchy) -> Result<()> {
        if target.is_empty() {
            return Err(Error::fault(
                "target hierarchy cannot be empty",
                PathHierarchy::new(),
            ));
        }

        let last_depth = target.len() - 1;
        for depth in 0..target.len() {
            let prefix = target.prefix_until(depth);

            if let Some(Some(stream)) = self.stack.get(depth) {
                if stream.borrow().source_hierarchy() == prefix {
                    continue;
                }
            }

            // Shrink to this depth before creating a fresh stream.
            while self.stack.len() > depth + 1 {
                self.ascend();
            }
            if self.stack.len() <= depth {
                self.stack.resize(depth + 1, None);
            }

            let stream = self.create_stream(&prefix)?;
            *self.stack.last_mut().expect("slot was just ensured") = Some(stream.clone());
            stream.borrow_mut().rewind()?;

            if depth == last_depth {
                return Ok(());
            }
            self.descend()?;
        }

        Ok(())
    }

    /// Reads from the top-of-stack stream.
    pub(crate) fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let Some(slot) = self.stack.last() else {
            return Err(Error::fault("Stream stack is empty", PathHierarchy::new()));
        };
        let Some(stream) = slot.clone() else {
            return Err(Error::Logic("no active stream at the top of stack".into()));
        };

        let result = stream.borrow_mut().read(buf);
        result.map_err(|err| {
            let hierarchy = self.current_entry_hierarchy();
            Error::Fault(err.into_fault(hierarchy))
        })
    }

    /// Builds the stream serving `hierarchy`: root streams come from the
    /// caller-registered factory (falling back to the filesystem), deeper
    /// ones from the current decoder's entries.
    fn create_stream(&self, hierarchy: &PathHierarchy) -> Result<SharedStream> {
        if hierarchy.len() == 1 {
            if let Some(stream) = hooks::root_stream_for(hierarchy) {
                return Ok(share(stream));
            }
            return Ok(share(Box::new(SystemFileStream::open(hierarchy.clone())?)));
        }

        let Some(parent) = self.current.clone() else {
            return Err(Error::Logic(
                "nested stream requires an open parent archive".into(),
            ));
        };
        Ok(share(Box::new(EntryPayloadStream::for_entry(
            parent,
            hierarchy.clone(),
        )?)))
    }
}
