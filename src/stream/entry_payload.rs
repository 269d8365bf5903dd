//! Entry payload stream: reads the payload of entries of a parent decoder.
//!
//! This is the stream that makes nested descent work: the cursor wraps a new
//! decoder around an [`EntryPayloadStream`] whose bytes come from the
//! current entry (or, for multi-volume groups, an ordered run of entries) of
//! the decoder one level below.

use std::cell::RefCell;
use std::rc::Rc;

use crate::archive::ArchiveDecoder;
use crate::error::{Error, Result};
use crate::hierarchy::PathHierarchy;
use crate::stream::{MultiVolume, PartIo};

pub(crate) struct EntryParts {
    parent: Rc<RefCell<ArchiveDecoder>>,
}

impl EntryParts {
    fn part_name(part: &PathHierarchy) -> Result<String> {
        part.last()
            .and_then(|entry| entry.first_name())
            .map(str::to_string)
            .ok_or_else(|| Error::Logic("entry part must carry a name".into()))
    }

    fn position_parent(&mut self, part: &PathHierarchy) -> Result<()> {
        let name = Self::part_name(part)?;
        if !self.parent.borrow_mut().skip_to_entry(&name)? {
            return Err(Error::fault(
                "Parent archive does not contain requested stream part",
                part.clone(),
            ));
        }
        Ok(())
    }
}

impl PartIo for EntryParts {
    fn open_part(&mut self, part: &PathHierarchy) -> Result<()> {
        self.position_parent(part)
    }

    fn close_part(&mut self) {
        let mut parent = self.parent.borrow_mut();
        if parent.has_current_entry() {
            if let Err(err) = parent.skip_payload() {
                log::debug!("failed to skip remaining payload: {}", err);
            }
        }
    }

    fn read_part(&mut self, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        self.parent.borrow_mut().read_current(buf)
    }

    // Payload parts have no knowable size and cannot seek; the defaults
    // already say so.

    fn on_rewind(&mut self, logical: &PathHierarchy) -> Result<()> {
        // Reposition the parent at the first part so subsequent reads start
        // cleanly.
        let first = logical.select_single_part(0);
        if first.is_empty() {
            return Err(Error::Logic("entry payload stream without parts".into()));
        }
        self.position_parent(&first)
    }
}

/// A stream over the payload of one entry (or a multi-volume run of entries)
/// of a parent decoder.
pub(crate) type EntryPayloadStream = MultiVolume<EntryParts>;

impl EntryPayloadStream {
    pub(crate) fn for_entry(
        parent: Rc<RefCell<ArchiveDecoder>>,
        logical: PathHierarchy,
    ) -> Result<Self> {
        if logical.is_empty() {
            return Err(Error::InvalidArgument(
                "entry payload hierarchy cannot be empty".into(),
            ));
        }
        Ok(MultiVolume::new(logical, false, EntryParts { parent }))
    }
}
