//! Byte-stream abstractions feeding the archive stack.
//!
//! Every level of the open-archive stack reads from a [`DataStream`]: the
//! root level from a [`SystemFileStream`] (or a caller-supplied stream via
//! the root-stream factory), nested levels from an [`EntryPayloadStream`]
//! sourced from the decoder one level below.

mod entry_payload;
mod file;
mod multi_volume;

pub(crate) use entry_payload::EntryPayloadStream;
pub(crate) use file::SystemFileStream;
pub(crate) use multi_volume::{MultiVolume, PartIo};

use std::cell::RefCell;
use std::io::{self, Read, SeekFrom};
use std::rc::Rc;

use crate::error::{Error, Result};
use crate::hierarchy::PathHierarchy;

/// An abstract byte source.
///
/// Streams support sequential reads, rewinding to their origin, a sticky
/// at-end flag, and self-report the hierarchy they represent. Seeking is
/// optional; the defaults report it unsupported.
pub trait DataStream {
    /// Reads up to `buf.len()` bytes. Returns 0 at end of stream.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Repositions the stream to its origin.
    fn rewind(&mut self) -> Result<()>;

    /// Returns `true` once a read has observed the end of the stream.
    fn at_end(&self) -> bool;

    /// The logical source this stream reads from.
    fn source_hierarchy(&self) -> PathHierarchy;

    /// Seeks to a new position. Unsupported by default.
    fn seek(&mut self, _pos: SeekFrom) -> Result<u64> {
        Err(Error::SeekUnsupported)
    }

    /// Reports the current position. Unsupported by default.
    fn tell(&self) -> Result<u64> {
        Err(Error::SeekUnsupported)
    }

    /// Returns `true` when [`DataStream::seek`] is usable.
    fn can_seek(&self) -> bool {
        false
    }
}

/// A stream slot shared between adjacent stack levels: level *i* owns the
/// stream that feeds the decoder at level *i + 1*.
pub(crate) type SharedStream = Rc<RefCell<Box<dyn DataStream>>>;

/// Wraps a stream for sharing.
pub(crate) fn share(stream: Box<dyn DataStream>) -> SharedStream {
    Rc::new(RefCell::new(stream))
}

/// Adapts a [`SharedStream`] to [`std::io::Read`] for format decoders.
///
/// Stream errors surface as `io::Error` values; the decoder reports them as
/// read failures which the wrapper converts back into faults.
pub(crate) struct StreamReader {
    stream: SharedStream,
}

impl StreamReader {
    pub(crate) fn new(stream: SharedStream) -> Self {
        Self { stream }
    }
}

impl Read for StreamReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        // Box the crate error whole so fault context (message, errno,
        // hierarchy) survives the round-trip through the decoder.
        self.stream
            .borrow_mut()
            .read(buf)
            .map_err(io::Error::other)
    }
}
