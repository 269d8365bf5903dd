//! Multi-volume stream base: one logical stream over an ordered part list.

use std::io::SeekFrom;

use crate::error::{Error, Result};
use crate::hierarchy::PathHierarchy;
use crate::stream::DataStream;

/// Per-part I/O operations a multi-volume backend implements.
///
/// The driver addresses parts by their single-part hierarchies, obtained via
/// [`PathHierarchy::select_single_part`] on the logical hierarchy.
pub(crate) trait PartIo {
    /// Opens the given part for reading from its start.
    fn open_part(&mut self, part: &PathHierarchy) -> Result<()>;

    /// Closes the currently open part.
    fn close_part(&mut self);

    /// Reads from the currently open part. Returns 0 at part end.
    fn read_part(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Seeks within the currently open part.
    fn seek_in_part(&mut self, _pos: SeekFrom) -> Result<u64> {
        Err(Error::SeekUnsupported)
    }

    /// Size of the given part, when knowable without opening it.
    fn part_size(&mut self, _part: &PathHierarchy) -> Option<u64> {
        None
    }

    /// Hook invoked after the driver rewinds to `Idle`.
    fn on_rewind(&mut self, _logical: &PathHierarchy) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VolumeState {
    /// No part open.
    Idle,
    /// Part `i` open at some offset.
    Open(usize),
    /// Past the last byte of the last part.
    Exhausted,
}

/// Driver implementing [`DataStream`] over an ordered list of parts.
///
/// Parts are opened lazily on first read, advanced on short reads, and
/// closed when exhausted. Seeking is available only when the backend was
/// declared seekable at construction and every part can report its size.
pub(crate) struct MultiVolume<P: PartIo> {
    logical: PathHierarchy,
    state: VolumeState,
    seekable: bool,
    part_sizes: Option<Vec<u64>>,
    position: u64,
    io: P,
}

impl<P: PartIo + std::fmt::Debug> std::fmt::Debug for MultiVolume<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MultiVolume")
            .field("logical", &self.logical)
            .field("state", &self.state)
            .field("seekable", &self.seekable)
            .field("part_sizes", &self.part_sizes)
            .field("position", &self.position)
            .field("io", &self.io)
            .finish()
    }
}

impl<P: PartIo> MultiVolume<P> {
    pub(crate) fn new(logical: PathHierarchy, seekable: bool, io: P) -> Self {
        Self {
            logical,
            state: VolumeState::Idle,
            seekable,
            part_sizes: None,
            position: 0,
            io,
        }
    }

    fn part_count(&self) -> usize {
        self.logical.volume_size()
    }

    fn open_part_at(&mut self, index: usize) -> Result<()> {
        let part = self.logical.select_single_part(index);
        if part.is_empty() {
            return Err(Error::Logic(format!(
                "part index {} out of range for '{}'",
                index, self.logical
            )));
        }
        self.io.open_part(&part)?;
        self.state = VolumeState::Open(index);
        Ok(())
    }

    /// Computes cumulative part sizes on first use; demotes seekability when
    /// any part cannot report its size.
    fn ensure_part_sizes(&mut self) -> Option<&[u64]> {
        if self.part_sizes.is_none() {
            let mut sizes = Vec::with_capacity(self.part_count());
            for index in 0..self.part_count() {
                let part = self.logical.select_single_part(index);
                match self.io.part_size(&part) {
                    Some(size) => sizes.push(size),
                    None => {
                        self.seekable = false;
                        return None;
                    }
                }
            }
            self.part_sizes = Some(sizes);
        }
        self.part_sizes.as_deref()
    }

    fn total_size(&mut self) -> Option<u64> {
        self.ensure_part_sizes().map(|sizes| sizes.iter().sum())
    }

    fn position_to_part(&mut self, pos: u64) -> Option<(usize, u64)> {
        let sizes = self.ensure_part_sizes()?;
        let mut remaining = pos;
        for (index, &size) in sizes.iter().enumerate() {
            if remaining < size {
                return Some((index, remaining));
            }
            remaining -= size;
        }
        let last = sizes.len().checked_sub(1)?;
        Some((last, sizes[last]))
    }
}

impl<P: PartIo> DataStream for MultiVolume<P> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        loop {
            let index = match self.state {
                VolumeState::Exhausted => return Ok(0),
                VolumeState::Idle => {
                    if self.part_count() == 0 {
                        self.state = VolumeState::Exhausted;
                        return Ok(0);
                    }
                    self.open_part_at(0)?;
                    0
                }
                VolumeState::Open(index) => index,
            };

            let n = self.io.read_part(buf)?;
            if n > 0 {
                self.position += n as u64;
                return Ok(n);
            }

            self.io.close_part();
            if index + 1 < self.part_count() {
                self.open_part_at(index + 1)?;
            } else {
                self.state = VolumeState::Exhausted;
                return Ok(0);
            }
        }
    }

    fn rewind(&mut self) -> Result<()> {
        if matches!(self.state, VolumeState::Open(_)) {
            self.io.close_part();
        }
        self.state = VolumeState::Idle;
        self.position = 0;
        self.io.on_rewind(&self.logical)
    }

    fn at_end(&self) -> bool {
        matches!(self.state, VolumeState::Exhausted)
    }

    fn source_hierarchy(&self) -> PathHierarchy {
        self.logical.clone()
    }

    fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        if !self.can_seek() {
            return Err(Error::SeekUnsupported);
        }
        let total = self.total_size().ok_or(Error::SeekUnsupported)?;
        let target = match pos {
            SeekFrom::Start(offset) => offset as i64,
            SeekFrom::End(offset) => total as i64 + offset,
            SeekFrom::Current(offset) => self.position as i64 + offset,
        };
        if target < 0 {
            return Err(Error::InvalidArgument(
                "cannot seek before start of stream".into(),
            ));
        }
        let target = (target as u64).min(total);

        let (index, offset) = self
            .position_to_part(target)
            .ok_or(Error::SeekUnsupported)?;
        match self.state {
            VolumeState::Open(current) if current == index => {}
            VolumeState::Open(_) => {
                self.io.close_part();
                self.open_part_at(index)?;
            }
            VolumeState::Idle | VolumeState::Exhausted => {
                self.open_part_at(index)?;
            }
        }
        self.io.seek_in_part(SeekFrom::Start(offset))?;
        self.position = target;
        Ok(target)
    }

    fn tell(&self) -> Result<u64> {
        if self.seekable {
            Ok(self.position)
        } else {
            Err(Error::SeekUnsupported)
        }
    }

    fn can_seek(&self) -> bool {
        if !self.seekable {
            return false;
        }
        // A stream whose part sizes are unknowable must not advertise seek.
        self.part_sizes.is_some() || self.part_count() > 0
    }
}
