//! System file stream: multi-volume stream backed by host files.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};

use crate::error::{Error, Result};
use crate::hierarchy::PathHierarchy;
use crate::stream::{MultiVolume, PartIo};

/// Backend opening each part as a host file.
#[derive(Debug)]
pub(crate) struct FileParts {
    handle: Option<BufReader<File>>,
    active_path: String,
}

impl FileParts {
    fn fail_read(&mut self, err: std::io::Error, logical: PathHierarchy) -> Error {
        let errno = err.raw_os_error().unwrap_or(0);
        let message = format!("Failed to read root file '{}': {}", self.active_path, err);
        self.close_part();
        Error::fault_errno(message, errno, logical)
    }
}

impl PartIo for FileParts {
    fn open_part(&mut self, part: &PathHierarchy) -> Result<()> {
        let path = part
            .last()
            .and_then(|entry| entry.as_single())
            .ok_or_else(|| Error::Logic("file part must be a single path".into()))?
            .to_string();

        match File::open(&path) {
            Ok(file) => {
                self.handle = Some(BufReader::new(file));
                self.active_path = path;
                Ok(())
            }
            Err(err) => {
                let errno = err.raw_os_error().unwrap_or(0);
                Err(Error::fault_errno(
                    format!("Failed to open root file '{}': {}", path, err),
                    errno,
                    part.clone(),
                ))
            }
        }
    }

    fn close_part(&mut self) {
        self.handle = None;
        self.active_path.clear();
    }

    fn read_part(&mut self, buf: &mut [u8]) -> Result<usize> {
        let Some(handle) = self.handle.as_mut() else {
            return Err(Error::Logic("read without open file part".into()));
        };
        match handle.read(buf) {
            Ok(n) => Ok(n),
            Err(err) => {
                let logical = PathHierarchy::new();
                Err(self.fail_read(err, logical))
            }
        }
    }

    fn seek_in_part(&mut self, pos: SeekFrom) -> Result<u64> {
        let Some(handle) = self.handle.as_mut() else {
            return Err(Error::Logic("seek without open file part".into()));
        };
        Ok(handle.seek(pos)?)
    }

    fn part_size(&mut self, part: &PathHierarchy) -> Option<u64> {
        let path = part.last()?.as_single()?;
        std::fs::metadata(path).ok().map(|meta| meta.len())
    }
}

/// A [`crate::stream::DataStream`] over one host file or an ordered group of
/// host files.
pub(crate) type SystemFileStream = MultiVolume<FileParts>;

impl SystemFileStream {
    /// Creates a stream for the given hierarchy.
    ///
    /// The root component must be a single path or a multi-volume group.
    /// Files are opened lazily; a missing file faults on first read with the
    /// native path and errno.
    pub(crate) fn open(logical: PathHierarchy) -> Result<Self> {
        if logical.is_empty() {
            return Err(Error::InvalidArgument(
                "root file hierarchy cannot be empty".into(),
            ));
        }
        let root = logical.first().expect("nonempty hierarchy");
        if !root.is_single() && !root.is_multi_volume() {
            return Err(Error::InvalidArgument(
                "root file hierarchy must be a single file or multi-volume source".into(),
            ));
        }
        Ok(MultiVolume::new(
            logical,
            true,
            FileParts {
                handle: None,
                active_path: String::new(),
            },
        ))
    }
}
