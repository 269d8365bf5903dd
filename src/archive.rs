//! Archive decoder wrapper: one live format decoder over one byte stream.
//!
//! An [`ArchiveDecoder`] owns the active [`FormatDecoder`] for one level of
//! the archive stack and tracks the position bookkeeping the cursor needs:
//! the current header, whether its payload is still untouched
//! (`content_ready`), and end-of-archive. Rewinding re-positions the
//! underlying stream and opens a fresh decoder, which is what makes
//! re-attachment of detached entries possible at any time.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

use crate::decoder::{open_decoder, FormatDecoder, HeaderSummary};
use crate::error::{Error, Result};
use crate::hierarchy::PathHierarchy;
use crate::metadata::{FileKind, MetadataMap, MetadataValue};
use crate::options::TraverserOptions;
use crate::stream::SharedStream;

pub(crate) struct ArchiveDecoder {
    stream: SharedStream,
    options: TraverserOptions,
    decoder: Box<dyn FormatDecoder>,
    parent: Option<Rc<RefCell<ArchiveDecoder>>>,
    current: Option<HeaderSummary>,
    content_ready: bool,
    at_eof: bool,
}

impl ArchiveDecoder {
    /// Opens a decoder for the stream's payload.
    ///
    /// The stream must be positioned at its origin. Open failures
    /// (unsupported or malformed formats) surface as errors; the stream is
    /// left untouched beyond the peeked prefix and can be rewound by the
    /// caller.
    pub(crate) fn open(
        stream: SharedStream,
        options: &TraverserOptions,
        parent: Option<Rc<RefCell<ArchiveDecoder>>>,
    ) -> Result<Self> {
        let decoder = open_decoder(stream.clone(), options)?;
        Ok(Self {
            stream,
            options: options.clone(),
            decoder,
            parent,
            current: None,
            content_ready: false,
            at_eof: false,
        })
    }

    pub(crate) fn parent(&self) -> Option<Rc<RefCell<ArchiveDecoder>>> {
        self.parent.clone()
    }

    pub(crate) fn source_hierarchy(&self) -> PathHierarchy {
        self.stream.borrow().source_hierarchy()
    }

    /// Hierarchy of the current entry: the source hierarchy plus the entry
    /// name, or just the source when no entry is positioned.
    pub(crate) fn current_hierarchy(&self) -> PathHierarchy {
        let mut hierarchy = self.source_hierarchy();
        if let Some(current) = &self.current {
            if !current.name.is_empty() {
                hierarchy.push_single(current.name.clone());
            }
        }
        hierarchy
    }

    pub(crate) fn has_current_entry(&self) -> bool {
        self.current
            .as_ref()
            .is_some_and(|current| !current.name.is_empty())
    }

    pub(crate) fn entry_name(&self) -> &str {
        self.current.as_ref().map_or("", |c| c.name.as_str())
    }

    pub(crate) fn entry_size(&self) -> u64 {
        self.current.as_ref().map_or(0, |c| c.size)
    }

    pub(crate) fn entry_kind(&self) -> FileKind {
        self.current.as_ref().map_or(FileKind::Unknown, |c| c.kind)
    }

    pub(crate) fn content_ready(&self) -> bool {
        self.content_ready
    }

    /// Positions at the next entry; `false` at end of archive.
    pub(crate) fn next_header(&mut self) -> Result<bool> {
        if self.at_eof {
            return Ok(false);
        }
        match self.decoder.next_header() {
            Ok(Some(summary)) => {
                self.current = Some(summary);
                self.content_ready = true;
                Ok(true)
            }
            Ok(None) => {
                self.current = None;
                self.content_ready = false;
                self.at_eof = true;
                Ok(false)
            }
            Err(err) => {
                let hierarchy = self.source_hierarchy();
                self.current = None;
                self.content_ready = false;
                self.at_eof = true;
                Err(Error::Fault(err.into_fault(hierarchy)))
            }
        }
    }

    /// Rewinds the underlying stream and opens a fresh decoder.
    pub(crate) fn rewind(&mut self) -> Result<()> {
        self.stream.borrow_mut().rewind()?;
        self.decoder = open_decoder(self.stream.clone(), &self.options)?;
        self.current = None;
        self.content_ready = false;
        self.at_eof = false;
        Ok(())
    }

    fn scan_to(&mut self, name: &str) -> Result<bool> {
        while self.next_header()? {
            if self.entry_name() == name {
                return Ok(true);
            }
            self.skip_payload()?;
        }
        Ok(false)
    }

    /// Positions at the entry called `name` with its payload readable.
    ///
    /// Short-circuits when already there; otherwise advances headers,
    /// skipping payloads, and rewinds once when the target lies behind the
    /// current position. Returns `false` when the archive has no such entry.
    pub(crate) fn skip_to_entry(&mut self, name: &str) -> Result<bool> {
        if self.has_current_entry() && self.entry_name() == name && self.content_ready {
            return Ok(true);
        }
        if self.scan_to(name)? {
            return Ok(true);
        }
        log::debug!(
            "entry '{}' lies behind the current position of '{}'; rewinding",
            name,
            self.source_hierarchy()
        );
        self.rewind()?;
        self.scan_to(name)
    }

    /// Advances until no further headers remain.
    #[allow(dead_code)] // Part of the decoder wrapper surface
    pub(crate) fn skip_to_eof(&mut self) -> Result<()> {
        while self.next_header()? {
            self.skip_payload()?;
        }
        Ok(())
    }

    /// Discards the rest of the current entry's payload.
    pub(crate) fn skip_payload(&mut self) -> Result<()> {
        if self.current.is_none() {
            return Err(Error::Logic(
                "skip_payload without a positioned entry".into(),
            ));
        }
        self.content_ready = false;
        self.decoder.skip_payload()
    }

    /// Reads from the current entry's payload; 0 at end of entry.
    pub(crate) fn read_current(&mut self, buf: &mut [u8]) -> Result<usize> {
        if self.current.is_none() {
            return Err(Error::Logic(
                "read_current without a positioned entry".into(),
            ));
        }
        match self.decoder.read_payload(buf) {
            Ok(n) => {
                if n > 0 {
                    self.content_ready = false;
                }
                Ok(n)
            }
            Err(err) => {
                let hierarchy = self.current_hierarchy();
                Err(Error::Fault(err.into_fault(hierarchy)))
            }
        }
    }

    /// Metadata of the current entry, restricted to the allow-listed keys.
    ///
    /// The UTF-8 name is preferred for `pathname`; when the header name was
    /// not valid UTF-8 the raw bytes are exposed instead.
    pub(crate) fn entry_metadata(&self, allowed_keys: &BTreeSet<String>) -> MetadataMap {
        let mut metadata = MetadataMap::new();
        let Some(current) = &self.current else {
            return metadata;
        };
        if allowed_keys.is_empty() {
            return metadata;
        }
        let wants = |key: &str| allowed_keys.contains(key);

        if wants("pathname") {
            let value = match &current.raw_name {
                Some(raw) if current.name.is_empty() => MetadataValue::Bytes(raw.clone()),
                _ => MetadataValue::Str(current.name.clone()),
            };
            metadata.insert("pathname".into(), value);
        }
        if wants("filetype") {
            metadata.insert(
                "filetype".into(),
                MetadataValue::UInt(current.kind.mode_bits()),
            );
        }
        if wants("size") {
            metadata.insert("size".into(), MetadataValue::UInt(current.size));
        }
        if wants("mode") {
            if let Some(mode) = current.mode {
                metadata.insert("mode".into(), MetadataValue::UInt(u64::from(mode)));
            }
        }
        if wants("uid") {
            if let Some(uid) = current.uid {
                metadata.insert("uid".into(), MetadataValue::Int(uid as i64));
            }
        }
        if wants("gid") {
            if let Some(gid) = current.gid {
                metadata.insert("gid".into(), MetadataValue::Int(gid as i64));
            }
        }
        if wants("uname") {
            if let Some(uname) = &current.uname {
                metadata.insert("uname".into(), MetadataValue::Str(uname.clone()));
            }
        }
        if wants("gname") {
            if let Some(gname) = &current.gname {
                metadata.insert("gname".into(), MetadataValue::Str(gname.clone()));
            }
        }
        if wants("mtime") {
            if let Some(mtime) = current.mtime {
                metadata.insert(
                    "mtime".into(),
                    MetadataValue::Time {
                        seconds: mtime,
                        nanoseconds: 0,
                    },
                );
            }
        }
        if wants("linkname") {
            if let Some(target) = &current.link_target {
                metadata.insert("linkname".into(), MetadataValue::Str(target.clone()));
            }
        }
        if wants("device") {
            if let Some((major, minor)) = current.device {
                metadata.insert("device".into(), MetadataValue::Device { major, minor });
            }
        }

        metadata
    }
}
