//! The format decoder capability.
//!
//! The traversal core does not parse archive formats itself; it consumes a
//! [`FormatDecoder`]: given a byte source, enumerate headers and read
//! per-entry bytes. [`open_decoder`] is the built-in factory: it detects the
//! payload format by magic bytes, honors the caller's format list, unwraps
//! gzip compression, and instantiates the matching backend.
//!
//! The built-in backend decodes tar archives (plain or gzip-compressed) and
//! the `empty` pseudo-format. Every other recognized identifier faults as
//! unsupported at open time, which the traversal reports through the fault
//! callback and skips past.

mod tar;

pub(crate) use self::tar::TarDecoder;

use std::io::{Cursor, Read};

use flate2::read::GzDecoder;

use crate::error::{Error, Result};
use crate::metadata::FileKind;
use crate::options::{is_recognized_format, TraverserOptions};
use crate::stream::{SharedStream, StreamReader};

/// Bytes peeked from the stream for format detection. Tar needs 262 bytes
/// for its magic; a full block also gives the gzip probe enough compressed
/// input to inspect the decompressed prefix.
const PEEK_SIZE: usize = 512;

/// One decoded archive header.
#[derive(Debug, Clone, Default)]
pub(crate) struct HeaderSummary {
    /// Entry name, UTF-8 (lossily converted when the raw name is not).
    pub name: String,
    /// Raw name bytes when they were not valid UTF-8.
    pub raw_name: Option<Vec<u8>>,
    /// Payload size in bytes.
    pub size: u64,
    /// Entry file type.
    pub kind: FileKind,
    pub mode: Option<u32>,
    pub uid: Option<u64>,
    pub gid: Option<u64>,
    pub uname: Option<String>,
    pub gname: Option<String>,
    /// Modification time, seconds since the epoch.
    pub mtime: Option<i64>,
    /// Symlink / hard link target.
    pub link_target: Option<String>,
    /// Device major/minor numbers for device nodes.
    pub device: Option<(u64, u64)>,
}

/// A streaming archive decoder.
///
/// Decoders are strictly forward: [`FormatDecoder::next_header`] positions
/// at the next entry, after which the payload can be read or skipped once.
/// Rewinding is the owner's job (rewind the byte source, open a fresh
/// decoder).
pub(crate) trait FormatDecoder {
    /// Advances to the next header. `None` signals end of archive.
    fn next_header(&mut self) -> Result<Option<HeaderSummary>>;

    /// Reads from the current entry's payload. Returns 0 at payload end.
    fn read_payload(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Discards the rest of the current entry's payload.
    fn skip_payload(&mut self) -> Result<()>;

    /// Identifier of the decoded format.
    fn format_name(&self) -> &'static str;
}

impl std::fmt::Debug for dyn FormatDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormatDecoder")
            .field("format_name", &self.format_name())
            .finish()
    }
}

/// Decoder for the `empty` pseudo-format: zero bytes decode to zero entries.
struct EmptyDecoder;

impl FormatDecoder for EmptyDecoder {
    fn next_header(&mut self) -> Result<Option<HeaderSummary>> {
        Ok(None)
    }

    fn read_payload(&mut self, _buf: &mut [u8]) -> Result<usize> {
        Ok(0)
    }

    fn skip_payload(&mut self) -> Result<()> {
        Ok(())
    }

    fn format_name(&self) -> &'static str {
        "empty"
    }
}

fn read_up_to(reader: &mut impl Read, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..]).map_err(Error::Io)?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

/// Returns `true` when the gzip-compressed prefix decompresses to a tar
/// archive.
fn gzip_contains_tar(peek: &[u8]) -> bool {
    let mut inner = [0u8; 280];
    let mut decoder = GzDecoder::new(peek);
    match read_up_to(&mut decoder, &mut inner) {
        Ok(filled) => infer::archive::is_tar(&inner[..filled]),
        Err(_) => false,
    }
}

/// Opens a decoder for the stream's payload.
///
/// The stream must be positioned at its origin. The peeked prefix is
/// re-chained in front of the remaining stream bytes, so no rewind is
/// needed for the successful path.
pub(crate) fn open_decoder(
    stream: SharedStream,
    options: &TraverserOptions,
) -> Result<Box<dyn FormatDecoder>> {
    for format in &options.formats {
        if !is_recognized_format(format) {
            return Err(Error::UnsupportedFormat(format.clone()));
        }
    }

    let mut reader = StreamReader::new(stream);
    let mut peek = vec![0u8; PEEK_SIZE];
    let filled = read_up_to(&mut reader, &mut peek)?;
    peek.truncate(filled);

    if peek.is_empty() {
        if options.accepts_format("empty") {
            return Ok(Box::new(EmptyDecoder));
        }
        return Err(Error::UnsupportedFormat("empty".into()));
    }

    let chained: Box<dyn Read> = Box::new(Cursor::new(peek.clone()).chain(reader));

    if infer::archive::is_gz(&peek) {
        if !gzip_contains_tar(&peek) {
            return Err(Error::UnsupportedFormat("gzip".into()));
        }
        if !options.accepts_format("tar") {
            return Err(Error::UnsupportedFormat("tar".into()));
        }
        return Ok(Box::new(TarDecoder::new(Box::new(GzDecoder::new(
            chained,
        )))));
    }

    if infer::archive::is_tar(&peek) {
        if !options.accepts_format("tar") {
            return Err(Error::UnsupportedFormat("tar".into()));
        }
        return Ok(Box::new(TarDecoder::new(chained)));
    }

    Err(Error::UnsupportedFormat("unrecognized data".into()))
}
