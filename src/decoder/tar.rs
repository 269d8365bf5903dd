//! Streaming tar backend.
//!
//! Drives 512-byte block framing over a forward-only reader and delegates
//! header field parsing to `tar::Header`. Handles ustar and GNU headers,
//! GNU long-name/long-link entries, and pax extended records for `path`,
//! `linkpath` and `size`.

use std::collections::HashMap;
use std::io::{self, Read};

use crate::decoder::{FormatDecoder, HeaderSummary};
use crate::error::{Error, Result};
use crate::metadata::FileKind;

const BLOCK_SIZE: usize = 512;

/// Upper bound for long-name / pax record payloads. Anything bigger is a
/// corrupt or hostile archive.
const MAX_META_PAYLOAD: u64 = 1 << 20;

pub(crate) struct TarDecoder {
    input: Box<dyn Read>,
    payload_remaining: u64,
    padding_remaining: u64,
    finished: bool,
    global_pax: HashMap<String, String>,
}

impl TarDecoder {
    pub(crate) fn new(input: Box<dyn Read>) -> Self {
        Self {
            input,
            payload_remaining: 0,
            padding_remaining: 0,
            finished: false,
            global_pax: HashMap::new(),
        }
    }

    /// Reads one block. Returns `false` on clean end-of-input before any
    /// byte of the block.
    fn read_block(&mut self, block: &mut [u8; BLOCK_SIZE]) -> Result<bool> {
        let mut filled = 0;
        while filled < BLOCK_SIZE {
            let n = self.input.read(&mut block[filled..]).map_err(Error::Io)?;
            if n == 0 {
                if filled == 0 {
                    return Ok(false);
                }
                return Err(Error::Decode("truncated tar header block".into()));
            }
            filled += n;
        }
        Ok(true)
    }

    fn drain(&mut self, count: u64) -> Result<()> {
        if count == 0 {
            return Ok(());
        }
        let copied = io::copy(&mut (&mut self.input).take(count), &mut io::sink())
            .map_err(Error::Io)?;
        if copied != count {
            return Err(Error::Decode("unexpected end of archive data".into()));
        }
        Ok(())
    }

    /// Reads the payload of a metadata pseudo-entry (long name, pax records)
    /// including its block padding.
    fn read_meta_payload(&mut self, size: u64) -> Result<Vec<u8>> {
        if size > MAX_META_PAYLOAD {
            return Err(Error::Decode(format!(
                "metadata record of {} bytes exceeds limit",
                size
            )));
        }
        let mut data = vec![0u8; size as usize];
        self.input.read_exact(&mut data).map_err(|e| {
            Error::Decode(format!("truncated metadata record: {}", e))
        })?;
        self.drain(block_padding(size))?;
        Ok(data)
    }
}

fn block_padding(size: u64) -> u64 {
    (BLOCK_SIZE as u64 - size % BLOCK_SIZE as u64) % BLOCK_SIZE as u64
}

fn verify_checksum(block: &[u8; BLOCK_SIZE], header: &tar::Header) -> Result<()> {
    let stored = header
        .cksum()
        .map_err(|e| Error::Decode(format!("invalid checksum field: {}", e)))?;
    let mut computed: u32 = 0;
    for (index, &byte) in block.iter().enumerate() {
        let value = if (148..156).contains(&index) { b' ' } else { byte };
        computed = computed.wrapping_add(u32::from(value));
    }
    if computed != stored {
        return Err(Error::Decode(format!(
            "header checksum mismatch: expected {:#o}, computed {:#o}",
            stored, computed
        )));
    }
    Ok(())
}

/// Parses pax extended records of the form `"<len> <key>=<value>\n"`.
fn parse_pax_records(data: &[u8]) -> HashMap<String, String> {
    let mut records = HashMap::new();
    let mut rest = data;
    while !rest.is_empty() {
        let Some(space) = rest.iter().position(|&b| b == b' ') else {
            break;
        };
        let Ok(len_str) = std::str::from_utf8(&rest[..space]) else {
            break;
        };
        let Ok(record_len) = len_str.parse::<usize>() else {
            break;
        };
        if record_len <= space + 1 || record_len > rest.len() {
            break;
        }
        let body = &rest[space + 1..record_len];
        let body = body.strip_suffix(b"\n").unwrap_or(body);
        if let Some(eq) = body.iter().position(|&b| b == b'=') {
            let key = String::from_utf8_lossy(&body[..eq]).into_owned();
            let value = String::from_utf8_lossy(&body[eq + 1..]).into_owned();
            records.insert(key, value);
        }
        rest = &rest[record_len..];
    }
    records
}

fn decode_name(bytes: &[u8]) -> (String, Option<Vec<u8>>) {
    let trimmed: &[u8] = match bytes.iter().position(|&b| b == 0) {
        Some(end) => &bytes[..end],
        None => bytes,
    };
    match std::str::from_utf8(trimmed) {
        Ok(name) => (name.to_string(), None),
        Err(_) => (
            String::from_utf8_lossy(trimmed).into_owned(),
            Some(trimmed.to_vec()),
        ),
    }
}

impl FormatDecoder for TarDecoder {
    fn next_header(&mut self) -> Result<Option<HeaderSummary>> {
        if self.finished {
            return Ok(None);
        }

        // Discard whatever remains of the previous entry.
        let leftover = self.payload_remaining + self.padding_remaining;
        self.payload_remaining = 0;
        self.padding_remaining = 0;
        self.drain(leftover)?;

        let mut pending_long_name: Option<Vec<u8>> = None;
        let mut pending_long_link: Option<Vec<u8>> = None;
        let mut pending_pax: Option<HashMap<String, String>> = None;

        loop {
            let mut block = [0u8; BLOCK_SIZE];
            if !self.read_block(&mut block)? {
                self.finished = true;
                return Ok(None);
            }
            if block.iter().all(|&b| b == 0) {
                // End of archive; the second zero block is optional.
                let mut second = [0u8; BLOCK_SIZE];
                let _ = self.read_block(&mut second)?;
                self.finished = true;
                return Ok(None);
            }

            let mut header = tar::Header::new_old();
            header.as_mut_bytes().copy_from_slice(&block);
            verify_checksum(&block, &header)?;

            let entry_type = header.entry_type();
            let stored_size = header
                .size()
                .map_err(|e| Error::Decode(format!("invalid size field: {}", e)))?;

            if entry_type.is_gnu_longname() {
                pending_long_name = Some(self.read_meta_payload(stored_size)?);
                continue;
            }
            if entry_type.is_gnu_longlink() {
                pending_long_link = Some(self.read_meta_payload(stored_size)?);
                continue;
            }
            if entry_type.is_pax_local_extensions() {
                let data = self.read_meta_payload(stored_size)?;
                pending_pax = Some(parse_pax_records(&data));
                continue;
            }
            if entry_type.is_pax_global_extensions() {
                let data = self.read_meta_payload(stored_size)?;
                self.global_pax.extend(parse_pax_records(&data));
                continue;
            }

            let pax = pending_pax.take();
            let pax_get = |key: &str| -> Option<&String> {
                pax.as_ref()
                    .and_then(|map| map.get(key))
                    .or_else(|| self.global_pax.get(key))
            };

            let (mut name, mut raw_name) = match pending_long_name.take() {
                Some(bytes) => decode_name(&bytes),
                None => decode_name(&header.path_bytes()),
            };
            if let Some(path) = pax_get("path") {
                name = path.clone();
                raw_name = None;
            }

            let mut link_target = match pending_long_link.take() {
                Some(bytes) => Some(decode_name(&bytes).0),
                None => header
                    .link_name_bytes()
                    .map(|bytes| decode_name(&bytes).0)
                    .filter(|target| !target.is_empty()),
            };
            if let Some(linkpath) = pax_get("linkpath") {
                link_target = Some(linkpath.clone());
            }

            let mut size = stored_size;
            if let Some(pax_size) = pax_get("size").and_then(|v| v.parse::<u64>().ok()) {
                size = pax_size;
            }

            let kind = if entry_type.is_dir() {
                FileKind::Directory
            } else if entry_type.is_symlink() {
                FileKind::Symlink
            } else if entry_type.is_file() || entry_type.is_contiguous() {
                FileKind::Regular
            } else {
                FileKind::Other
            };

            // Directory names conventionally carry a trailing slash.
            if kind == FileKind::Directory {
                while name.ends_with('/') {
                    name.pop();
                }
            }

            let device = match (header.device_major(), header.device_minor()) {
                (Ok(Some(major)), Ok(Some(minor))) if major != 0 || minor != 0 => {
                    Some((u64::from(major), u64::from(minor)))
                }
                _ => None,
            };

            let summary = HeaderSummary {
                name,
                raw_name,
                size,
                kind,
                mode: header.mode().ok(),
                uid: header.uid().ok(),
                gid: header.gid().ok(),
                uname: header
                    .username()
                    .ok()
                    .flatten()
                    .filter(|s| !s.is_empty())
                    .map(str::to_string),
                gname: header
                    .groupname()
                    .ok()
                    .flatten()
                    .filter(|s| !s.is_empty())
                    .map(str::to_string),
                mtime: header.mtime().ok().map(|t| t as i64),
                link_target,
                device,
            };

            // Only nodes with data carry payload blocks.
            let data_size = match kind {
                FileKind::Regular | FileKind::Other => size,
                FileKind::Directory | FileKind::Symlink | FileKind::Unknown => 0,
            };
            self.payload_remaining = data_size;
            self.padding_remaining = block_padding(data_size);

            return Ok(Some(summary));
        }
    }

    fn read_payload(&mut self, buf: &mut [u8]) -> Result<usize> {
        if self.payload_remaining == 0 || buf.is_empty() {
            return Ok(0);
        }
        let cap = buf.len().min(self.payload_remaining as usize);
        let n = self.input.read(&mut buf[..cap]).map_err(Error::Io)?;
        if n == 0 {
            return Err(Error::Decode("unexpected end of entry payload".into()));
        }
        self.payload_remaining -= n as u64;
        Ok(n)
    }

    fn skip_payload(&mut self) -> Result<()> {
        let remaining = self.payload_remaining;
        self.payload_remaining = 0;
        self.drain(remaining)
    }

    fn format_name(&self) -> &'static str {
        "tar"
    }
}
