//! Random-access ZIP entry index.
//!
//! The central directory is read once; afterwards every entry is fetched by
//! reading its compressed bytes straight from the source and inflating them.

use std::collections::HashMap;
use std::io::{self, Read};
use std::sync::Arc;

use zip::ZipArchive;

use crate::error::Result;
use crate::io::{ByteSource, ByteSourceCursor};

#[derive(Debug, Clone, Copy)]
struct ZipEntryLoc {
    /// Offset to the compressed data within the ZIP file.
    data_offset: u64,
    /// Size of the compressed data.
    compressed_size: u64,
    /// Compression method (0 = Store, 8 = Deflate).
    compression: u16,
}

/// A ZIP archive indexed by entry name, in archive order.
pub struct ZipIndex {
    source: Arc<dyn ByteSource>,
    names: Vec<String>,
    entries: HashMap<String, ZipEntryLoc>,
}

impl ZipIndex {
    /// Scan the central directory of `source`.
    pub fn new(source: Arc<dyn ByteSource>) -> Result<Self> {
        let cursor = ByteSourceCursor::new(source.clone());
        let mut archive = ZipArchive::new(cursor)?;

        let mut names = Vec::with_capacity(archive.len());
        let mut entries = HashMap::with_capacity(archive.len());

        for i in 0..archive.len() {
            let file = archive.by_index(i)?;
            if file.is_dir() {
                continue;
            }
            let name = file.name().to_string();
            let data_offset = file.data_start().ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("no data offset for ZIP entry {name}"),
                )
            })?;

            entries.insert(
                name.clone(),
                ZipEntryLoc {
                    data_offset,
                    compressed_size: file.compressed_size(),
                    compression: compression_to_u16(file.compression()),
                },
            );
            names.push(name);
        }

        log::debug!("indexed {} archive entries", names.len());

        Ok(Self {
            source,
            names,
            entries,
        })
    }

    /// Entry names in archive order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    /// Read and decompress an entry.
    pub fn read(&self, name: &str) -> io::Result<Vec<u8>> {
        let loc = self.lookup(name).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("file not found in ZIP: {name}"),
            )
        })?;

        let compressed = self
            .source
            .read_at(loc.data_offset, loc.compressed_size as usize)?;

        match loc.compression {
            0 => Ok(compressed),
            8 => {
                let mut decoder = flate2::read::DeflateDecoder::new(&compressed[..]);
                let mut out = Vec::new();
                decoder.read_to_end(&mut out)?;
                Ok(out)
            }
            method => Err(io::Error::new(
                io::ErrorKind::Unsupported,
                format!("unsupported compression method: {method}"),
            )),
        }
    }

    /// Exact match first, then an ASCII case-insensitive one; some archives
    /// disagree with their own manifests about case.
    fn lookup(&self, name: &str) -> Option<ZipEntryLoc> {
        if let Some(loc) = self.entries.get(name) {
            return Some(*loc);
        }
        self.names
            .iter()
            .find(|candidate| candidate.eq_ignore_ascii_case(name))
            .and_then(|candidate| self.entries.get(candidate))
            .copied()
    }
}

fn compression_to_u16(method: zip::CompressionMethod) -> u16 {
    match method {
        zip::CompressionMethod::Stored => 0,
        zip::CompressionMethod::Deflated => 8,
        _ => 255,
    }
}
