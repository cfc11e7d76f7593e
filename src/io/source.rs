use std::fmt;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use super::byte_source::{ByteSource, FileSource, MemorySource};

/// Caller-owned description of where a document's bytes live.
///
/// The engine never holds a source open across calls: every
/// [`open`](Source::open) produces a fresh, independent [`ByteSource`], so
/// several reading sessions may share one descriptor.
pub enum Source {
    /// A local file, opened anew (and read with positional I/O) on each use.
    Path(PathBuf),
    /// An in-memory buffer shared without copying.
    Bytes(Arc<[u8]>),
    /// A forward-only stream. It can be consumed exactly once; opening
    /// buffers it into memory so archive formats can still seek.
    Reader(Mutex<Option<Box<dyn Read + Send>>>),
}

impl Source {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Source::Path(path.into())
    }

    pub fn from_bytes(bytes: impl Into<Arc<[u8]>>) -> Self {
        Source::Bytes(bytes.into())
    }

    pub fn from_reader(reader: impl Read + Send + 'static) -> Self {
        Source::Reader(Mutex::new(Some(Box::new(reader))))
    }

    /// Whether [`open`](Source::open) can be called more than once.
    pub fn is_rereadable(&self) -> bool {
        !matches!(self, Source::Reader(_))
    }

    /// Whether the underlying bytes support random access without buffering.
    pub fn is_seekable(&self) -> bool {
        !matches!(self, Source::Reader(_))
    }

    /// The file path, when the source is a local file.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Source::Path(path) => Some(path),
            _ => None,
        }
    }

    /// Open a random-access view of the source.
    pub fn open(&self) -> io::Result<Arc<dyn ByteSource>> {
        match self {
            Source::Path(path) => {
                let file = std::fs::File::open(path)?;
                Ok(Arc::new(FileSource::new(file)?))
            }
            Source::Bytes(bytes) => Ok(Arc::new(MemorySource::new(bytes.clone()))),
            Source::Reader(slot) => {
                let mut guard = slot
                    .lock()
                    .map_err(|_| io::Error::other("source reader lock poisoned"))?;
                let mut reader = guard.take().ok_or_else(|| {
                    io::Error::new(io::ErrorKind::UnexpectedEof, "stream source already consumed")
                })?;
                let mut data = Vec::new();
                reader.read_to_end(&mut data)?;
                log::debug!("buffered {} bytes from single-pass source", data.len());
                Ok(Arc::new(MemorySource::new(data)))
            }
        }
    }
}

impl fmt::Debug for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Path(path) => f.debug_tuple("Path").field(path).finish(),
            Source::Bytes(bytes) => write!(f, "Bytes({} bytes)", bytes.len()),
            Source::Reader(_) => f.write_str("Reader(..)"),
        }
    }
}

impl From<PathBuf> for Source {
    fn from(path: PathBuf) -> Self {
        Source::Path(path)
    }
}

impl From<&Path> for Source {
    fn from(path: &Path) -> Self {
        Source::Path(path.to_path_buf())
    }
}

impl From<Vec<u8>> for Source {
    fn from(bytes: Vec<u8>) -> Self {
        Source::Bytes(bytes.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes_source_is_rereadable() {
        let source = Source::from_bytes(b"abc".to_vec());
        assert!(source.is_rereadable());
        assert_eq!(source.open().unwrap().read_all().unwrap(), b"abc");
        assert_eq!(source.open().unwrap().read_all().unwrap(), b"abc");
    }

    #[test]
    fn test_reader_source_is_single_pass() {
        let source = Source::from_reader(io::Cursor::new(b"stream".to_vec()));
        assert!(!source.is_rereadable());
        assert!(!source.is_seekable());

        let opened = source.open().unwrap();
        assert_eq!(opened.read_at(2, 4).unwrap(), b"ream");
        assert!(source.open().is_err());
    }

    #[test]
    fn test_missing_path_is_error() {
        let source = Source::from_path("/definitely/not/here.epub");
        assert_eq!(source.open().err().map(|e| e.kind()), Some(io::ErrorKind::NotFound));
    }
}
