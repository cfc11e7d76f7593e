//! Source access: caller descriptors and random-access byte reading.

mod adapter;
mod byte_source;
mod source;

pub use adapter::ByteSourceCursor;
pub use byte_source::{ByteSource, FileSource, MemorySource};
pub use source::Source;
