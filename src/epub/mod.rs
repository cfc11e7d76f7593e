//! EPUB container support: archive indexing and package/navigation parsing.

mod archive;
mod parser;

pub use archive::ZipIndex;
pub use parser::{
    ManifestItem, NavPoint, OpfData, is_html_path, parse_container_xml, parse_nav_document,
    parse_ncx, parse_opf,
};
