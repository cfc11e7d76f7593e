//! Plain-text importer.

use std::sync::Arc;

use crate::config::EngineConfig;
use crate::error::Result;
use crate::import::{ContentUnit, ImportedBook, Importer, Metadata, NativeToc, UnitBody, title_from_file_name};
use crate::io::ByteSource;
use crate::util::decode_text;

/// The whole file becomes a single text unit.
pub struct TextImporter {
    metadata: Metadata,
    units: Vec<ContentUnit>,
    native_toc: NativeToc,
}

impl Importer for TextImporter {
    fn open(source: Arc<dyn ByteSource>, file_name: Option<&str>, config: &EngineConfig) -> Result<Self> {
        let bytes = source.read_all()?;
        let text = decode_text(&bytes, None, &config.fallback_encoding).into_owned();

        let href = file_name.unwrap_or("text").to_string();
        Ok(Self {
            metadata: Metadata {
                title: title_from_file_name(file_name),
                ..Metadata::default()
            },
            units: vec![ContentUnit {
                href,
                title: None,
                body: UnitBody::Text(text),
            }],
            native_toc: NativeToc::None,
        })
    }

    fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    fn units(&self) -> &[ContentUnit] {
        &self.units
    }

    fn native_toc(&self) -> &NativeToc {
        &self.native_toc
    }

    fn into_book(self) -> ImportedBook {
        ImportedBook {
            metadata: self.metadata,
            units: self.units,
            native_toc: self.native_toc,
        }
    }
}
