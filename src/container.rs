//! Container reader and writer.
//!
//! A presentation is a ZIP archive with one XML part per slide
//! (`ppt/slides/slide{N}.xml`, 1-based N). The reader enumerates those
//! parts ordered by the embedded slide number — directory listing order
//! is not guaranteed stable across producers. The writer rebuilds the
//! archive, replacing only patched slide parts; every other entry is
//! copied through in raw form so its bytes are untouched.

use std::collections::HashMap;
use std::io::{Cursor, Read, Write};

use tracing::info;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::{CodecError, Result};

/// One slide part pulled out of the container.
#[derive(Debug, Clone)]
pub struct SlidePart {
    /// 1-based slide number embedded in the part name.
    pub page_index: usize,
    /// Full archive entry name, e.g. `ppt/slides/slide3.xml`.
    pub name: String,
    /// The part's raw XML text.
    pub xml: String,
}

/// Extract the slide number from a part name, or `None` if the entry
/// is not a slide part.
fn slide_number(name: &str) -> Option<usize> {
    let digits = name
        .strip_prefix("ppt/slides/slide")?
        .strip_suffix(".xml")?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Open `bytes` as a container and return its slide parts, sorted by
/// slide number. Purely functional over the input buffer.
pub fn read_slide_parts(bytes: &[u8]) -> Result<Vec<SlidePart>> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| CodecError::ContainerCorrupt(format!("not a readable archive: {e}")))?;

    let mut parts = Vec::new();
    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| CodecError::ContainerCorrupt(format!("entry {i}: {e}")))?;
        let name = entry.name().to_string();
        let Some(page_index) = slide_number(&name) else {
            continue;
        };
        let mut xml = String::new();
        entry
            .read_to_string(&mut xml)
            .map_err(|e| CodecError::ContainerCorrupt(format!("{name}: {e}")))?;
        parts.push(SlidePart { page_index, name, xml });
    }

    if parts.is_empty() {
        return Err(CodecError::ContainerCorrupt(
            "no slide parts found in archive".to_string(),
        ));
    }

    parts.sort_by_key(|p| p.page_index);
    info!(slides = parts.len(), "read slide parts from container");
    Ok(parts)
}

/// Rebuild the container, substituting the given part names with new
/// XML content. Untouched entries are copied through without
/// recompression, so their bytes pass from input to output intact.
pub fn write_container(bytes: &[u8], patched: &HashMap<String, String>) -> Result<Vec<u8>> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| CodecError::ContainerCorrupt(format!("not a readable archive: {e}")))?;

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    for i in 0..archive.len() {
        let entry = archive
            .by_index_raw(i)
            .map_err(|e| CodecError::SerializationFailure(format!("entry {i}: {e}")))?;
        let name = entry.name().to_string();

        if let Some(xml) = patched.get(&name) {
            writer
                .start_file(name.clone(), options)
                .map_err(|e| CodecError::SerializationFailure(format!("{name}: {e}")))?;
            writer
                .write_all(xml.as_bytes())
                .map_err(|e| CodecError::SerializationFailure(format!("{name}: {e}")))?;
        } else {
            writer
                .raw_copy_file(entry)
                .map_err(|e| CodecError::SerializationFailure(format!("{name}: {e}")))?;
        }
    }

    let cursor = writer
        .finish()
        .map_err(|e| CodecError::SerializationFailure(e.to_string()))?;
    info!(replaced = patched.len(), "rebuilt container");
    Ok(cursor.into_inner())
}
