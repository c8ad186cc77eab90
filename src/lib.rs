//! Codec for reviewing and correcting text inside PPTX containers.
//!
//! Two pipelines over the same container bytes:
//! - **Analysis**: [`analyze`] opens the archive, parses each slide's
//!   XML into shapes and text runs, and aggregates them into a
//!   reviewable [`Analysis`] model with stats.
//! - **Patching**: [`apply_corrections`] re-reads the *original* bytes
//!   (the parsed model is not a re-serialization target), substitutes
//!   each accepted correction inside the right slide's raw XML, and
//!   rebuilds the archive with every untouched entry copied through
//!   byte-for-byte.
//!
//! Both pipelines are stateless per invocation; independent documents
//! can be processed concurrently with no shared mutable state.

pub mod analyze;
pub mod assemble;
pub mod collab;
pub mod container;
pub mod error;
pub mod parser;
pub mod patch;
pub mod store;

use std::collections::{BTreeMap, HashMap};

use tracing::{info, warn};

pub use analyze::{Analysis, Page, Shape, Stats, TextUnit};
pub use assemble::{AssembleError, ChunkAssembler};
pub use collab::{Authenticator, Corrector, SessionToken};
pub use container::SlidePart;
pub use error::{CodecError, Result};
pub use parser::{ShapeId, TextRun};
pub use patch::{Correction, PatchOutcome, PatchReport, SkipReason, SkippedCorrection};

/// Extract the reviewable text model from a container.
pub fn analyze(bytes: &[u8]) -> Result<Analysis> {
    let parts = container::read_slide_parts(bytes)?;
    let mut slides = Vec::with_capacity(parts.len());
    for part in &parts {
        slides.push((part.page_index, parser::scan_page(&part.xml, part.page_index)?));
    }
    Ok(analyze::aggregate(slides))
}

/// Apply accepted corrections to the original container bytes and
/// return a new container. Untouched parts are byte-identical to the
/// input; unmatched corrections are skipped and reported, not fatal.
pub fn apply_corrections(bytes: &[u8], corrections: &[Correction]) -> Result<PatchOutcome> {
    let parts = container::read_slide_parts(bytes)?;

    let mut by_page: BTreeMap<usize, Vec<&Correction>> = BTreeMap::new();
    for correction in corrections {
        by_page.entry(correction.page_index).or_default().push(correction);
    }

    let mut report = PatchReport::default();

    // Corrections aimed at pages the container does not have.
    for (page_index, page_corrections) in &by_page {
        if !parts.iter().any(|p| p.page_index == *page_index) {
            warn!(page_index, count = page_corrections.len(), "no part for page");
            for correction in page_corrections {
                report.skip(correction, SkipReason::PagePartMissing);
            }
        }
    }

    let mut patched: HashMap<String, String> = HashMap::new();
    for part in &parts {
        let Some(page_corrections) = by_page.get(&part.page_index) else {
            continue;
        };
        if let Some(new_xml) =
            patch::patch_page(&part.xml, part.page_index, page_corrections, &mut report)?
        {
            patched.insert(part.name.clone(), new_xml);
        }
    }

    let bytes = container::write_container(bytes, &patched)?;
    info!(
        applied = report.applied,
        skipped = report.skipped_count(),
        "corrections applied"
    );
    Ok(PatchOutcome { bytes, report })
}
