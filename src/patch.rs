//! Correction locator and patch applier.
//!
//! Works on the original slide XML text, never on the parsed model:
//! only the raw XML is a faithful re-serialization target. Each slide
//! moves independently through Loaded → Patched → Serialized; slides
//! with no corrections skip straight to Serialized unchanged.
//!
//! A correction's search is scoped to the text node its `runPath`
//! resolves to, falling back to the whole slide when it does not
//! resolve or the scoped node no longer contains the text (runs may
//! have been aggregated before review, so a match can straddle the
//! node it was derived from).

use std::ops::Range;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Result;
use crate::parser::{scan_page, ShapeId};

/// An accepted original→revised edit, as produced by the external
/// corrector. Immutable once issued. `category` and `severity` are kept
/// as free-form strings: the vocabulary belongs to the corrector's
/// contract (observed values are `spelling|spacing|punctuation|grammar|
/// long_sentence|expression` and `critical|important|minor`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Correction {
    pub page_index: usize,
    pub shape_id: ShapeId,
    /// `[paragraph_idx, run_idx]` of the run the edit was derived from.
    #[serde(default)]
    pub run_path: Option<[usize; 2]>,
    pub original: String,
    pub revised: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub severity: String,
}

/// Why a correction was not applied. None of these abort the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SkipReason {
    /// The correction references a page with no corresponding part.
    PagePartMissing,
    /// `original` does not occur verbatim in the target slide's XML.
    NotFound,
    /// A correction with an empty `original` is never applicable.
    EmptyOriginal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedCorrection {
    pub page_index: usize,
    pub original: String,
    pub reason: SkipReason,
}

/// Outcome summary of one patch pass. Partial success is the norm: a
/// document with unmatched corrections still yields a valid corrected
/// file containing every correction that did match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchReport {
    pub applied: usize,
    pub skipped: Vec<SkippedCorrection>,
}

impl PatchReport {
    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }

    pub(crate) fn skip(&mut self, correction: &Correction, reason: SkipReason) {
        warn!(
            page_index = correction.page_index,
            original = %correction.original,
            ?reason,
            "correction skipped"
        );
        self.skipped.push(SkippedCorrection {
            page_index: correction.page_index,
            original: correction.original.clone(),
            reason,
        });
    }
}

/// The new container bytes plus what happened to each correction.
#[derive(Debug, Clone)]
pub struct PatchOutcome {
    pub bytes: Vec<u8>,
    pub report: PatchReport,
}

/// Escape text the way the document encodes its text nodes, so that
/// searching the raw XML for a correction's `original` matches what the
/// producing tool actually wrote.
pub(crate) fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// A text node's content range in the (mutating) slide XML, tagged with
/// the indices a `runPath` resolves against.
struct NodeSpan {
    shape_id: ShapeId,
    paragraph_idx: usize,
    run_idx: usize,
    range: Range<usize>,
}

/// Apply this slide's corrections to its raw XML. Returns the new XML
/// when at least one correction matched, `None` when the slide is
/// unchanged. Corrections are attempted longest-`original`-first so a
/// short match cannot consume text that a longer, overlapping
/// correction should have claimed.
pub(crate) fn patch_page(
    xml: &str,
    page_index: usize,
    corrections: &[&Correction],
    report: &mut PatchReport,
) -> Result<Option<String>> {
    let shapes = scan_page(xml, page_index)?;
    let mut spans: Vec<NodeSpan> = shapes
        .into_iter()
        .flat_map(|shape| {
            let shape_id = shape.id;
            shape.runs.into_iter().map(move |run| NodeSpan {
                shape_id: shape_id.clone(),
                paragraph_idx: run.paragraph_idx,
                run_idx: run.run_idx,
                range: run.span,
            })
        })
        .collect();

    let mut ordered: Vec<&Correction> = corrections.to_vec();
    ordered.sort_by(|a, b| b.original.len().cmp(&a.original.len()));

    let mut out = xml.to_string();
    let mut changed = false;

    for correction in ordered {
        if correction.original.is_empty() {
            report.skip(correction, SkipReason::EmptyOriginal);
            continue;
        }
        let escaped_original = escape_xml(&correction.original);
        let escaped_revised = escape_xml(&correction.revised);

        // Scoped node first, then the rest of the slide in order.
        let scoped = correction.run_path.and_then(|[p_idx, r_idx]| {
            spans.iter().position(|s| {
                s.shape_id == correction.shape_id
                    && s.paragraph_idx == p_idx
                    && s.run_idx == r_idx
            })
        });
        let candidates: Vec<usize> = match scoped {
            Some(first) => std::iter::once(first)
                .chain((0..spans.len()).filter(|&i| i != first))
                .collect(),
            None => (0..spans.len()).collect(),
        };

        let mut matched = false;
        for i in candidates {
            let content = &out[spans[i].range.clone()];
            let Some(pos) = content.find(&escaped_original) else {
                continue;
            };
            let at = spans[i].range.start + pos;
            out.replace_range(at..at + escaped_original.len(), &escaped_revised);

            // Shift every span boundary past the edit point.
            let delta = escaped_revised.len() as isize - escaped_original.len() as isize;
            for span in spans.iter_mut() {
                if span.range.start > at {
                    span.range.start = (span.range.start as isize + delta) as usize;
                }
                if span.range.end > at {
                    span.range.end = (span.range.end as isize + delta) as usize;
                }
            }
            debug!(
                page_index,
                original = %correction.original,
                revised = %correction.revised,
                "applied correction"
            );
            matched = true;
            break;
        }

        if matched {
            report.applied += 1;
            changed = true;
        } else {
            report.skip(correction, SkipReason::NotFound);
        }
    }

    Ok(changed.then_some(out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn correction(original: &str, revised: &str) -> Correction {
        Correction {
            page_index: 1,
            shape_id: ShapeId::Positional { page_index: 1, ordinal: 1 },
            run_path: None,
            original: original.to_string(),
            revised: revised.to_string(),
            category: "spelling".to_string(),
            reason: String::new(),
            severity: "critical".to_string(),
        }
    }

    const XML: &str = r#"<p:sld xmlns:p="urn:p" xmlns:a="urn:a"><p:sp>
      <a:p><a:r><a:t>앞부분 안녕 하세요 뒷부분</a:t></a:r></a:p>
    </p:sp></p:sld>"#;

    #[test]
    fn substitution_preserves_surrounding_node_text() {
        let c = correction("안녕 하세요", "안녕하세요");
        let mut report = PatchReport::default();
        let out = patch_page(XML, 1, &[&c], &mut report).unwrap().unwrap();
        assert!(out.contains("앞부분 안녕하세요 뒷부분"));
        assert_eq!(report.applied, 1);
        assert!(report.skipped.is_empty());
    }

    #[test]
    fn unmatched_correction_is_skipped_not_fatal() {
        let c = correction("프레젠테이숀", "프레젠테이션");
        let mut report = PatchReport::default();
        let out = patch_page(XML, 1, &[&c], &mut report).unwrap();
        assert_eq!(out, None);
        assert_eq!(report.applied, 0);
        assert_eq!(report.skipped_count(), 1);
        assert_eq!(report.skipped[0].reason, SkipReason::NotFound);
    }

    #[test]
    fn empty_original_is_rejected() {
        let c = correction("", "whatever");
        let mut report = PatchReport::default();
        assert!(patch_page(XML, 1, &[&c], &mut report).unwrap().is_none());
        assert_eq!(report.skipped[0].reason, SkipReason::EmptyOriginal);
    }

    #[test]
    fn longest_original_wins_overlap() {
        let xml = r#"<p:sld xmlns:p="urn:p" xmlns:a="urn:a"><p:sp>
          <a:p><a:r><a:t>프레젠테이숀 자료</a:t></a:r></a:p>
        </p:sp></p:sld>"#;
        let long = correction("프레젠테이숀 자료", "프레젠테이션 자료");
        let short = correction("프레젠테이숀", "프레젠테이션");
        let mut report = PatchReport::default();
        let out = patch_page(xml, 1, &[&short, &long], &mut report).unwrap().unwrap();
        assert!(out.contains("프레젠테이션 자료"));
        // The longer match consumed the text; the shorter finds nothing left.
        assert_eq!(report.applied, 1);
        assert_eq!(report.skipped_count(), 1);
    }

    #[test]
    fn matching_honors_entity_encoding() {
        let xml = r#"<p:sld xmlns:p="urn:p" xmlns:a="urn:a"><p:sp>
          <a:p><a:r><a:t>R &amp; D team</a:t></a:r></a:p>
        </p:sp></p:sld>"#;
        let c = correction("R & D", "R&D");
        let mut report = PatchReport::default();
        let out = patch_page(xml, 1, &[&c], &mut report).unwrap().unwrap();
        assert!(out.contains("<a:t>R&amp;D team</a:t>"));
        assert_eq!(report.applied, 1);
    }

    #[test]
    fn run_path_scopes_the_search() {
        let xml = r#"<p:sld xmlns:p="urn:p" xmlns:a="urn:a">
          <p:sp><a:p><a:r><a:t>머리말 테스트</a:t></a:r></a:p></p:sp>
          <p:sp><a:p><a:r><a:t>본문 테스트</a:t></a:r></a:p></p:sp>
        </p:sld>"#;
        let c = Correction {
            page_index: 1,
            shape_id: ShapeId::Positional { page_index: 1, ordinal: 2 },
            run_path: Some([0, 0]),
            original: "테스트".to_string(),
            revised: "검토".to_string(),
            category: "expression".to_string(),
            reason: String::new(),
            severity: "minor".to_string(),
        };
        let mut report = PatchReport::default();
        let out = patch_page(xml, 1, &[&c], &mut report).unwrap().unwrap();
        assert!(out.contains("머리말 테스트"));
        assert!(out.contains("본문 검토"));
        assert_eq!(report.applied, 1);
    }

    #[test]
    fn escape_xml_covers_the_five_entities() {
        assert_eq!(escape_xml(r#"<a & "b">'c'"#), "&lt;a &amp; &quot;b&quot;&gt;&apos;c&apos;");
    }
}
