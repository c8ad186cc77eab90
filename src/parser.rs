//! Slide structure parser.
//!
//! Turns one slide's raw XML into an ordered list of shapes, each with
//! ordered text runs. Uses a real XML tree (`roxmltree`) rather than
//! regex scanning, so attribute values or comments that happen to look
//! like element markers cannot produce false shape boundaries. Every
//! text node keeps its byte range into the raw XML; the patch engine
//! edits those ranges in place without reserializing the tree.

use std::fmt;
use std::ops::Range;
use std::str::FromStr;

use roxmltree::{Document, Node};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::debug;

use crate::error::{CodecError, Result};

/// Identifier for a text-bearing shape.
///
/// PPTX gives shapes no identifier that survives re-authoring (`cNvPr`
/// ids are renumbered freely by producing tools), so shapes parsed from
/// a slide always get a positional id. The positional form is only
/// stable as long as shape order in the XML does not change between
/// analysis and patch. `Named` exists so that ids minted elsewhere
/// round-trip through the correction contract without being mistaken
/// for positional ones.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ShapeId {
    Named(String),
    Positional { page_index: usize, ordinal: usize },
}

impl fmt::Display for ShapeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShapeId::Named(name) => f.write_str(name),
            ShapeId::Positional { page_index, ordinal } => {
                write!(f, "page-{page_index}-shape-{ordinal}")
            }
        }
    }
}

impl FromStr for ShapeId {
    type Err = std::convert::Infallible;

    /// Strings in `page-{n}-shape-{k}` form parse as positional ids;
    /// anything else is treated as a named id.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let positional = s.strip_prefix("page-").and_then(|rest| {
            let (page, ordinal) = rest.split_once("-shape-")?;
            Some(ShapeId::Positional {
                page_index: page.parse().ok()?,
                ordinal: ordinal.parse().ok()?,
            })
        });
        Ok(positional.unwrap_or_else(|| ShapeId::Named(s.to_string())))
    }
}

impl Serialize for ShapeId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ShapeId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        // Infallible
        Ok(s.parse().unwrap_or(ShapeId::Named(s)))
    }
}

/// One contiguous styled text fragment inside a shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextRun {
    pub text: String,
    pub paragraph_idx: usize,
    pub run_idx: usize,
    pub is_bold: bool,
    pub is_italic: bool,
}

/// A parsed run together with the byte range of its text-node content
/// in the raw slide XML. Shared between analysis and the patch locator
/// so both sides enumerate runs identically.
#[derive(Debug, Clone)]
pub(crate) struct RawRun {
    pub text: String,
    pub paragraph_idx: usize,
    pub run_idx: usize,
    pub span: Range<usize>,
}

#[derive(Debug, Clone)]
pub(crate) struct RawShape {
    pub id: ShapeId,
    pub is_bold: bool,
    pub is_italic: bool,
    pub runs: Vec<RawRun>,
}

/// Parse one slide's XML into shapes with text runs.
///
/// Shapes are `sp` element blocks in document order. A shape's ordinal
/// counts every `sp` block on the slide, so ids stay stable whether or
/// not earlier shapes carry text. Shapes with zero non-empty runs are
/// dropped. If the slide has no `sp` blocks at all (some producing
/// tools omit them), the whole slide becomes one pseudo-shape holding
/// every text node — per-shape addressability is lost for that slide,
/// but no text is.
pub(crate) fn scan_page(xml: &str, page_index: usize) -> Result<Vec<RawShape>> {
    let doc = Document::parse(xml)
        .map_err(|e| CodecError::ContainerCorrupt(format!("slide {page_index}: {e}")))?;

    let sp_blocks: Vec<Node> = doc
        .descendants()
        .filter(|n| n.is_element() && n.tag_name().name() == "sp")
        .collect();

    let mut shapes = Vec::new();

    if sp_blocks.is_empty() {
        debug!(page_index, "no shape blocks found, collecting whole slide as pseudo-shape");
        let root = doc.root_element();
        let runs = collect_runs(root);
        if !runs.is_empty() {
            shapes.push(RawShape {
                id: ShapeId::Positional { page_index, ordinal: 1 },
                is_bold: style_flag(root, "b"),
                is_italic: style_flag(root, "i"),
                runs,
            });
        }
        return Ok(shapes);
    }

    for (idx, sp) in sp_blocks.iter().enumerate() {
        let runs = collect_runs(*sp);
        if runs.is_empty() {
            continue;
        }
        shapes.push(RawShape {
            id: ShapeId::Positional { page_index, ordinal: idx + 1 },
            is_bold: style_flag(*sp, "b"),
            is_italic: style_flag(*sp, "i"),
            runs,
        });
    }

    debug!(page_index, shapes = shapes.len(), "parsed slide");
    Ok(shapes)
}

/// Collect non-empty `t` text nodes under `scope`, in document order.
///
/// `paragraph_idx` is the ordinal of the enclosing `p` element within
/// the scope; `run_idx` counts surviving runs across the whole scope.
/// Both are zero-based and match what the analysis output reports, so
/// a correction's `runPath` resolves to the same node here.
fn collect_runs(scope: Node) -> Vec<RawRun> {
    let paragraphs: Vec<Node> = scope
        .descendants()
        .filter(|n| n.is_element() && n.tag_name().name() == "p")
        .collect();

    let mut runs = Vec::new();
    for t in scope
        .descendants()
        .filter(|n| n.is_element() && n.tag_name().name() == "t")
    {
        let Some(text_child) = t.children().find(|c| c.is_text()) else {
            continue;
        };
        let text = text_child.text().unwrap_or_default().trim().to_string();
        if text.is_empty() {
            continue;
        }
        let paragraph_idx = paragraphs
            .iter()
            .position(|p| t.ancestors().any(|a| a == *p))
            .unwrap_or(0);
        runs.push(RawRun {
            text,
            paragraph_idx,
            run_idx: runs.len(),
            span: text_child.range(),
        });
    }
    runs
}

/// True when a bold/italic marker is present anywhere within the shape
/// block: either a run-property attribute (`<a:rPr b="1">`) or a bare
/// marker element. This deliberately does not resolve formatting
/// through the slide layout or master style hierarchy; the flag is a
/// local approximation that keeps the model self-contained.
fn style_flag(scope: Node, flag: &str) -> bool {
    scope.descendants().any(|n| {
        n.is_element()
            && (n.tag_name().name() == flag
                || (n.tag_name().name() == "rPr" && n.attribute(flag) == Some("1")))
    })
}
