//! Text unit aggregation and analysis stats.
//!
//! Produces the reviewable model sent to the corrector: pages of shapes
//! of text runs, plus pure aggregate stats. The parse tree is ephemeral
//! — patching operates on the original container bytes again, because
//! this model is not a faithful re-serialization target.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::parser::{RawShape, ShapeId, TextRun};

/// Characters-to-tokens multiplier used for `tokensEstimated`. A rough
/// sizing heuristic for the external corrector, not a real tokenizer.
pub const TOKEN_ESTIMATE_MULTIPLIER: f64 = 1.2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shape {
    pub shape_id: ShapeId,
    pub text_runs: Vec<TextRun>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub page_index: usize,
    pub shapes: Vec<Shape>,
}

/// Derived counters, recomputed on every analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub pages: usize,
    pub shapes: usize,
    pub runs: usize,
    pub tokens_estimated: u64,
}

/// The full reviewable model for one container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Analysis {
    pub pages: Vec<Page>,
    pub stats: Stats,
}

/// One shape's runs merged into a single reviewable text block — the
/// unit actually handed to the corrector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextUnit {
    pub page_index: usize,
    pub shape_id: ShapeId,
    pub text: String,
}

impl Analysis {
    /// Runs joined with a single space and trimmed, one unit per shape.
    pub fn text_units(&self) -> Vec<TextUnit> {
        let mut units = Vec::new();
        for page in &self.pages {
            for shape in &page.shapes {
                let text = shape
                    .text_runs
                    .iter()
                    .map(|r| r.text.as_str())
                    .collect::<Vec<_>>()
                    .join(" ")
                    .trim()
                    .to_string();
                if text.is_empty() {
                    continue;
                }
                units.push(TextUnit {
                    page_index: page.page_index,
                    shape_id: shape.shape_id.clone(),
                    text,
                });
            }
        }
        units
    }
}

/// Assemble the analysis model from parsed slides. Slides whose every
/// shape was dropped contribute no page and are not counted in stats.
pub(crate) fn aggregate(slides: Vec<(usize, Vec<RawShape>)>) -> Analysis {
    let mut pages = Vec::new();
    let mut shape_count = 0usize;
    let mut run_count = 0usize;
    let mut char_count = 0usize;

    for (page_index, raw_shapes) in slides {
        if raw_shapes.is_empty() {
            continue;
        }
        let shapes: Vec<Shape> = raw_shapes
            .into_iter()
            .map(|raw| {
                let text_runs: Vec<TextRun> = raw
                    .runs
                    .into_iter()
                    .map(|run| {
                        char_count += run.text.chars().count();
                        TextRun {
                            text: run.text,
                            paragraph_idx: run.paragraph_idx,
                            run_idx: run.run_idx,
                            is_bold: raw.is_bold,
                            is_italic: raw.is_italic,
                        }
                    })
                    .collect();
                run_count += text_runs.len();
                Shape { shape_id: raw.id, text_runs }
            })
            .collect();
        shape_count += shapes.len();
        pages.push(Page { page_index, shapes });
    }

    let stats = Stats {
        pages: pages.len(),
        shapes: shape_count,
        runs: run_count,
        tokens_estimated: (char_count as f64 * TOKEN_ESTIMATE_MULTIPLIER).round() as u64,
    };
    info!(
        pages = stats.pages,
        shapes = stats.shapes,
        runs = stats.runs,
        "analysis complete"
    );
    Analysis { pages, stats }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::RawRun;
    use pretty_assertions::assert_eq;

    fn raw_shape(page_index: usize, ordinal: usize, texts: &[&str]) -> RawShape {
        RawShape {
            id: ShapeId::Positional { page_index, ordinal },
            is_bold: false,
            is_italic: false,
            runs: texts
                .iter()
                .enumerate()
                .map(|(i, t)| RawRun {
                    text: t.to_string(),
                    paragraph_idx: 0,
                    run_idx: i,
                    span: 0..0,
                })
                .collect(),
        }
    }

    #[test]
    fn stats_count_survivors_only() {
        let analysis = aggregate(vec![
            (1, vec![raw_shape(1, 1, &["abcde", "fghij"])]),
            (2, vec![]),
            (3, vec![raw_shape(3, 1, &["12345"])]),
        ]);
        assert_eq!(analysis.stats.pages, 2);
        assert_eq!(analysis.stats.shapes, 2);
        assert_eq!(analysis.stats.runs, 3);
        // 15 chars × 1.2 = 18
        assert_eq!(analysis.stats.tokens_estimated, 18);
    }

    #[test]
    fn text_units_join_runs_with_single_space() {
        let analysis = aggregate(vec![(1, vec![raw_shape(1, 1, &["안녕", "하세요"])])]);
        let units = analysis.text_units();
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].text, "안녕 하세요");
        assert_eq!(units[0].shape_id.to_string(), "page-1-shape-1");
    }

    #[test]
    fn analysis_serializes_to_wire_contract() {
        let analysis = aggregate(vec![(1, vec![raw_shape(1, 1, &["hi"])])]);
        let json = serde_json::to_value(&analysis).unwrap();
        let page = &json["pages"][0];
        assert_eq!(page["pageIndex"], 1);
        let shape = &page["shapes"][0];
        assert_eq!(shape["shapeId"], "page-1-shape-1");
        let run = &shape["textRuns"][0];
        assert_eq!(run["text"], "hi");
        assert_eq!(run["paragraph_idx"], 0);
        assert_eq!(run["run_idx"], 0);
        assert_eq!(run["is_bold"], false);
        assert!(json["stats"]["tokensEstimated"].is_u64());
    }
}
