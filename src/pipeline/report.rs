//! Run-level aggregation.

use serde::Serialize;

use super::page::PageResult;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub total_pages: usize,
    pub total_detections: usize,
    pub pages_with_detections: usize,
    /// Foliation checks with `match == true`.
    pub exact_matches: usize,
    /// `total_pages - exact_matches`, floored at zero. A page carrying
    /// several matching stamps adds more than one exact match, so this is
    /// not a count of pages and can undercount them.
    pub pages_without_match: usize,
    /// Mean foliation confidence, rounded to three decimals.
    pub average_confidence: f64,
}

/// Derive the summary from finished page results.
pub fn summarize(pages: &[PageResult]) -> RunSummary {
    let total_detections = pages.iter().map(|p| p.detections.len()).sum();
    let pages_with_detections = pages.iter().filter(|p| !p.detections.is_empty()).count();

    let checks: Vec<_> = pages
        .iter()
        .flat_map(|p| p.detections.iter())
        .filter_map(|d| d.foliation)
        .collect();
    let exact_matches = checks.iter().filter(|c| c.is_match).count();
    let average_confidence = if checks.is_empty() {
        0.0
    } else {
        let mean = checks.iter().map(|c| c.confidence).sum::<f64>() / checks.len() as f64;
        (mean * 1000.0).round() / 1000.0
    };

    RunSummary {
        total_pages: pages.len(),
        total_detections,
        pages_with_detections,
        exact_matches,
        pages_without_match: pages.len().saturating_sub(exact_matches),
        average_confidence,
    }
}

/// The output of a run.
#[derive(Debug, Clone, Serialize)]
pub struct FoliationReport {
    pub pages: Vec<PageResult>,
    pub summary: RunSummary,
}

impl FoliationReport {
    pub fn new(pages: Vec<PageResult>) -> Self {
        let summary = summarize(&pages);
        Self { pages, summary }
    }
}
