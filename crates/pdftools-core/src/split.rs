//! Splitting a document into several
//!
//! Every output is built from scratch: a fresh document receives copies of
//! its pages through `copy_pages`, so each file stands alone and carries
//! only the objects its pages reference.

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use crate::document::{LoadOptions, PdfDocument, SaveOptions};
use crate::error::{PdfToolsError, Result};
use crate::transplant::copy_pages;

/// Name used when the caller supplies none
const DEFAULT_BASE_NAME: &str = "document";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "kebab-case")]
pub enum SplitPolicy {
    /// One output per page
    #[default]
    ExtractAll,
    /// Consecutive chunks of `count` pages; the last may be shorter
    FixedRange {
        #[serde(rename = "fixedCount")]
        count: i64,
    },
}

impl SplitPolicy {
    /// Build a policy from a mode tag (`extract-all` or `fixed-range`)
    pub fn parse(mode: &str, fixed_count: Option<i64>) -> Result<Self> {
        match mode.trim() {
            "extract-all" => Ok(SplitPolicy::ExtractAll),
            "fixed-range" => Ok(SplitPolicy::fixed_range(fixed_count.unwrap_or(1))),
            other => Err(PdfToolsError::InvalidSplitPolicy(other.to_string())),
        }
    }

    pub fn fixed_range(count: i64) -> Self {
        SplitPolicy::FixedRange {
            count: count.max(1),
        }
    }

    fn chunk_size(&self) -> usize {
        match self {
            SplitPolicy::ExtractAll => 1,
            SplitPolicy::FixedRange { count } => (*count).max(1) as usize,
        }
    }

    /// 0-based page ranges covering `page_count` pages in order
    pub fn ranges(&self, page_count: usize) -> Vec<RangeInclusive<usize>> {
        let size = self.chunk_size();
        (0..page_count)
            .step_by(size)
            .map(|start| start..=(start + size - 1).min(page_count - 1))
            .collect()
    }

    fn suffix(&self, range: &RangeInclusive<usize>) -> String {
        match self {
            SplitPolicy::ExtractAll => format!("page-{}", range.start() + 1),
            SplitPolicy::FixedRange { .. } => {
                format!("range-{}-{}", range.start() + 1, range.end() + 1)
            }
        }
    }
}

/// One document produced by a split
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitOutput {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Base name with a trailing `.pdf` (any case) removed
pub fn safe_name(base_name: &str) -> String {
    let trimmed = base_name.trim();
    let cut = trimmed.len().saturating_sub(4);
    let stem = match trimmed.get(cut..) {
        Some(ext) if ext.eq_ignore_ascii_case(".pdf") => &trimmed[..cut],
        _ => trimmed,
    };
    if stem.is_empty() {
        DEFAULT_BASE_NAME.to_string()
    } else {
        stem.to_string()
    }
}

/// Split a loaded document; outputs follow page order
pub fn split(source: &PdfDocument, base_name: &str, policy: &SplitPolicy) -> Result<Vec<SplitOutput>> {
    let page_count = source.page_count();
    if page_count == 0 {
        return Err(PdfToolsError::InsufficientInput(
            "The document has no pages to split.".into(),
        ));
    }

    let stem = safe_name(base_name);
    let ranges = policy.ranges(page_count);
    let mut outputs = Vec::with_capacity(ranges.len());

    for range in ranges {
        let indices: Vec<usize> = range.clone().collect();
        let mut part = PdfDocument::create();
        for page in copy_pages(source, &mut part, &indices)? {
            part.add_page(page)?;
        }

        outputs.push(SplitOutput {
            name: format!("{}-{}.pdf", stem, policy.suffix(&range)),
            bytes: part.save(&SaveOptions::default())?,
        });
    }

    tracing::info!(pages = page_count, outputs = outputs.len(), "split document");
    Ok(outputs)
}

/// Parse `bytes` and split them
pub fn split_pdf(bytes: &[u8], base_name: &str, policy: &SplitPolicy) -> Result<Vec<SplitOutput>> {
    let source = PdfDocument::load(bytes, &LoadOptions::default())?;
    split(&source, base_name, policy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::test_support::{letter_pdf, page_labels};
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn names(outputs: &[SplitOutput]) -> Vec<&str> {
        outputs.iter().map(|o| o.name.as_str()).collect()
    }

    #[test]
    fn test_parse_modes() {
        assert_eq!(
            SplitPolicy::parse("extract-all", None).unwrap(),
            SplitPolicy::ExtractAll
        );
        assert_eq!(
            SplitPolicy::parse("fixed-range", Some(3)).unwrap(),
            SplitPolicy::FixedRange { count: 3 }
        );
        assert_eq!(
            SplitPolicy::parse("fixed-range", Some(-4)).unwrap(),
            SplitPolicy::FixedRange { count: 1 }
        );
        let err = SplitPolicy::parse("by-bookmark", None).unwrap_err();
        assert!(matches!(err, PdfToolsError::InvalidSplitPolicy(_)));
    }

    #[test]
    fn test_policy_json() {
        let policy: SplitPolicy =
            serde_json::from_str(r#"{"mode":"fixed-range","fixedCount":2}"#).unwrap();
        assert_eq!(policy, SplitPolicy::FixedRange { count: 2 });
        let policy: SplitPolicy = serde_json::from_str(r#"{"mode":"extract-all"}"#).unwrap();
        assert_eq!(policy, SplitPolicy::ExtractAll);
    }

    #[test]
    fn test_safe_name() {
        assert_eq!(safe_name("report.pdf"), "report");
        assert_eq!(safe_name("Report.PDF"), "Report");
        assert_eq!(safe_name("notes.txt"), "notes.txt");
        assert_eq!(safe_name(".pdf"), "document");
        assert_eq!(safe_name("  "), "document");
    }

    #[test]
    fn test_extract_all() {
        let outputs = split_pdf(&letter_pdf(3, "Each"), "scan.pdf", &SplitPolicy::ExtractAll).unwrap();
        assert_eq!(
            names(&outputs),
            vec!["scan-page-1.pdf", "scan-page-2.pdf", "scan-page-3.pdf"]
        );
        for (i, output) in outputs.iter().enumerate() {
            assert_eq!(page_labels(&output.bytes), vec![format!("Each-Page-{}", i + 1)]);
        }
    }

    #[test]
    fn test_fixed_range_of_two_over_five_pages() {
        let outputs = split_pdf(&letter_pdf(5, "Chunk"), "book", &SplitPolicy::fixed_range(2)).unwrap();
        assert_eq!(
            names(&outputs),
            vec![
                "book-range-1-2.pdf",
                "book-range-3-4.pdf",
                "book-range-5-5.pdf"
            ]
        );
        assert_eq!(
            page_labels(&outputs[2].bytes),
            vec!["Chunk-Page-5".to_string()]
        );
    }

    #[test]
    fn test_fixed_range_larger_than_document() {
        let outputs = split_pdf(&letter_pdf(2, "Big"), "", &SplitPolicy::fixed_range(10)).unwrap();
        assert_eq!(names(&outputs), vec!["document-range-1-2.pdf"]);
    }

    #[test]
    fn test_corrupt_input() {
        let err = split_pdf(b"%PDF-1.4 broken", "x", &SplitPolicy::ExtractAll).unwrap_err();
        assert!(matches!(err, PdfToolsError::CorruptDocument(_)));
    }

    proptest! {
        #[test]
        fn ranges_cover_every_page_once(pages in 1usize..200, count in -3i64..40) {
            let policy = SplitPolicy::fixed_range(count);
            let ranges = policy.ranges(pages);
            let flattened: Vec<usize> = ranges.iter().cloned().flatten().collect();
            prop_assert_eq!(flattened, (0..pages).collect::<Vec<_>>());

            let size = count.max(1) as usize;
            prop_assert!(ranges.iter().all(|r| r.clone().count() <= size));
            prop_assert_eq!(ranges.len(), pages.div_ceil(size));
        }
    }
}
