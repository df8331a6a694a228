//! Page reordering, compaction, and counting

use crate::document::{LoadOptions, PdfDocument, SaveOptions};
use crate::error::{PdfToolsError, Result};
use crate::transplant::copy_pages;

/// New document whose pages are `source` pages listed by `order` (0-based)
///
/// Indices may repeat. The source is never modified.
pub fn reorder(source: &PdfDocument, order: &[usize]) -> Result<PdfDocument> {
    if order.is_empty() {
        return Err(PdfToolsError::InsufficientInput(
            "Select at least one page.".into(),
        ));
    }

    let mut output = PdfDocument::create();
    for page in copy_pages(source, &mut output, order)? {
        output.add_page(page)?;
    }
    Ok(output)
}

pub fn reorder_pdf(bytes: &[u8], order: &[usize]) -> Result<Vec<u8>> {
    let source = PdfDocument::load(bytes, &LoadOptions::default())?;
    let output = reorder(&source, order)?;
    tracing::info!(pages = order.len(), "reordered pages");
    output.save(&SaveOptions::default())
}

/// Rebuild a document from its pages and save it with object streams
///
/// Copying every page into a fresh document leaves behind objects nothing
/// references. Encrypted inputs that cannot be opened are re-saved as-is.
pub fn compress_pdf(bytes: &[u8]) -> Result<Vec<u8>> {
    let source = PdfDocument::load(bytes, &LoadOptions::ignoring_encryption())?;
    if source.is_locked() {
        tracing::warn!("document is encrypted; saving without rebuilding");
        return source.save(&SaveOptions::compact());
    }

    let output = reorder(&source, &source.page_indices())?;
    let compressed = output.save(&SaveOptions::compact())?;
    tracing::info!(
        input = bytes.len(),
        output = compressed.len(),
        "compressed document"
    );
    Ok(compressed)
}

/// Number of pages; encrypted documents are counted without a password
pub fn page_count(bytes: &[u8]) -> Result<usize> {
    Ok(PdfDocument::load(bytes, &LoadOptions::ignoring_encryption())?.page_count())
}

/// Longest page list `parse_page_order` expands
pub const MAX_PAGE_ORDER_LEN: usize = 100_000;

/// Parse a 1-based page list like `"3, 1, 2"` or `"4-6, 1"` into 0-based indices
///
/// Order and repeats are kept; a descending range such as `"5-3"` yields
/// pages 5, 4, 3. Lists expanding past [`MAX_PAGE_ORDER_LEN`] entries are
/// rejected before anything is allocated for them.
pub fn parse_page_order(input: &str) -> Result<Vec<usize>> {
    let mut order = Vec::new();

    for part in input.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }

        if let Some((start, end)) = part.split_once('-') {
            let start = parse_page_number(start)?;
            let end = parse_page_number(end)?;
            let span = start.abs_diff(end).saturating_add(1);
            if span > MAX_PAGE_ORDER_LEN - order.len() {
                return Err(too_long(part));
            }
            if start <= end {
                order.extend(start..=end);
            } else {
                order.extend((end..=start).rev());
            }
        } else {
            if order.len() == MAX_PAGE_ORDER_LEN {
                return Err(too_long(part));
            }
            order.push(parse_page_number(part)?);
        }
    }

    if order.is_empty() {
        return Err(PdfToolsError::InsufficientInput(
            "Select at least one page.".into(),
        ));
    }
    Ok(order.into_iter().map(|page| page - 1).collect())
}

fn too_long(part: &str) -> PdfToolsError {
    PdfToolsError::InvalidInput(format!(
        "Page list is too long at {:?} (at most {} pages)",
        part, MAX_PAGE_ORDER_LEN
    ))
}

fn parse_page_number(text: &str) -> Result<usize> {
    let text = text.trim();
    match text.parse::<usize>() {
        Ok(page) if page >= 1 => Ok(page),
        _ => Err(PdfToolsError::InvalidInput(format!(
            "Invalid page number: {:?}",
            text
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::test_support::{letter_pdf, page_labels};
    use crate::tools::security::protect_pdf;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn test_reorder_pages() {
        let out = reorder_pdf(&letter_pdf(3, "R"), &[2, 0, 1]).unwrap();
        assert_eq!(page_labels(&out), vec!["R-Page-3", "R-Page-1", "R-Page-2"]);
    }

    #[test]
    fn test_reorder_allows_repeats_and_subsets() {
        let out = reorder_pdf(&letter_pdf(3, "S"), &[1, 1]).unwrap();
        assert_eq!(page_labels(&out), vec!["S-Page-2", "S-Page-2"]);
    }

    #[test]
    fn test_reorder_empty_order_fails() {
        let err = reorder_pdf(&letter_pdf(3, "E"), &[]).unwrap_err();
        assert!(matches!(err, PdfToolsError::InsufficientInput(_)));
    }

    #[test]
    fn test_reorder_out_of_range() {
        let err = reorder_pdf(&letter_pdf(2, "O"), &[0, 5]).unwrap_err();
        assert!(matches!(
            err,
            PdfToolsError::PageIndexOutOfRange {
                index: 5,
                page_count: 2
            }
        ));
    }

    #[test]
    fn test_compress_keeps_pages() {
        let source = letter_pdf(8, "C");
        let out = compress_pdf(&source).unwrap();
        assert_eq!(page_labels(&out), page_labels(&source));
    }

    #[test]
    fn test_compress_encrypted_without_password() {
        let protected = protect_pdf(&letter_pdf(2, "Locked"), "pw").unwrap();
        let out = compress_pdf(&protected).unwrap();
        assert_eq!(page_count(&out).unwrap(), 2);
    }

    #[test]
    fn test_page_count() {
        assert_eq!(page_count(&letter_pdf(5, "N")).unwrap(), 5);
        assert!(matches!(
            page_count(b"nope"),
            Err(PdfToolsError::CorruptDocument(_))
        ));
    }

    #[test]
    fn test_parse_page_order() {
        assert_eq!(parse_page_order("3,1,2").unwrap(), vec![2, 0, 1]);
        assert_eq!(parse_page_order(" 1-3, 5 ").unwrap(), vec![0, 1, 2, 4]);
        assert_eq!(parse_page_order("4-2").unwrap(), vec![3, 2, 1]);
        assert_eq!(parse_page_order("2,2").unwrap(), vec![1, 1]);
    }

    #[test]
    fn test_parse_page_order_rejects_bad_input() {
        assert!(matches!(
            parse_page_order("0"),
            Err(PdfToolsError::InvalidInput(_))
        ));
        assert!(matches!(
            parse_page_order("a-3"),
            Err(PdfToolsError::InvalidInput(_))
        ));
        assert!(matches!(
            parse_page_order(" , "),
            Err(PdfToolsError::InsufficientInput(_))
        ));
    }

    #[test]
    fn test_parse_page_order_rejects_huge_ranges() {
        for input in ["1-18446744073709551615", "1-3000000000", "3000000000-1"] {
            assert!(
                matches!(parse_page_order(input), Err(PdfToolsError::InvalidInput(_))),
                "{input}"
            );
        }

        let at_limit = format!("1-{}", MAX_PAGE_ORDER_LEN);
        assert_eq!(parse_page_order(&at_limit).unwrap().len(), MAX_PAGE_ORDER_LEN);
        let over = format!("{}, 1", at_limit);
        assert!(matches!(
            parse_page_order(&over),
            Err(PdfToolsError::InvalidInput(_))
        ));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn permutation_then_inverse_restores_order(
            order in Just((0..6usize).collect::<Vec<_>>()).prop_shuffle()
        ) {
            let source = letter_pdf(6, "P");
            let mut inverse = vec![0; order.len()];
            for (position, &page) in order.iter().enumerate() {
                inverse[page] = position;
            }

            let shuffled = reorder_pdf(&source, &order).unwrap();
            let restored = reorder_pdf(&shuffled, &inverse).unwrap();
            prop_assert_eq!(page_labels(&restored), page_labels(&source));
        }
    }
}
