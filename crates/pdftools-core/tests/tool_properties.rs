//! End-to-end properties of the public tool API
//!
//! Run with: cargo test -p pdftools-core --test tool_properties

use lopdf::{content::Content, content::Operation, Dictionary, Document, Object, Stream};
use pdftools_core::tools::{
    images_to_pdf, merge_documents, protect_pdf, reorder_pdf, unlock_pdf, watermark_pdf,
    WatermarkOptions,
};
use pdftools_core::{codec, split_pdf, LoadOptions, PdfDocument, PdfToolsError, SplitPolicy};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

/// Create a synthetic PDF whose page N shows `"{prefix}-{N}"`
fn create_synthetic_pdf(num_pages: u32, prefix: &str) -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Font".to_vec())),
        ("Subtype", Object::Name(b"Type1".to_vec())),
        ("BaseFont", Object::Name(b"Helvetica".to_vec())),
    ]));

    let mut page_ids = Vec::new();
    for i in 0..num_pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec![Object::Name(b"F1".to_vec()), Object::Integer(12)]),
                Operation::new("Td", vec![Object::Integer(72), Object::Integer(700)]),
                Operation::new(
                    "Tj",
                    vec![Object::String(
                        format!("{}-{}", prefix, i + 1).into_bytes(),
                        lopdf::StringFormat::Literal,
                    )],
                ),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content.encode().unwrap()));
        let resources = Dictionary::from_iter(vec![(
            "Font",
            Object::Dictionary(Dictionary::from_iter(vec![("F1", Object::Reference(font_id))])),
        )]);
        let page = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(pages_id)),
            (
                "MediaBox",
                Object::Array(vec![0.into(), 0.into(), 612.into(), 792.into()]),
            ),
            ("Contents", Object::Reference(content_id)),
            ("Resources", Object::Dictionary(resources)),
        ]);
        page_ids.push(doc.add_object(page));
    }

    let pages = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Pages".to_vec())),
        ("Count", Object::Integer(num_pages as i64)),
        (
            "Kids",
            Object::Array(page_ids.iter().map(|id| Object::Reference(*id)).collect()),
        ),
    ]);
    doc.objects.insert(pages_id, Object::Dictionary(pages));
    let catalog_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]));
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

/// Texts shown on each page, in page order
fn page_texts(bytes: &[u8]) -> Vec<Vec<String>> {
    let doc = Document::load_mem(bytes).unwrap();
    doc.get_pages()
        .into_values()
        .map(|page_id| {
            let content = doc.get_page_content(page_id).unwrap();
            Content::decode(&content)
                .unwrap()
                .operations
                .into_iter()
                .filter(|op| op.operator == "Tj")
                .filter_map(|op| match op.operands.first() {
                    Some(Object::String(text, _)) => Some(String::from_utf8_lossy(text).into_owned()),
                    _ => None,
                })
                .collect()
        })
        .collect()
}

fn first_texts(bytes: &[u8]) -> Vec<String> {
    page_texts(bytes)
        .into_iter()
        .map(|texts| texts.into_iter().next().unwrap_or_default())
        .collect()
}

fn count_pages(bytes: &[u8]) -> usize {
    PdfDocument::load(bytes, &LoadOptions::default())
        .unwrap()
        .page_count()
}

fn png(width: u32, height: u32) -> Vec<u8> {
    let mut out = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut out, width, height);
        encoder.set_color(png::ColorType::Rgb);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header().unwrap();
        writer
            .write_image_data(&vec![90u8; (width * height * 3) as usize])
            .unwrap();
    }
    out
}

// ============================================================================
// Merge
// ============================================================================

#[test]
fn merge_page_counts_add_up_in_source_order() {
    let merged = merge_documents(&[
        create_synthetic_pdf(2, "A"),
        create_synthetic_pdf(1, "B"),
        create_synthetic_pdf(3, "C"),
    ])
    .unwrap();

    assert_eq!(
        first_texts(&merged),
        vec!["A-1", "A-2", "B-1", "C-1", "C-2", "C-3"]
    );
}

#[test]
fn merge_needs_two_files() {
    let result = merge_documents(&[create_synthetic_pdf(1, "Solo")]);
    assert!(matches!(result, Err(PdfToolsError::InsufficientInput(_))));
}

// ============================================================================
// Split
// ============================================================================

#[test]
fn split_one_per_page_names() {
    let parts = split_pdf(&create_synthetic_pdf(4, "S"), "scan.pdf", &SplitPolicy::ExtractAll).unwrap();
    let names: Vec<_> = parts.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["scan-page-1.pdf", "scan-page-2.pdf", "scan-page-3.pdf", "scan-page-4.pdf"]
    );
    for (i, part) in parts.iter().enumerate() {
        assert_eq!(first_texts(&part.bytes), vec![format!("S-{}", i + 1)]);
    }
}

#[test]
fn split_fixed_two_of_five() {
    let parts = split_pdf(
        &create_synthetic_pdf(5, "F"),
        "doc",
        &SplitPolicy::fixed_range(2),
    )
    .unwrap();
    let names: Vec<_> = parts.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["doc-range-1-2.pdf", "doc-range-3-4.pdf", "doc-range-5-5.pdf"]
    );
    assert_eq!(first_texts(&parts[2].bytes), vec!["F-5"]);
}

#[test]
fn split_unknown_mode() {
    assert!(matches!(
        SplitPolicy::parse("halves", None),
        Err(PdfToolsError::InvalidSplitPolicy(_))
    ));
}

// ============================================================================
// Protect / unlock
// ============================================================================

#[test]
fn protect_then_unlock() {
    let source = create_synthetic_pdf(3, "P");
    let protected = protect_pdf(&source, "pw").unwrap();

    assert!(matches!(
        PdfDocument::load(&protected, &LoadOptions::default()),
        Err(PdfToolsError::WrongPassword)
    ));
    assert!(matches!(
        unlock_pdf(&protected, "wrong"),
        Err(PdfToolsError::WrongPassword)
    ));

    let unlocked = unlock_pdf(&protected, "pw").unwrap();
    let doc = Document::load_mem(&unlocked).unwrap();
    assert!(!doc.trailer.has(b"Encrypt"));
    assert_eq!(first_texts(&unlocked), first_texts(&source));
}

// ============================================================================
// Watermark / images
// ============================================================================

#[test]
fn watermark_stamps_every_page() {
    let options = WatermarkOptions {
        text: "DRAFT".into(),
        ..WatermarkOptions::default()
    };
    let out = watermark_pdf(&create_synthetic_pdf(5, "W"), &options).unwrap();
    let pages = page_texts(&out);
    assert_eq!(pages.len(), 5);
    assert!(pages.iter().all(|texts| texts.contains(&"DRAFT".to_string())));
}

#[test]
fn images_become_pages_of_their_size() {
    let out = images_to_pdf(&[png(100, 50), png(20, 300), png(1, 1)]).unwrap();
    let doc = PdfDocument::load(&out, &LoadOptions::default()).unwrap();
    let sizes: Vec<_> = doc
        .pages()
        .into_iter()
        .map(|page| {
            let size = doc.page_size(page).unwrap();
            (size.width, size.height)
        })
        .collect();
    assert_eq!(sizes, vec![(100.0, 50.0), (20.0, 300.0), (1.0, 1.0)]);
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn codec_round_trip(bytes in proptest::collection::vec(any::<u8>(), 0..512)) {
        prop_assert_eq!(codec::decode(&codec::encode(&bytes)).unwrap(), bytes);
    }

    #[test]
    fn reorder_then_inverse_restores(order in Just((0..5usize).collect::<Vec<_>>()).prop_shuffle()) {
        let source = create_synthetic_pdf(5, "R");
        let mut inverse = vec![0; order.len()];
        for (position, &page) in order.iter().enumerate() {
            inverse[page] = position;
        }
        let shuffled = reorder_pdf(&source, &order).unwrap();
        let restored = reorder_pdf(&shuffled, &inverse).unwrap();
        prop_assert_eq!(first_texts(&restored), first_texts(&source));
    }

    #[test]
    fn fixed_split_covers_every_page(pages in 1u32..9, chunk in -2i64..5) {
        let parts = split_pdf(
            &create_synthetic_pdf(pages, "K"),
            "k",
            &SplitPolicy::fixed_range(chunk),
        )
        .unwrap();
        let total: usize = parts.iter().map(|part| count_pages(&part.bytes)).sum();
        prop_assert_eq!(total, pages as usize);
    }
}
