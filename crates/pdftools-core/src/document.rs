//! In-memory document model
//!
//! `PdfDocument` wraps a `lopdf::Document` (an arena of objects keyed by
//! `ObjectId`) and tracks the root page-tree node so pages can be appended
//! in caller order. A document lives for one operation: it is created or
//! loaded, mutated, then consumed by `save`.

use std::collections::{HashMap, HashSet};

use lopdf::{dictionary, Dictionary, Object, ObjectId};
use serde::{Deserialize, Serialize};

use crate::compact;
use crate::encryption::{self, EncryptionSettings};
use crate::error::{PdfToolsError, Result};
use crate::fonts::StandardFont;

/// US Letter, used when a page carries no MediaBox anywhere in its ancestry
const DEFAULT_MEDIA_BOX: [f32; 4] = [0.0, 0.0, 612.0, 792.0];

/// Limit on Parent hops when resolving inherited page attributes
const MAX_TREE_DEPTH: usize = 64;

/// Limit on chained indirect references
const MAX_REFERENCE_HOPS: usize = 32;

/// Page attributes a page may inherit from its ancestors
pub(crate) const INHERITABLE_KEYS: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadOptions {
    /// Password used to open an encrypted source
    #[serde(default)]
    pub password: Option<String>,
    /// Load encrypted documents even when they cannot be decrypted
    #[serde(default)]
    pub ignore_encryption: bool,
}

impl LoadOptions {
    pub fn with_password(password: impl Into<String>) -> Self {
        Self {
            password: Some(password.into()),
            ignore_encryption: false,
        }
    }

    pub fn ignoring_encryption() -> Self {
        Self {
            password: None,
            ignore_encryption: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveOptions {
    /// Pack non-stream objects into object streams with a cross-reference stream
    #[serde(default)]
    pub use_object_streams: bool,
}

impl SaveOptions {
    pub fn compact() -> Self {
        Self {
            use_object_streams: true,
        }
    }
}

/// Handle to a page object inside one document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageRef(pub(crate) ObjectId);

impl PageRef {
    pub fn object_id(&self) -> ObjectId {
        self.0
    }
}

/// Page width and height in points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

pub struct PdfDocument {
    pub(crate) inner: lopdf::Document,
    pages_root: ObjectId,
    /// Still encrypted: loaded with `ignore_encryption` and no usable password
    locked: bool,
    /// Applied by `save`
    pending_encryption: Option<EncryptionSettings>,
    /// Pages whose original content has been wrapped in q/Q
    pub(crate) wrapped_pages: HashSet<ObjectId>,
    pub(crate) fonts: HashMap<StandardFont, ObjectId>,
    pub(crate) graphics_states: HashMap<u32, ObjectId>,
}

impl std::fmt::Debug for PdfDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfDocument")
            .field("version", &self.inner.version)
            .field("objects", &self.inner.objects.len())
            .field("pages", &self.page_count())
            .field("locked", &self.locked)
            .finish()
    }
}

impl PdfDocument {
    /// Empty document with zero pages
    pub fn create() -> Self {
        let mut inner = lopdf::Document::with_version("1.7");
        let pages_root = inner.new_object_id();
        inner.objects.insert(
            pages_root,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => Vec::<Object>::new(),
                "Count" => 0,
            }),
        );
        let catalog_id = inner.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_root,
        });
        inner.trailer.set("Root", catalog_id);

        Self::from_parts(inner, pages_root, false)
    }

    /// Parse PDF bytes
    ///
    /// Encrypted documents are decrypted with `options.password` (or the
    /// empty password). When that fails the load fails with `WrongPassword`,
    /// unless `ignore_encryption` is set, in which case the document is
    /// returned locked: it can be counted and re-saved but not edited.
    pub fn load(bytes: &[u8], options: &LoadOptions) -> Result<Self> {
        if !has_pdf_header(bytes) {
            return Err(PdfToolsError::CorruptDocument(
                "missing %PDF header".into(),
            ));
        }

        let mut inner = lopdf::Document::load_mem(bytes)
            .map_err(|e| PdfToolsError::CorruptDocument(e.to_string()))?;

        let mut locked = false;
        if inner.trailer.has(b"Encrypt") {
            let password = options.password.as_deref().unwrap_or("");
            match encryption::decrypt_document(&mut inner, password) {
                Ok(()) => tracing::debug!("decrypted source document"),
                Err(PdfToolsError::WrongPassword | PdfToolsError::UnsupportedEncryption(_))
                    if options.ignore_encryption =>
                {
                    tracing::debug!("loading encrypted document without decrypting it");
                    locked = true;
                }
                Err(e) => return Err(e),
            }
        }

        let pages_root = find_pages_root(&inner)?;
        Ok(Self::from_parts(inner, pages_root, locked))
    }

    fn from_parts(inner: lopdf::Document, pages_root: ObjectId, locked: bool) -> Self {
        Self {
            inner,
            pages_root,
            locked,
            pending_encryption: None,
            wrapped_pages: HashSet::new(),
            fonts: HashMap::new(),
            graphics_states: HashMap::new(),
        }
    }

    /// Serialize to PDF bytes, consuming the document
    pub fn save(mut self, options: &SaveOptions) -> Result<Vec<u8>> {
        if self.locked {
            // Content is still ciphertext: write objects back untouched
            return write_plain(&mut self.inner);
        }

        self.inner.compress();

        if let Some(settings) = self.pending_encryption.take() {
            encryption::encrypt_document(&mut self.inner, &settings)?;
            return write_plain(&mut self.inner);
        }

        if options.use_object_streams {
            compact::write_compact(&self.inner)
        } else {
            write_plain(&mut self.inner)
        }
    }

    pub fn page_count(&self) -> usize {
        self.inner.get_pages().len()
    }

    /// 0-based page indices in physical page order
    pub fn page_indices(&self) -> Vec<usize> {
        (0..self.page_count()).collect()
    }

    /// Pages in physical order
    pub fn pages(&self) -> Vec<PageRef> {
        self.inner.get_pages().into_values().map(PageRef).collect()
    }

    pub fn page(&self, index: usize) -> Result<PageRef> {
        let pages = self.pages();
        pages
            .get(index)
            .copied()
            .ok_or(PdfToolsError::PageIndexOutOfRange {
                index,
                page_count: pages.len(),
            })
    }

    /// True when the document was loaded encrypted and could not be decrypted
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Encryption that `save` will apply
    pub fn encryption(&self) -> Option<&EncryptionSettings> {
        self.pending_encryption.as_ref()
    }

    pub(crate) fn set_encryption(&mut self, settings: EncryptionSettings) -> Result<()> {
        self.ensure_unlocked()?;
        self.pending_encryption = Some(settings);
        Ok(())
    }

    pub(crate) fn ensure_unlocked(&self) -> Result<()> {
        if self.locked {
            Err(PdfToolsError::WrongPassword)
        } else {
            Ok(())
        }
    }

    /// Append a page to the end of the page tree
    ///
    /// The page must already live in this document's object graph, either
    /// created here or returned by `copy_pages` with this document as the
    /// destination.
    pub fn add_page(&mut self, page: PageRef) -> Result<()> {
        self.ensure_unlocked()?;
        let pages_root = self.pages_root;

        let page_dict = self
            .inner
            .get_object_mut(page.0)
            .and_then(Object::as_dict_mut)
            .map_err(|_| PdfToolsError::Operation(format!("page {:?} not found", page.0)))?;
        page_dict.set("Parent", pages_root);

        let root = self
            .inner
            .get_object_mut(pages_root)
            .and_then(Object::as_dict_mut)
            .map_err(|e| PdfToolsError::Operation(format!("invalid page tree: {}", e)))?;

        match root.get_mut(b"Kids") {
            Ok(Object::Array(kids)) => kids.push(Object::Reference(page.0)),
            _ => root.set("Kids", vec![Object::Reference(page.0)]),
        }
        let count = match root.get(b"Count") {
            Ok(Object::Integer(n)) => *n,
            _ => 0,
        };
        root.set("Count", count + 1);

        Ok(())
    }

    /// Create a page with an empty content stream and append it
    pub fn add_blank_page(&mut self, width: f32, height: f32) -> Result<PageRef> {
        self.ensure_unlocked()?;
        let page_id = self.inner.add_object(dictionary! {
            "Type" => "Page",
            "MediaBox" => media_box(width, height),
            "Resources" => Dictionary::new(),
        });
        let page = PageRef(page_id);
        self.add_page(page)?;
        Ok(page)
    }

    pub fn set_page_size(&mut self, page: PageRef, width: f32, height: f32) -> Result<()> {
        self.ensure_unlocked()?;
        let dict = self
            .inner
            .get_object_mut(page.0)
            .and_then(Object::as_dict_mut)?;
        dict.set("MediaBox", media_box(width, height));
        Ok(())
    }

    /// Page size from the (possibly inherited) MediaBox
    pub fn page_size(&self, page: PageRef) -> Result<PageSize> {
        let bounds = match inherited_attribute(&self.inner, page.0, b"MediaBox") {
            Some(object) => rectangle(&self.inner, &object).unwrap_or(DEFAULT_MEDIA_BOX),
            None => DEFAULT_MEDIA_BOX,
        };
        Ok(PageSize {
            width: (bounds[2] - bounds[0]).abs(),
            height: (bounds[3] - bounds[1]).abs(),
        })
    }
}

fn write_plain(doc: &mut lopdf::Document) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| PdfToolsError::Operation(format!("Failed to save PDF: {}", e)))?;
    Ok(buffer)
}

fn has_pdf_header(bytes: &[u8]) -> bool {
    let window = &bytes[..bytes.len().min(1024)];
    window.windows(5).any(|w| w == b"%PDF-")
}

fn find_pages_root(doc: &lopdf::Document) -> Result<ObjectId> {
    let catalog = doc
        .catalog()
        .map_err(|e| PdfToolsError::CorruptDocument(format!("no document catalog: {}", e)))?;
    match catalog.get(b"Pages") {
        Ok(Object::Reference(id)) => Ok(*id),
        _ => Err(PdfToolsError::CorruptDocument(
            "catalog has no page tree".into(),
        )),
    }
}

fn media_box(width: f32, height: f32) -> Vec<Object> {
    vec![
        Object::Integer(0),
        Object::Integer(0),
        Object::Real(width),
        Object::Real(height),
    ]
}

/// Follow indirect references until a direct object is reached
pub(crate) fn resolve<'a>(doc: &'a lopdf::Document, mut object: &'a Object) -> Option<&'a Object> {
    for _ in 0..MAX_REFERENCE_HOPS {
        match object {
            Object::Reference(id) => object = doc.objects.get(id)?,
            direct => return Some(direct),
        }
    }
    None
}

pub(crate) fn number(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

fn rectangle(doc: &lopdf::Document, object: &Object) -> Option<[f32; 4]> {
    let Object::Array(items) = resolve(doc, object)? else {
        return None;
    };
    if items.len() != 4 {
        return None;
    }
    let mut rect = [0.0; 4];
    for (slot, item) in rect.iter_mut().zip(items) {
        *slot = number(resolve(doc, item)?)?;
    }
    Some(rect)
}

/// Look up `key` on a page node, walking up `Parent` links
pub(crate) fn inherited_attribute(
    doc: &lopdf::Document,
    page_id: ObjectId,
    key: &[u8],
) -> Option<Object> {
    let mut node_id = page_id;
    for _ in 0..MAX_TREE_DEPTH {
        let node = doc.objects.get(&node_id)?.as_dict().ok()?;
        if let Ok(value) = node.get(key) {
            return Some(value.clone());
        }
        match node.get(b"Parent") {
            Ok(Object::Reference(parent)) => node_id = *parent,
            _ => return None,
        }
    }
    None
}
