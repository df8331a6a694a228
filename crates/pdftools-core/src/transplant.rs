//! Page transplantation between documents
//!
//! Copies pages and everything they reference from one object arena into
//! another. Source ids are rewritten through a remap table so objects
//! shared between the requested pages (fonts, images, form XObjects) are
//! copied once per call.

use std::collections::HashMap;

use lopdf::{Dictionary, Object, ObjectId};

use crate::document::{inherited_attribute, PageRef, PdfDocument, INHERITABLE_KEYS};
use crate::error::{PdfToolsError, Result};

/// Copy the pages at `indices` (0-based) from `source` into `dest`
///
/// The algorithm:
/// 1. Validate every index before touching the destination
/// 2. For each index, clone the page dictionary with its inherited
///    attributes materialized and its `Parent` link dropped
/// 3. Rewrite every reference through the remap table, allocating a
///    destination id the first time a source object is seen
/// 4. Drain the worklist of newly allocated ids, copying each object
///
/// Duplicate indices produce distinct page objects that share resources.
/// The returned pages are not part of the destination page tree until the
/// caller passes them to `add_page`.
pub fn copy_pages(
    source: &PdfDocument,
    dest: &mut PdfDocument,
    indices: &[usize],
) -> Result<Vec<PageRef>> {
    source.ensure_unlocked()?;
    dest.ensure_unlocked()?;

    let source_pages = source.pages();
    for &index in indices {
        if index >= source_pages.len() {
            return Err(PdfToolsError::PageIndexOutOfRange {
                index,
                page_count: source_pages.len(),
            });
        }
    }

    let mut copier = Copier::new(&source.inner);
    let mut copied = Vec::with_capacity(indices.len());

    for &index in indices {
        let page_id = source_pages[index].object_id();
        let page_dict = flattened_page(&source.inner, page_id)?;
        let remapped = copier.remap_dict(&page_dict, &mut dest.inner);
        copier.drain(&mut dest.inner);

        let new_id = dest.inner.add_object(remapped);
        copied.push(PageRef(new_id));
    }

    tracing::debug!(
        pages = copied.len(),
        objects = copier.map.len(),
        "copied pages between documents"
    );
    Ok(copied)
}

/// Page dictionary with inheritable attributes made local
fn flattened_page(doc: &lopdf::Document, page_id: ObjectId) -> Result<Dictionary> {
    let mut page = doc
        .get_dictionary(page_id)
        .map_err(|e| PdfToolsError::CorruptDocument(format!("bad page object: {}", e)))?
        .clone();
    page.remove(b"Parent");

    for key in INHERITABLE_KEYS {
        if page.has(key) {
            continue;
        }
        if let Some(value) = inherited_attribute(doc, page_id, key) {
            page.set(key.to_vec(), value);
        }
    }
    Ok(page)
}

struct Copier<'a> {
    source: &'a lopdf::Document,
    map: HashMap<ObjectId, ObjectId>,
    pending: Vec<ObjectId>,
}

impl<'a> Copier<'a> {
    fn new(source: &'a lopdf::Document) -> Self {
        Self {
            source,
            map: HashMap::new(),
            pending: Vec::new(),
        }
    }

    /// Destination reference for a source id
    ///
    /// Links into the source page tree (annotation `/P`, destinations,
    /// `Parent` of page-level objects) are dropped, as are dangling ids.
    fn map_reference(&mut self, id: ObjectId, dest: &mut lopdf::Document) -> Object {
        if let Some(&mapped) = self.map.get(&id) {
            return Object::Reference(mapped);
        }

        let Some(object) = self.source.objects.get(&id) else {
            return Object::Null;
        };
        if is_page_tree_node(object) {
            return Object::Null;
        }

        let new_id = dest.new_object_id();
        self.map.insert(id, new_id);
        self.pending.push(id);
        Object::Reference(new_id)
    }

    fn remap(&mut self, object: &Object, dest: &mut lopdf::Document) -> Object {
        match object {
            Object::Reference(id) => self.map_reference(*id, dest),
            Object::Array(items) => {
                Object::Array(items.iter().map(|item| self.remap(item, dest)).collect())
            }
            Object::Dictionary(dict) => Object::Dictionary(self.remap_dict(dict, dest)),
            Object::Stream(stream) => {
                let mut copy = stream.clone();
                copy.dict = self.remap_dict(&stream.dict, dest);
                Object::Stream(copy)
            }
            other => other.clone(),
        }
    }

    fn remap_dict(&mut self, dict: &Dictionary, dest: &mut lopdf::Document) -> Dictionary {
        let mut out = Dictionary::new();
        for (key, value) in dict.iter() {
            out.set(key.clone(), self.remap(value, dest));
        }
        out
    }

    /// Copy every object allocated but not yet written
    fn drain(&mut self, dest: &mut lopdf::Document) {
        while let Some(source_id) = self.pending.pop() {
            let Some(object) = self.source.objects.get(&source_id) else {
                continue;
            };
            let copy = self.remap(object, dest);
            if let Some(&dest_id) = self.map.get(&source_id) {
                dest.objects.insert(dest_id, copy);
            }
        }
    }
}

fn is_page_tree_node(object: &Object) -> bool {
    let dict = match object {
        Object::Dictionary(dict) => dict,
        _ => return false,
    };
    matches!(
        dict.get(b"Type"),
        Ok(Object::Name(name)) if name == b"Page" || name == b"Pages"
    )
}
