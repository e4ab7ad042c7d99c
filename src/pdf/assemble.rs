//! Concatenating rendered pages into one output document
//!
//! Takes the rendered front page plus backup pages as in-memory documents,
//! renumbers their objects into a shared ID space, and builds a fresh
//! catalog and page tree preserving order. The write is atomic: the merged
//! document is serialized to a temp file beside the target and renamed into
//! place, so an aborted run never leaves a half-written invoice.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use lopdf::{Dictionary, Document, Object, ObjectId};

use crate::error::{Error, Result};

/// Merge rendered pages, in order, into a single PDF at `output_path`.
/// Returns the output path on success.
pub fn assemble(documents: Vec<Document>, output_path: &Path) -> Result<PathBuf> {
    if documents.is_empty() {
        return Err(Error::Render("no rendered pages to assemble".to_string()));
    }

    let mut max_id = 1;
    let mut page_ids: Vec<ObjectId> = Vec::new();
    let mut objects: BTreeMap<ObjectId, Object> = BTreeMap::new();

    for mut doc in documents {
        let pages = doc.get_pages();
        if pages.is_empty() {
            return Err(Error::Render("rendered page document has no pages".to_string()));
        }

        // Renumber into the shared ID space
        doc.renumber_objects_with(max_id);
        max_id = doc.max_id + 1;

        page_ids.extend(doc.get_pages().into_values());
        objects.extend(doc.objects);
    }

    let mut merged = Document::with_version("1.5");
    merged.objects.extend(objects);
    // new_object_id() must not collide with the IDs just imported
    merged.max_id = max_id - 1;

    let pages_id = merged.new_object_id();
    let kids: Vec<Object> = page_ids.iter().map(|&id| Object::Reference(id)).collect();

    let mut pages_dict = Dictionary::new();
    pages_dict.set("Type", Object::Name(b"Pages".to_vec()));
    pages_dict.set("Count", Object::Integer(page_ids.len() as i64));
    pages_dict.set("Kids", Object::Array(kids));

    let catalog_id = merged.new_object_id();
    let mut catalog = Dictionary::new();
    catalog.set("Type", Object::Name(b"Catalog".to_vec()));
    catalog.set("Pages", Object::Reference(pages_id));

    merged.objects.insert(catalog_id, Object::Dictionary(catalog));
    merged.objects.insert(pages_id, Object::Dictionary(pages_dict));
    merged.trailer.set("Root", Object::Reference(catalog_id));

    for &page_id in &page_ids {
        if let Ok(Object::Dictionary(ref mut dict)) = merged.get_object_mut(page_id) {
            dict.set("Parent", Object::Reference(pages_id));
        }
    }

    merged.compress();
    write_atomically(&mut merged, output_path)?;

    Ok(output_path.to_path_buf())
}

/// Serialize to a sibling temp file, then rename into place
fn write_atomically(doc: &mut Document, output_path: &Path) -> Result<()> {
    let mut buffer: Vec<u8> = Vec::new();
    doc.save_to(&mut buffer)?;

    let file_name = output_path
        .file_name()
        .ok_or_else(|| Error::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("invalid output path: {}", output_path.display()),
        )))?
        .to_string_lossy()
        .into_owned();
    let tmp_path = output_path.with_file_name(format!(".{file_name}.tmp"));

    fs::write(&tmp_path, &buffer)?;
    if let Err(e) = fs::rename(&tmp_path, output_path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(Error::Io(e));
    }
    Ok(())
}
