//! Parsing a table's `.gdbindexes` file: the attribute, spatial, and primary index catalog.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::cursor::ByteCursor;
use crate::field::FieldDescriptor;
use crate::Result;

/// What an index entry is built over.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IndexKind {
    /// Built over the ObjectID field.
    PrimaryIndex,
    /// Built over the Geometry field.
    SpatialIndex,
    /// Built over any other field, or a SQL-like expression with no matching declared field.
    AttributeIndex,
}

/// A single parsed index entry.
#[derive(Clone, Debug, PartialEq)]
pub struct IndexEntry {
    /// The index's own name.
    pub name: String,
    /// The name of the field (or expression) the index is built over.
    pub field_name: String,
    #[allow(missing_docs)]
    pub kind: IndexKind,
}

/// Reads and classifies every entry of a table's `.gdbindexes` file, if present.
///
/// Returns `Ok(Vec::new())` when the file does not exist: a table having no secondary indexes is
/// not an error.
pub fn read_indexes(base_path: &Path, fields: &[FieldDescriptor]) -> Result<Vec<IndexEntry>> {
    let path = base_path.with_extension("gdbindexes");
    if !path.exists() {
        return Ok(Vec::new());
    }
    let file = File::open(&path)?;
    let mut cursor = ByteCursor::new(BufReader::new(file));

    let num = cursor.read_i32()?;
    let mut entries = Vec::with_capacity(num.max(0) as usize);
    for _ in 0..num {
        let name_len = cursor.read_i32()? as usize;
        let name = cursor.read_utf16(name_len)?;
        let _h1 = cursor.read_i16()?;
        let _h2 = cursor.read_i32()?;
        let _h3 = cursor.read_i16()?;
        let _h4 = cursor.read_i32()?;
        let field_len = cursor.read_i32()? as usize;
        let field_name = cursor.read_utf16(field_len)?;
        let _h5 = cursor.read_i16()?;

        let kind = classify(&field_name, fields);
        entries.push(IndexEntry { name, field_name, kind });
    }
    Ok(entries)
}

fn classify(field_name: &str, fields: &[FieldDescriptor]) -> IndexKind {
    use crate::field::FieldType;

    match fields.iter().find(|f| f.name.eq_ignore_ascii_case(field_name)) {
        Some(field) if field.field_type == FieldType::ObjectId => IndexKind::PrimaryIndex,
        Some(field) if field.field_type == FieldType::Geometry => IndexKind::SpatialIndex,
        _ => IndexKind::AttributeIndex,
    }
}
