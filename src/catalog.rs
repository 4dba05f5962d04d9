//! The geodatabase-level catalog: enumerating and opening tables by id or name.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::table::TableFile;
use crate::value::Value;
use crate::{Error, Result};

/// One row of the system catalog table (`a00000001`).
#[derive(Clone, Debug, PartialEq)]
pub struct CatalogEntry {
    /// The table's id; its base file name is `format!("a{:08x}", id)`.
    pub id: i64,
    /// The table's name, as declared in the catalog.
    pub name: String,
    /// The catalog's `format` column; `0` when absent.
    pub format: i64,
}

impl CatalogEntry {
    /// A system table is any entry whose name starts with the case-insensitive prefix `"GDB_"`.
    pub fn is_system(&self) -> bool {
        self.name.len() >= 4 && self.name[..4].eq_ignore_ascii_case("GDB_")
    }
}

/// A handle on an opened file geodatabase directory.
pub struct Geodatabase {
    dir: PathBuf,
    catalog: Vec<CatalogEntry>,
    open_tables: HashMap<i64, TableFile>,
}

impl Geodatabase {
    /// Opens the geodatabase directory and reads its system catalog (table 1).
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Geodatabase> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(Error::NotFound(dir.display().to_string()));
        }

        let mut catalog_table = TableFile::open("a00000001", dir)?;
        let mut catalog = Vec::new();
        for entry in catalog_table.read_rows(None, None)? {
            let (oid, row) = entry?;
            let name = match row.get(1) {
                Some(Value::String(name)) => name.clone(),
                _ => return Err(Error::FormatError(format!("catalog row {} has a null or non-text name", oid))),
            };
            let format = match row.get(2) {
                Some(Value::Int16(v)) => i64::from(*v),
                Some(Value::Int32(v)) => i64::from(*v),
                Some(Value::Int64(v)) => *v,
                _ => 0,
            };
            catalog.push(CatalogEntry { id: oid, name, format });
        }

        Ok(Geodatabase { dir: dir.to_path_buf(), catalog, open_tables: HashMap::new() })
    }

    /// The catalog entries, in the order they were read from the system catalog table.
    pub fn catalog(&self) -> &[CatalogEntry] {
        &self.catalog
    }

    /// Opens (or returns the already-open handle for) the table with the given id.
    pub fn open_table(&mut self, id: i64) -> Result<&mut TableFile> {
        if !self.open_tables.contains_key(&id) {
            let base_name = format!("a{:08x}", id);
            let table = TableFile::open(&base_name, &self.dir)?;
            self.open_tables.insert(id, table);
        }
        Ok(self.open_tables.get_mut(&id).expect("just inserted"))
    }

    /// Opens (or returns the already-open handle for) the table with the given name.
    ///
    /// Tries a case-sensitive exact match first, then falls back to a case-insensitive match.
    pub fn open_table_by_name(&mut self, name: &str) -> Result<&mut TableFile> {
        let id = self
            .catalog
            .iter()
            .find(|e| e.name == name)
            .or_else(|| self.catalog.iter().find(|e| e.name.eq_ignore_ascii_case(name)))
            .map(|e| e.id)
            .ok_or_else(|| Error::NotFound(format!("no table named '{}'", name)))?;
        self.open_table(id)
    }

    /// Closes every table opened through this handle.
    pub fn close(&mut self) {
        self.open_tables.clear();
    }
}
