//! Opening a `.gdbtable`/`.gdbtablx` pair and reading rows out of it.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use log::warn;

use crate::block_map::BlockMap;
use crate::cursor::ByteCursor;
use crate::field::{read_field_descriptor, FieldDescriptor};
use crate::geometry::ShapeKind;
use crate::index::{self, IndexEntry};
use crate::row::{self, Row};
use crate::{Error, Result};

/// The on-disk format generation of a table file: governs OID width and a handful of header
/// field widths. Does not affect row or geometry encoding, which are shared.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TableVersion {
    /// 32-bit object IDs.
    V3,
    /// 64-bit object IDs.
    V4,
}

/// A read-only handle on one table's data (`.gdbtable`) and row-offset index (`.gdbtablx`)
/// files.
pub struct TableFile {
    data: ByteCursor<BufReader<File>>,
    index: ByteCursor<BufReader<File>>,
    version: TableVersion,
    offset_size: usize,
    block_map: Option<BlockMap>,
    max_oid: u64,
    row_count: u64,
    fields: Arc<Vec<FieldDescriptor>>,
    indexes: Arc<Vec<IndexEntry>>,
    geometry_type: ShapeKind,
    has_z: bool,
    has_m: bool,
    schema_version: i32,
}

impl TableFile {
    /// Opens the `{base_name}.gdbtable` / `.gdbtablx` pair in `dir`, reading both headers
    /// eagerly.
    pub fn open(base_name: &str, dir: &Path) -> Result<TableFile> {
        if base_name.is_empty() || !base_name.is_ascii() {
            return Err(Error::InvalidArgument(format!("malformed table base name: {}", base_name)));
        }

        let data_path = dir.join(format!("{}.gdbtable", base_name));
        let index_path = dir.join(format!("{}.gdbtablx", base_name));

        let data_file = File::open(&data_path).map_err(|err| match err.kind() {
            std::io::ErrorKind::NotFound => Error::NotFound(data_path.display().to_string()),
            _ => Error::Io(err),
        })?;
        let index_file = File::open(&index_path).map_err(|err| match err.kind() {
            std::io::ErrorKind::NotFound => Error::NotFound(index_path.display().to_string()),
            _ => Error::Io(err),
        })?;

        let mut index = ByteCursor::new(BufReader::new(index_file));
        let (version, offset_size, block_map, max_oid) = read_index_header(&mut index)?;

        let mut data = ByteCursor::new(BufReader::new(data_file));
        let (row_count, fields_offset) = read_data_header(&mut data, version)?;

        data.seek(fields_offset)?;
        let (fields, geometry_type, has_z, has_m, schema_version) = read_fields_section(&mut data)?;

        let indexes = index::read_indexes(&dir.join(base_name), &fields)?;

        Ok(TableFile {
            data,
            index,
            version,
            offset_size,
            block_map,
            max_oid,
            row_count,
            fields: Arc::new(fields),
            indexes: Arc::new(indexes),
            geometry_type,
            has_z,
            has_m,
            schema_version,
        })
    }

    /// The table's field schema, in declaration order.
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// The table's secondary indexes, if any.
    pub fn indexes(&self) -> &[IndexEntry] {
        &self.indexes
    }

    /// The number of non-deleted rows.
    pub fn row_count(&self) -> u64 {
        self.row_count
    }

    /// The highest object ID ever assigned in this table, including tombstoned rows.
    pub fn max_oid(&self) -> u64 {
        self.max_oid
    }

    /// The table's geometry type, or [ShapeKind::Null] for a non-spatial table.
    pub fn geometry_type(&self) -> ShapeKind {
        self.geometry_type
    }

    /// Whether the table-level flags declare a Z channel.
    pub fn has_z(&self) -> bool {
        self.has_z
    }

    /// Whether the table-level flags declare an M channel.
    pub fn has_m(&self) -> bool {
        self.has_m
    }

    /// The table's on-disk format generation.
    pub fn version(&self) -> TableVersion {
        self.version
    }

    /// The fields-section schema version (`3`, `4`, or `6`), read from the table's data header.
    ///
    /// `6` marks a table whose schema supports 64-bit object IDs up to `2^63 - 1`; it can appear
    /// alongside either [TableVersion].
    pub fn schema_version(&self) -> i32 {
        self.schema_version
    }

    /// Resolves a 1-based object ID to its byte offset in the data file.
    ///
    /// Returns `Ok(None)` for a tombstoned row, an OID above [Self::max_oid], or (per a block
    /// map) a dropped 1k-row block — every case the format calls "no such row" rather than an
    /// error.
    fn resolve_offset(&mut self, oid: i64) -> Result<Option<u64>> {
        if oid <= 0 {
            return Err(Error::InvalidArgument(format!("object id must be positive, got {}", oid)));
        }
        let oid0 = (oid - 1) as u64;
        if oid0 >= self.max_oid {
            return Ok(None);
        }
        let block = (oid0 / 1024) as usize;
        let in_block = oid0 % 1024;

        let slot = match &self.block_map {
            Some(map) => match map.resolve(block) {
                Some(slot) => slot as u64,
                None => return Ok(None),
            },
            None => block as u64,
        };

        let pos = 16 + self.offset_size as u64 * (slot * 1024 + in_block);
        self.index.seek(pos)?;
        let raw = self.index.read_uint_n(self.offset_size)?;
        if raw == 0 {
            Ok(None)
        } else {
            Ok(Some(raw))
        }
    }

    /// Reads and fully decodes one row.
    ///
    /// Returns `Ok(None)` for a deleted row or an out-of-range OID; this is not an error.
    pub fn read_row(&mut self, oid: i64) -> Result<Option<Row>> {
        let offset = match self.resolve_offset(oid)? {
            Some(offset) => offset,
            None => return Ok(None),
        };
        self.data.seek(offset)?;
        let row_size = u64::from(self.data.read_u32()?);
        let row = row::decode_row(&mut self.data, &self.fields, oid, row_size)?;
        Ok(Some(row))
    }

    /// Reads a row's raw, undecoded bytes, optionally filling a caller-supplied buffer.
    ///
    /// Returns the row's byte length, or `0` for a deleted row or out-of-range OID.
    pub fn read_row_bytes(&mut self, oid: i64, buf: Option<&mut Vec<u8>>) -> Result<usize> {
        let offset = match self.resolve_offset(oid)? {
            Some(offset) => offset,
            None => return Ok(0),
        };
        self.data.seek(offset)?;
        let row_size = self.data.read_u32()? as usize;
        match buf {
            Some(buf) => {
                buf.resize(row_size, 0);
                self.data.read_bytes_into(buf)?;
            }
            None => self.data.skip(row_size as u64)?,
        }
        Ok(row_size)
    }

    /// Returns a lazy iterator over every non-deleted row, in ascending OID order.
    ///
    /// `where_clause` and `extent` are accepted for forward compatibility; a non-`None` value of
    /// either is rejected with [Error::UnsupportedFeature].
    pub fn read_rows(
        &mut self,
        where_clause: Option<&str>,
        extent: Option<(f64, f64, f64, f64)>,
    ) -> Result<RowIter<'_>> {
        if where_clause.is_some() || extent.is_some() {
            return Err(Error::UnsupportedFeature(
                "row filtering by where-clause or extent is not implemented".to_string(),
            ));
        }
        Ok(RowIter { table: self, next_oid: 1 })
    }
}

/// A lazy, forward-only cursor over a table's non-deleted rows.
pub struct RowIter<'a> {
    table: &'a mut TableFile,
    next_oid: i64,
}

impl Iterator for RowIter<'_> {
    type Item = Result<(i64, Row)>;

    fn next(&mut self) -> Option<Self::Item> {
        while (self.next_oid as u64) <= self.table.max_oid {
            let oid = self.next_oid;
            self.next_oid += 1;
            match self.table.read_row(oid) {
                Ok(Some(row)) => return Some(Ok((oid, row))),
                Ok(None) => continue,
                Err(err) => return Some(Err(err)),
            }
        }
        None
    }
}

fn read_index_header<R: std::io::Read + std::io::Seek>(
    cursor: &mut ByteCursor<R>,
) -> Result<(TableVersion, usize, Option<BlockMap>, u64)> {
    let version_code = cursor.read_u32()?;
    match version_code {
        3 => {
            let num_1k_blocks = cursor.read_u32()?;
            let num_rows = cursor.read_u32()?;
            let offset_size = cursor.read_u32()? as usize;
            if !(4..=6).contains(&offset_size) {
                return Err(Error::FormatError(format!("illegal offset_size: {}", offset_size)));
            }

            let block_map = if num_1k_blocks > 0 {
                let trailer_pos = 16 + 1024u64 * u64::from(num_1k_blocks) * offset_size as u64;
                cursor.seek(trailer_pos)?;
                let bitmap_u32_words = cursor.read_u32()?;
                let bits_for_blockmap = cursor.read_u32()?;
                let _num_1k_blocks_bis = cursor.read_u32()?;
                let _leading_non_zero_words = cursor.read_u32()?;
                BlockMap::read(cursor, bitmap_u32_words, bits_for_blockmap, num_1k_blocks)?
            } else {
                None
            };

            Ok((TableVersion::V3, offset_size, block_map, u64::from(num_rows)))
        }
        4 => {
            let num_1k_blocks = cursor.read_u32()?;
            let _unknown1 = cursor.read_u32()?;
            let offset_size = cursor.read_u32()? as usize;
            if !(4..=8).contains(&offset_size) {
                return Err(Error::FormatError(format!("illegal offset_size: {}", offset_size)));
            }

            let trailer_pos = 16 + 1024u64 * u64::from(num_1k_blocks) * offset_size as u64;
            cursor.seek(trailer_pos)?;
            let num_rows = cursor.read_u64()?;
            let section_bytes = cursor.read_u32()?;
            if section_bytes > 0 {
                return Err(Error::UnsupportedFeature(
                    "sparse v4 index layout is not supported".to_string(),
                ));
            }

            Ok((TableVersion::V4, offset_size, None, num_rows))
        }
        other => Err(Error::FormatError(format!("unrecognized index format version: {}", other))),
    }
}

fn read_data_header<R: std::io::Read + std::io::Seek>(
    cursor: &mut ByteCursor<R>,
    version: TableVersion,
) -> Result<(u64, u64)> {
    let row_count = match version {
        TableVersion::V3 => {
            let _magic = cursor.read_u32()?;
            let row_count = cursor.read_u32()?;
            let _max_entry_size = cursor.read_u32()?;
            let _r1 = cursor.read_u32()?;
            let _r2 = cursor.read_u32()?;
            let _r3 = cursor.read_u32()?;
            u64::from(row_count)
        }
        TableVersion::V4 => {
            let _r1 = cursor.read_u32()?;
            let _r2 = cursor.read_u32()?;
            let _max_entry_size = cursor.read_u32()?;
            let _r3 = cursor.read_u32()?;
            cursor.read_u64()?
        }
    };
    let _file_size = cursor.read_u64()?;
    let fields_offset = cursor.read_u64()?;
    Ok((row_count, fields_offset))
}

fn read_fields_section<R: std::io::Read + std::io::Seek>(
    cursor: &mut ByteCursor<R>,
) -> Result<(Vec<FieldDescriptor>, ShapeKind, bool, bool, i32)> {
    let _header_size = cursor.read_i32()?;
    let version = cursor.read_i32()?;
    if ![3, 4, 6].contains(&version) {
        return Err(Error::FormatError(format!("unrecognized fields section version: {}", version)));
    }
    let flags = cursor.read_u32()?;
    let field_count = cursor.read_i16()?;
    if field_count < 0 {
        return Err(Error::FormatError("negative field_count".to_string()));
    }

    let geometry_type = ShapeKind::from_basic_type_code((flags & 0xff) as u8)?;
    let has_m = flags & (1 << 30) != 0;
    let has_z = flags & (1 << 31) != 0;

    let mut fields = Vec::with_capacity(field_count as usize);
    for _ in 0..field_count {
        fields.push(read_field_descriptor(cursor, has_z, has_m)?);
    }

    if fields.iter().filter(|f| f.field_type == crate::field::FieldType::ObjectId).count() > 1 {
        warn!("table declares more than one ObjectID field");
    }

    Ok((fields, geometry_type, has_z, has_m, version))
}
