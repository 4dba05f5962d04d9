//! A read-only reader for the Esri File Geodatabase (FGDB) format.
//!
//! ```text
//! let mut gdb = fgdb::Geodatabase::open("MyData.gdb")?;
//! for entry in gdb.catalog() {
//!     println!("{}: {}", entry.id, entry.name);
//! }
//! let table = gdb.open_table_by_name("Point1")?;
//! if let Some(row) = table.read_row(1)? {
//!     println!("{:?}", row);
//! }
//! ```
//!
//! The crate has no write path: every type here is built to decode bytes already on disk, never
//! to produce them.

mod block_map;
mod catalog;
mod cursor;
mod datetime;
mod error;
mod field;
pub mod geometry;
mod index;
mod row;
mod table;
mod value;

pub use catalog::{CatalogEntry, Geodatabase};
pub use error::{Error, Result};
pub use field::{DefaultValue, Extent, FieldDescriptor, FieldType, GeometryDef, RasterDef};
pub use geometry::{BoxShape, MultipointShape, PointShape, PolygonShape, PolylineShape, Quantization, SegmentModifier, Shape, ShapeBuffer, ShapeKind};
pub use index::{IndexEntry, IndexKind};
pub use row::Row;
pub use table::{RowIter, TableFile, TableVersion};
pub use value::Value;
