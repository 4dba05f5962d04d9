//! Field descriptors: the schema parsed from a table's fields section.

use crate::cursor::ByteCursor;
use crate::geometry::Quantization;
use crate::{Error, Result};
use std::io::{Read, Seek};

/// The fixed set of on-disk field types.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldType {
    #[allow(missing_docs)]
    Int16,
    #[allow(missing_docs)]
    Int32,
    #[allow(missing_docs)]
    Single,
    #[allow(missing_docs)]
    Double,
    #[allow(missing_docs)]
    String,
    #[allow(missing_docs)]
    DateTime,
    #[allow(missing_docs)]
    ObjectId,
    #[allow(missing_docs)]
    Geometry,
    #[allow(missing_docs)]
    Blob,
    #[allow(missing_docs)]
    Raster,
    #[allow(missing_docs)]
    Guid,
    #[allow(missing_docs)]
    GlobalId,
    #[allow(missing_docs)]
    Xml,
    #[allow(missing_docs)]
    Int64,
    #[allow(missing_docs)]
    DateOnly,
    #[allow(missing_docs)]
    TimeOnly,
    #[allow(missing_docs)]
    DateTimeOffset,
}

impl TryFrom<u8> for FieldType {
    type Error = Error;

    fn try_from(code: u8) -> Result<FieldType> {
        match code {
            0 => Ok(FieldType::Int16),
            1 => Ok(FieldType::Int32),
            2 => Ok(FieldType::Single),
            3 => Ok(FieldType::Double),
            4 => Ok(FieldType::String),
            5 => Ok(FieldType::DateTime),
            6 => Ok(FieldType::ObjectId),
            7 => Ok(FieldType::Geometry),
            8 => Ok(FieldType::Blob),
            9 => Ok(FieldType::Raster),
            10 => Ok(FieldType::Guid),
            11 => Ok(FieldType::GlobalId),
            12 => Ok(FieldType::Xml),
            13 => Ok(FieldType::Int64),
            14 => Ok(FieldType::DateOnly),
            15 => Ok(FieldType::TimeOnly),
            16 => Ok(FieldType::DateTimeOffset),
            other => Err(Error::FormatError(format!("unknown field type code: {}", other))),
        }
    }
}

impl FieldType {
    /// Whether this type's values are decoded from a `len: var_uint` prefix (as opposed to a
    /// fixed or descriptor-sized width).
    pub fn is_length_prefixed(self) -> bool {
        matches!(self, FieldType::String | FieldType::Xml | FieldType::Blob | FieldType::Geometry)
    }
}

/// A default value decoded from a field descriptor, using the same rules as row values.
pub type DefaultValue = crate::value::Value;

/// The quantization, tolerance, and extent parameters carried by a Geometry field's descriptor.
#[derive(Clone, Debug, PartialEq)]
pub struct GeometryDef {
    /// The field's well-known-text spatial reference, if present.
    pub wkt: String,
    #[allow(missing_docs)]
    pub x_origin: f64,
    #[allow(missing_docs)]
    pub y_origin: f64,
    #[allow(missing_docs)]
    pub xy_scale: f64,
    #[allow(missing_docs)]
    pub m_origin: Option<f64>,
    #[allow(missing_docs)]
    pub m_scale: Option<f64>,
    #[allow(missing_docs)]
    pub z_origin: Option<f64>,
    #[allow(missing_docs)]
    pub z_scale: Option<f64>,
    #[allow(missing_docs)]
    pub xy_tolerance: f64,
    #[allow(missing_docs)]
    pub m_tolerance: Option<f64>,
    #[allow(missing_docs)]
    pub z_tolerance: Option<f64>,
    /// `(xmin, ymin, xmax, ymax)`.
    pub extent: Extent,
    /// Grid cell sizes; 1 to 3 entries.
    pub grid_sizes: Vec<f64>,
}

impl GeometryDef {
    /// The per-field quantization parameters, for use with [crate::geometry::ShapeBuffer::decode].
    pub fn quantization(&self) -> Quantization {
        Quantization {
            x_origin: self.x_origin,
            y_origin: self.y_origin,
            xy_scale: self.xy_scale,
            z_origin: self.z_origin.unwrap_or(0.0),
            z_scale: self.z_scale.unwrap_or(1.0),
            m_origin: self.m_origin.unwrap_or(0.0),
            m_scale: self.m_scale.unwrap_or(1.0),
        }
    }
}

/// A 2D extent, optionally extended with Z and/or M ranges.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Extent {
    #[allow(missing_docs)]
    pub xmin: f64,
    #[allow(missing_docs)]
    pub ymin: f64,
    #[allow(missing_docs)]
    pub xmax: f64,
    #[allow(missing_docs)]
    pub ymax: f64,
    /// `(zmin, zmax)`, when the geometry field has a Z channel.
    pub z: Option<(f64, f64)>,
    /// `(mmin, mmax)`, when the geometry field has an M channel.
    pub m: Option<(f64, f64)>,
}

/// The raster-column and quantization parameters carried by a Raster field's descriptor.
///
/// Recognized so that field descriptors for Raster-bearing tables can still be parsed; the
/// raster payload itself is never decoded (see [crate::Error::UnsupportedFeature]).
#[derive(Clone, Debug, PartialEq)]
pub struct RasterDef {
    #[allow(missing_docs)]
    pub column_name: String,
    #[allow(missing_docs)]
    pub wkt: String,
    #[allow(missing_docs)]
    pub raster_type: u8,
}

/// A single field's schema, decoded from the fields section.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldDescriptor {
    #[allow(missing_docs)]
    pub name: String,
    #[allow(missing_docs)]
    pub alias: String,
    #[allow(missing_docs)]
    pub field_type: FieldType,
    #[allow(missing_docs)]
    pub nullable: bool,
    #[allow(missing_docs)]
    pub required: bool,
    #[allow(missing_docs)]
    pub editable: bool,
    #[allow(missing_docs)]
    pub size: i64,
    /// The raw, undecoded flags byte this descriptor carried.
    pub raw_flag_byte: u8,
    #[allow(missing_docs)]
    pub default_value: Option<DefaultValue>,
    #[allow(missing_docs)]
    pub geometry_def: Option<GeometryDef>,
    #[allow(missing_docs)]
    pub raster_def: Option<RasterDef>,
}

fn flags_from_byte(byte: u8) -> (bool, bool, bool) {
    (byte & 0b001 != 0, byte & 0b010 != 0, byte & 0b100 != 0)
}

/// Parses a single field descriptor, including its type-specific payload.
///
/// `table_has_z` / `table_has_m` come from the fields-section header flags and gate the
/// Geometry field's extent layout (the per-field geometry flags separately gate its own
/// quantization channels).
pub(crate) fn read_field_descriptor<R: Read + Seek>(
    cursor: &mut ByteCursor<R>,
    table_has_z: bool,
    table_has_m: bool,
) -> Result<FieldDescriptor> {
    let name_len = cursor.read_u8()? as usize;
    let name = cursor.read_utf16(name_len)?;
    let alias_len = cursor.read_u8()? as usize;
    let alias = cursor.read_utf16(alias_len)?;
    let type_code = cursor.read_u8()?;
    let field_type = FieldType::try_from(type_code)?;

    let mut size: i64 = 0;
    let mut raw_flag_byte: u8 = 0;
    let mut default_value = None;
    let mut geometry_def = None;
    let mut raster_def = None;

    match field_type {
        FieldType::ObjectId => {
            size = cursor.read_u8()? as i64;
            raw_flag_byte = cursor.read_u8()?;
        }
        FieldType::Geometry => {
            size = cursor.read_u8()? as i64;
            raw_flag_byte = cursor.read_u8()?;
            let wkt_len = cursor.read_i16()? as usize;
            let wkt = cursor.read_utf16(wkt_len / 2)?;
            let geom_flags = cursor.read_u8()?;
            let has_m_channel = geom_flags & 0b10 != 0;
            let has_z_channel = geom_flags & 0b100 != 0;

            let x_origin = cursor.read_f64()?;
            let y_origin = cursor.read_f64()?;
            let xy_scale = cursor.read_f64()?;
            let (m_origin, m_scale) = if has_m_channel {
                (Some(cursor.read_f64()?), Some(cursor.read_f64()?))
            } else {
                (None, None)
            };
            let (z_origin, z_scale) = if has_z_channel {
                (Some(cursor.read_f64()?), Some(cursor.read_f64()?))
            } else {
                (None, None)
            };
            let xy_tolerance = cursor.read_f64()?;
            let m_tolerance = if has_m_channel { Some(cursor.read_f64()?) } else { None };
            let z_tolerance = if has_z_channel { Some(cursor.read_f64()?) } else { None };

            let xmin = cursor.read_f64()?;
            let ymin = cursor.read_f64()?;
            let xmax = cursor.read_f64()?;
            let ymax = cursor.read_f64()?;
            let z = if table_has_z {
                Some((cursor.read_f64()?, cursor.read_f64()?))
            } else {
                None
            };
            let m = if table_has_m {
                Some((cursor.read_f64()?, cursor.read_f64()?))
            } else {
                None
            };
            let extent = Extent { xmin, ymin, xmax, ymax, z, m };

            let reserved = cursor.read_u8()?;
            if reserved != 0 {
                return Err(Error::FormatError(
                    "reserved byte in geometry field descriptor is non-zero".to_string(),
                ));
            }
            let grid_count = cursor.read_i32()?;
            if !(1..=3).contains(&grid_count) {
                return Err(Error::FormatError(format!("invalid grid_count: {}", grid_count)));
            }
            let grid_sizes = (0..grid_count).map(|_| cursor.read_f64()).collect::<Result<Vec<_>>>()?;

            geometry_def = Some(GeometryDef {
                wkt,
                x_origin,
                y_origin,
                xy_scale,
                m_origin,
                m_scale,
                z_origin,
                z_scale,
                xy_tolerance,
                m_tolerance,
                z_tolerance,
                extent,
                grid_sizes,
            });
        }
        FieldType::String => {
            size = cursor.read_i32()? as i64;
            raw_flag_byte = cursor.read_u8()?;
            let default_len = cursor.read_var_uint()? as usize;
            if raw_flag_byte & 0b100 != 0 && default_len > 0 {
                default_value = Some(DefaultValue::String(cursor.read_utf8(default_len)?));
            }
        }
        FieldType::Blob | FieldType::Xml => {
            size = cursor.read_u8()? as i64;
            raw_flag_byte = cursor.read_u8()?;
        }
        FieldType::Guid | FieldType::GlobalId => {
            size = cursor.read_u8()? as i64;
            raw_flag_byte = cursor.read_u8()?;
        }
        FieldType::Raster => {
            size = cursor.read_u8()? as i64;
            raw_flag_byte = cursor.read_u8()?;
            let col_name_len = cursor.read_u8()? as usize;
            let column_name = cursor.read_utf16(col_name_len)?;
            let wkt_len = cursor.read_i16()? as usize;
            let wkt = cursor.read_utf16(wkt_len / 2)?;
            let magic = cursor.read_u8()?;
            if magic == 5 || magic == 7 {
                let _z_origin = cursor.read_f64()?;
                let _z_scale = cursor.read_f64()?;
                if magic == 7 {
                    let _m_origin = cursor.read_f64()?;
                    let _m_scale = cursor.read_f64()?;
                }
            }
            let raster_type = cursor.read_u8()?;
            if !(0..=2).contains(&raster_type) {
                return Err(Error::FormatError(format!("invalid raster_type: {}", raster_type)));
            }
            raster_def = Some(RasterDef { column_name, wkt, raster_type });
        }
        FieldType::Int16
        | FieldType::Int32
        | FieldType::Single
        | FieldType::Double
        | FieldType::DateTime
        | FieldType::Int64
        | FieldType::DateOnly
        | FieldType::TimeOnly
        | FieldType::DateTimeOffset => {
            size = cursor.read_u8()? as i64;
            raw_flag_byte = cursor.read_u8()?;
            let default_len = cursor.read_u8()? as usize;
            if raw_flag_byte & 0b100 != 0 && default_len > 0 {
                default_value = Some(read_numeric_default(cursor, field_type, default_len)?);
            }
        }
    }

    let (nullable, required, editable) = flags_from_byte(raw_flag_byte);

    Ok(FieldDescriptor {
        name,
        alias,
        field_type,
        nullable,
        required,
        editable,
        size,
        raw_flag_byte,
        default_value,
        geometry_def,
        raster_def,
    })
}

fn read_numeric_default<R: Read + Seek>(
    cursor: &mut ByteCursor<R>,
    field_type: FieldType,
    default_len: usize,
) -> Result<DefaultValue> {
    use crate::datetime;
    use crate::value::Value;

    match field_type {
        FieldType::Int16 => Ok(Value::Int16(cursor.read_i16()?)),
        FieldType::Int32 => Ok(Value::Int32(cursor.read_i32()?)),
        FieldType::Int64 => Ok(Value::Int64(cursor.read_i64()?)),
        FieldType::Single => Ok(Value::Single(cursor.read_f32()?)),
        FieldType::Double => Ok(Value::Double(cursor.read_f64()?)),
        FieldType::DateTime => Ok(Value::DateTime(datetime::days_to_datetime(cursor.read_f64()?))),
        FieldType::DateOnly => Ok(Value::DateOnly(datetime::days_to_date(cursor.read_f64()?))),
        FieldType::TimeOnly => Ok(Value::TimeOnly(datetime::fraction_to_time(cursor.read_f64()?))),
        FieldType::DateTimeOffset => {
            let days = cursor.read_f64()?;
            let offset_minutes = cursor.read_i16()?;
            Ok(Value::DateTimeOffset(datetime::days_to_datetime_offset(days, offset_minutes)))
        }
        other => Err(Error::FormatError(format!(
            "field type {:?} does not carry a numeric default (default_len={})",
            other, default_len
        ))),
    }
}
