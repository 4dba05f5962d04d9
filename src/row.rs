//! Decoding a single row blob into a vector of values, in field declaration order.

use std::io::{Read, Seek};

use log::debug;
use uuid::Uuid;

use crate::cursor::ByteCursor;
use crate::datetime;
use crate::field::{FieldDescriptor, FieldType};
use crate::geometry::ShapeBuffer;
use crate::value::Value;
use crate::{Error, Result};

/// A decoded row: one [Value] per field, in the table's field declaration order.
pub type Row = Vec<Value>;

/// Decodes a row blob (the bytes immediately following the `row_size: u32` prefix) into a [Row].
///
/// `oid` supplies the ObjectID field's value (never read from the blob itself). Tolerates a
/// known anomaly where a handful of trailing bytes in `blob` go unread; logs rather than errors.
pub fn decode_row<R: Read + Seek>(
    cursor: &mut ByteCursor<R>,
    fields: &[FieldDescriptor],
    oid: i64,
    row_len: u64,
) -> Result<Row> {
    let start = cursor.position()?;
    let nullable_count = fields.iter().filter(|f| f.nullable).count();
    let null_flags = if nullable_count > 0 {
        cursor.read_bytes(nullable_count.div_ceil(8))?
    } else {
        Vec::new()
    };

    let mut values = Vec::with_capacity(fields.len());
    let mut nullable_index = 0usize;
    for field in fields {
        let is_null = if field.nullable {
            let byte = null_flags[nullable_index / 8];
            let bit_set = byte & (1 << (nullable_index % 8)) != 0;
            nullable_index += 1;
            bit_set
        } else {
            false
        };

        if is_null {
            values.push(Value::Null);
            continue;
        }

        values.push(decode_field_value(cursor, field, oid)?);
    }

    let consumed = cursor.position()? - start;
    if consumed < row_len {
        debug!(
            "row for oid {} left {} trailing bytes unread (row_size={})",
            oid,
            row_len - consumed,
            row_len
        );
    } else if consumed > row_len {
        return Err(Error::FormatError(format!(
            "row for oid {} overran its declared size (consumed {}, row_size {})",
            oid, consumed, row_len
        )));
    }

    Ok(values)
}

fn decode_field_value<R: Read + Seek>(
    cursor: &mut ByteCursor<R>,
    field: &FieldDescriptor,
    oid: i64,
) -> Result<Value> {
    match field.field_type {
        FieldType::Int16 => Ok(Value::Int16(cursor.read_i16()?)),
        FieldType::Int32 => Ok(Value::Int32(cursor.read_i32()?)),
        FieldType::Int64 => Ok(Value::Int64(cursor.read_i64()?)),
        FieldType::Single => Ok(Value::Single(cursor.read_f32()?)),
        FieldType::Double => Ok(Value::Double(cursor.read_f64()?)),
        FieldType::String | FieldType::Xml => {
            let len = cursor.read_var_uint()? as usize;
            Ok(Value::String(cursor.read_utf8(len)?))
        }
        FieldType::DateTime => Ok(Value::DateTime(datetime::days_to_datetime(cursor.read_f64()?))),
        FieldType::DateOnly => Ok(Value::DateOnly(datetime::days_to_date(cursor.read_f64()?))),
        FieldType::TimeOnly => Ok(Value::TimeOnly(datetime::fraction_to_time(cursor.read_f64()?))),
        FieldType::DateTimeOffset => {
            let days = cursor.read_f64()?;
            let offset_minutes = cursor.read_i16()?;
            Ok(Value::DateTimeOffset(datetime::days_to_datetime_offset(days, offset_minutes)))
        }
        FieldType::ObjectId => Ok(Value::ObjectId(oid)),
        FieldType::Geometry => {
            let len = cursor.read_var_uint()? as usize;
            let bytes = cursor.read_bytes(len)?;
            let quantization = field
                .geometry_def
                .as_ref()
                .map(|def| def.quantization())
                .unwrap_or_default();
            Ok(Value::Geometry(ShapeBuffer::decode(&bytes, &quantization)?))
        }
        FieldType::Blob => {
            let len = cursor.read_var_uint()? as usize;
            Ok(Value::Blob(cursor.read_bytes(len)?))
        }
        FieldType::Guid | FieldType::GlobalId => {
            let bytes = cursor.read_bytes(16)?;
            Ok(Value::Guid(decode_guid(&bytes)?))
        }
        FieldType::Raster => Err(Error::UnsupportedFeature(format!(
            "raster field '{}' decoding is not implemented",
            field.name
        ))),
    }
}

/// Re-orders the on-disk GUID byte layout (`b3 b2 b1 b0  b5 b4  b7 b6  b8..b15`) into the
/// canonical `{u32_le, u16_le, u16_le, [u8;8]}` layout and parses it.
fn decode_guid(bytes: &[u8]) -> Result<Uuid> {
    if bytes.len() != 16 {
        return Err(Error::FormatError(format!("GUID payload must be 16 bytes, got {}", bytes.len())));
    }
    let d1 = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    let d2 = u16::from_le_bytes([bytes[4], bytes[5]]);
    let d3 = u16::from_le_bytes([bytes[6], bytes[7]]);
    let mut d4 = [0u8; 8];
    d4.copy_from_slice(&bytes[8..16]);
    Ok(Uuid::from_fields(d1, d2, d3, &d4))
}
