//! The decoded value of a single field.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use uuid::Uuid;

use crate::geometry::ShapeBuffer;

/// A single decoded field value.
///
/// [Value::Null] covers every nullable field type; which variant a non-null field decodes to is
/// determined entirely by that field's [crate::field::FieldType].
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// The field was null.
    Null,
    /// `FieldType::Int16`.
    Int16(i16),
    /// `FieldType::Int32`.
    Int32(i32),
    /// `FieldType::Int64`.
    Int64(i64),
    /// `FieldType::Single`.
    Single(f32),
    /// `FieldType::Double`.
    Double(f64),
    /// `FieldType::String` or `FieldType::XML`.
    String(String),
    /// `FieldType::DateTime`.
    DateTime(NaiveDateTime),
    /// `FieldType::DateOnly`.
    DateOnly(NaiveDate),
    /// `FieldType::TimeOnly`.
    TimeOnly(NaiveTime),
    /// `FieldType::DateTimeOffset`.
    DateTimeOffset(DateTime<FixedOffset>),
    /// `FieldType::ObjectID`. Not read from the row blob; equal to the queried OID.
    ObjectId(i64),
    /// `FieldType::Geometry`.
    Geometry(ShapeBuffer),
    /// `FieldType::Blob`.
    Blob(Vec<u8>),
    /// `FieldType::GUID` or `FieldType::GlobalID`.
    Guid(Uuid),
}

impl Value {
    /// Returns `true` if this value is [Value::Null].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}
