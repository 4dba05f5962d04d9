//! Shared synthetic `.gdb` directory builder for the end-to-end tests.
//!
//! There are no real fixture files available, so every scenario builds its own minimal
//! `.gdbtable`/`.gdbtablx` pair byte-for-byte, following the same layout the library itself
//! decodes.

use std::path::Path;

const HAS_Z: u32 = 1 << 31;
const HAS_M: u32 = 1 << 30;
const HAS_CURVES: u32 = 1 << 29;

pub struct FieldSpec {
    pub name: &'static str,
    pub type_code: u8,
    pub payload: Vec<u8>,
    pub nullable: bool,
}

fn utf16_name(name: &str) -> Vec<u8> {
    let mut out = vec![name.encode_utf16().count() as u8];
    for unit in name.encode_utf16() {
        out.extend_from_slice(&unit.to_le_bytes());
    }
    out
}

pub fn object_id_field(name: &'static str) -> FieldSpec {
    FieldSpec { name, type_code: 6, payload: vec![4, 0b010], nullable: false }
}

pub fn int32_field(name: &'static str, nullable: bool) -> FieldSpec {
    let flags = if nullable { 0b001 } else { 0b010 };
    FieldSpec { name, type_code: 1, payload: vec![4, flags, 0], nullable }
}

pub fn int64_field(name: &'static str, nullable: bool) -> FieldSpec {
    let flags = if nullable { 0b001 } else { 0b010 };
    FieldSpec { name, type_code: 13, payload: vec![8, flags, 0], nullable }
}

pub fn double_field(name: &'static str, nullable: bool) -> FieldSpec {
    let flags = if nullable { 0b001 } else { 0b010 };
    FieldSpec { name, type_code: 3, payload: vec![8, flags, 0], nullable }
}

pub fn string_field(name: &'static str, nullable: bool) -> FieldSpec {
    let flags = if nullable { 0b001 } else { 0b010 };
    let mut payload = 255i32.to_le_bytes().to_vec();
    payload.push(flags);
    payload.push(0); // default_len = 0
    FieldSpec { name, type_code: 4, payload, nullable }
}

pub fn date_only_field(name: &'static str, nullable: bool) -> FieldSpec {
    let flags = if nullable { 0b001 } else { 0b010 };
    FieldSpec { name, type_code: 14, payload: vec![8, flags, 0], nullable }
}

pub fn time_only_field(name: &'static str, nullable: bool) -> FieldSpec {
    let flags = if nullable { 0b001 } else { 0b010 };
    FieldSpec { name, type_code: 15, payload: vec![8, flags, 0], nullable }
}

pub fn datetime_offset_field(name: &'static str, nullable: bool) -> FieldSpec {
    let flags = if nullable { 0b001 } else { 0b010 };
    FieldSpec { name, type_code: 16, payload: vec![10, flags, 0], nullable }
}

/// A geometry field with no M/Z channel and a unit scale/origin, sufficient for the scenarios
/// that only need round-tripped X/Y.
pub fn geometry_field_xy(name: &'static str, nullable: bool) -> FieldSpec {
    let flags = if nullable { 0b001 } else { 0b010 };
    let mut payload = vec![0u8, flags];
    payload.extend_from_slice(&0i16.to_le_bytes()); // wkt_len = 0
    payload.push(0); // geom_flags: no M, no Z channel
    payload.extend_from_slice(&0f64.to_le_bytes()); // x_origin
    payload.extend_from_slice(&0f64.to_le_bytes()); // y_origin
    payload.extend_from_slice(&100.0f64.to_le_bytes()); // xy_scale
    payload.extend_from_slice(&0.001f64.to_le_bytes()); // xy_tolerance
    payload.extend_from_slice(&0f64.to_le_bytes()); // xmin
    payload.extend_from_slice(&0f64.to_le_bytes()); // ymin
    payload.extend_from_slice(&0f64.to_le_bytes()); // xmax
    payload.extend_from_slice(&0f64.to_le_bytes()); // ymax
    payload.push(0); // reserved
    payload.extend_from_slice(&1i32.to_le_bytes()); // grid_count
    payload.extend_from_slice(&0f64.to_le_bytes()); // grid size
    FieldSpec { name, type_code: 7, payload, nullable }
}

/// A geometry field whose table carries Z and/or M (so its extent payload, and any blob it
/// decodes, may legitimately carry those channels).
pub fn geometry_field_zm(name: &'static str, nullable: bool, has_z: bool, has_m: bool) -> FieldSpec {
    let flags = if nullable { 0b001 } else { 0b010 };
    let mut payload = vec![0u8, flags];
    payload.extend_from_slice(&0i16.to_le_bytes());
    let mut geom_flags = 0u8;
    if has_m {
        geom_flags |= 0b10;
    }
    if has_z {
        geom_flags |= 0b100;
    }
    payload.push(geom_flags);
    payload.extend_from_slice(&0f64.to_le_bytes()); // x_origin
    payload.extend_from_slice(&0f64.to_le_bytes()); // y_origin
    payload.extend_from_slice(&100.0f64.to_le_bytes()); // xy_scale
    if has_m {
        payload.extend_from_slice(&0f64.to_le_bytes());
        payload.extend_from_slice(&100.0f64.to_le_bytes());
    }
    if has_z {
        payload.extend_from_slice(&0f64.to_le_bytes());
        payload.extend_from_slice(&100.0f64.to_le_bytes());
    }
    payload.extend_from_slice(&0.001f64.to_le_bytes()); // xy_tolerance
    if has_m {
        payload.extend_from_slice(&0.001f64.to_le_bytes());
    }
    if has_z {
        payload.extend_from_slice(&0.001f64.to_le_bytes());
    }
    for _ in 0..4 {
        payload.extend_from_slice(&0f64.to_le_bytes()); // xmin,ymin,xmax,ymax
    }
    if has_z {
        payload.extend_from_slice(&0f64.to_le_bytes());
        payload.extend_from_slice(&0f64.to_le_bytes());
    }
    if has_m {
        payload.extend_from_slice(&0f64.to_le_bytes());
        payload.extend_from_slice(&0f64.to_le_bytes());
    }
    payload.push(0); // reserved
    payload.extend_from_slice(&1i32.to_le_bytes());
    payload.extend_from_slice(&0f64.to_le_bytes());
    FieldSpec { name, type_code: 7, payload, nullable }
}

fn encode_field_descriptor(spec: &FieldSpec) -> Vec<u8> {
    let mut out = utf16_name(spec.name);
    out.extend_from_slice(&utf16_name(spec.name)); // alias == name
    out.push(spec.type_code);
    out.extend_from_slice(&spec.payload);
    out
}

/// One field's encoded row value; `None` means null (the field must be `nullable`).
pub enum RowValue {
    Null,
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Double(f64),
    String(String),
    Geometry(Vec<u8>),
    DateOnly(f64),
    TimeOnly(f64),
    DateTimeOffset(f64, i16),
    /// The ObjectID field: consumes no row bytes, present only for alignment with `fields`.
    ObjectId,
}

pub fn encode_row(fields: &[FieldSpec], values: &[RowValue]) -> Vec<u8> {
    assert_eq!(fields.len(), values.len());
    let nullable_count = fields.iter().filter(|f| f.nullable).count();
    let mut null_flags = vec![0u8; nullable_count.div_ceil(8).max(if nullable_count > 0 { 1 } else { 0 })];
    let mut nullable_index = 0usize;
    for (field, value) in fields.iter().zip(values) {
        if field.nullable {
            if matches!(value, RowValue::Null) {
                null_flags[nullable_index / 8] |= 1 << (nullable_index % 8);
            }
            nullable_index += 1;
        }
    }

    let mut out = if nullable_count > 0 { null_flags } else { Vec::new() };
    for value in values {
        match value {
            RowValue::Null | RowValue::ObjectId => {}
            RowValue::Int16(v) => out.extend_from_slice(&v.to_le_bytes()),
            RowValue::Int32(v) => out.extend_from_slice(&v.to_le_bytes()),
            RowValue::Int64(v) => out.extend_from_slice(&v.to_le_bytes()),
            RowValue::Double(v) => out.extend_from_slice(&v.to_le_bytes()),
            RowValue::String(s) => {
                write_var_uint(&mut out, s.len() as u64);
                out.extend_from_slice(s.as_bytes());
            }
            RowValue::Geometry(bytes) => {
                write_var_uint(&mut out, bytes.len() as u64);
                out.extend_from_slice(bytes);
            }
            RowValue::DateOnly(days) => out.extend_from_slice(&days.to_le_bytes()),
            RowValue::TimeOnly(fraction) => out.extend_from_slice(&fraction.to_le_bytes()),
            RowValue::DateTimeOffset(days, offset) => {
                out.extend_from_slice(&days.to_le_bytes());
                out.extend_from_slice(&offset.to_le_bytes());
            }
        }
    }
    out
}

fn zigzag_encode(n: i64) -> u64 {
    ((n << 1) ^ (n >> 63)) as u64
}

fn write_var_uint(out: &mut Vec<u8>, mut value: u64) {
    loop {
        let mut byte = (value & 0x7f) as u8;
        value >>= 7;
        if value != 0 {
            byte |= 0x80;
        }
        out.push(byte);
        if value == 0 {
            break;
        }
    }
}

pub enum Curve {
    CubicBezier { segment_index: i32, cp1x: f64, cp1y: f64, cp2x: f64, cp2y: f64 },
    CircularArc { segment_index: i32, d1: f64, d2: f64, flags: i32 },
}

/// Encodes a single, unquantized point geometry blob (point coordinates are stored as raw
/// `f64`, never delta-encoded).
pub fn encode_point_geometry(x: f64, y: f64) -> Vec<u8> {
    let mut out = 1u32.to_le_bytes().to_vec();
    out.extend_from_slice(&x.to_le_bytes());
    out.extend_from_slice(&y.to_le_bytes());
    out
}

/// Encodes a polyline or polygon geometry blob. `basic_code` selects the shape: `3` for
/// polyline, `5` for polygon.
#[allow(clippy::too_many_arguments)]
pub fn encode_multi_geometry(
    basic_code: u32,
    points: &[(f64, f64)],
    part_start_indices: &[i32],
    z: Option<&[f64]>,
    m: Option<&[f64]>,
    curves: &[Curve],
    xy_scale: f64,
    z_scale: f64,
    m_scale: f64,
) -> Vec<u8> {
    let mut header = basic_code;
    if z.is_some() {
        header |= HAS_Z;
    }
    if m.is_some() {
        header |= HAS_M;
    }
    if !curves.is_empty() {
        header |= HAS_CURVES;
    }
    let mut out = header.to_le_bytes().to_vec();

    if points.is_empty() {
        for _ in 0..4 {
            out.extend_from_slice(&f64::NAN.to_le_bytes());
        }
    } else {
        let (mut xmin, mut xmax) = (f64::INFINITY, f64::NEG_INFINITY);
        let (mut ymin, mut ymax) = (f64::INFINITY, f64::NEG_INFINITY);
        for &(x, y) in points {
            xmin = xmin.min(x);
            xmax = xmax.max(x);
            ymin = ymin.min(y);
            ymax = ymax.max(y);
        }
        out.extend_from_slice(&xmin.to_le_bytes());
        out.extend_from_slice(&ymin.to_le_bytes());
        out.extend_from_slice(&xmax.to_le_bytes());
        out.extend_from_slice(&ymax.to_le_bytes());
    }

    out.extend_from_slice(&(part_start_indices.len() as i32).to_le_bytes());
    out.extend_from_slice(&(points.len() as i32).to_le_bytes());
    for &start in part_start_indices {
        out.extend_from_slice(&start.to_le_bytes());
    }

    let (mut ix, mut iy) = (0i64, 0i64);
    for &(x, y) in points {
        let nx = (x * xy_scale).round() as i64;
        let ny = (y * xy_scale).round() as i64;
        write_var_uint(&mut out, zigzag_encode(nx - ix));
        write_var_uint(&mut out, zigzag_encode(ny - iy));
        ix = nx;
        iy = ny;
    }

    if let Some(zs) = z {
        let zmin = zs.iter().cloned().fold(f64::INFINITY, f64::min);
        let zmax = zs.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        out.extend_from_slice(&zmin.to_le_bytes());
        out.extend_from_slice(&zmax.to_le_bytes());
        let mut acc = 0i64;
        for &zval in zs {
            let raw = (zval * z_scale).round() as i64;
            write_var_uint(&mut out, zigzag_encode(raw - acc));
            acc = raw;
        }
    }

    if let Some(ms) = m {
        let mmin = ms.iter().cloned().fold(f64::INFINITY, f64::min);
        let mmax = ms.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        out.extend_from_slice(&mmin.to_le_bytes());
        out.extend_from_slice(&mmax.to_le_bytes());
        let mut acc = 0i64;
        for &mval in ms {
            let raw = (mval * m_scale).round() as i64;
            write_var_uint(&mut out, zigzag_encode(raw - acc));
            acc = raw;
        }
    }

    if !curves.is_empty() {
        out.extend_from_slice(&(curves.len() as i32).to_le_bytes());
        for curve in curves {
            match *curve {
                Curve::CubicBezier { segment_index, cp1x, cp1y, cp2x, cp2y } => {
                    out.extend_from_slice(&segment_index.to_le_bytes());
                    out.extend_from_slice(&4i32.to_le_bytes());
                    out.extend_from_slice(&cp1x.to_le_bytes());
                    out.extend_from_slice(&cp1y.to_le_bytes());
                    out.extend_from_slice(&cp2x.to_le_bytes());
                    out.extend_from_slice(&cp2y.to_le_bytes());
                }
                Curve::CircularArc { segment_index, d1, d2, flags } => {
                    out.extend_from_slice(&segment_index.to_le_bytes());
                    out.extend_from_slice(&1i32.to_le_bytes());
                    out.extend_from_slice(&d1.to_le_bytes());
                    out.extend_from_slice(&d2.to_le_bytes());
                    out.extend_from_slice(&flags.to_le_bytes());
                }
            }
        }
    }

    out
}

/// Writes one table's `.gdbtable`/`.gdbtablx` pair, in a dense (no block map) v3 layout.
pub fn write_table(dir: &Path, base_name: &str, fields: &[FieldSpec], rows: &[Vec<u8>], table_flags: u32) {
    let offset_size = 5usize;
    let num_rows = rows.len() as u32;

    let mut data = Vec::new();
    data.extend_from_slice(&0u32.to_le_bytes());
    data.extend_from_slice(&num_rows.to_le_bytes());
    data.extend_from_slice(&0u32.to_le_bytes());
    data.extend_from_slice(&0u32.to_le_bytes());
    data.extend_from_slice(&0u32.to_le_bytes());
    data.extend_from_slice(&0u32.to_le_bytes());
    let file_size_pos = data.len();
    data.extend_from_slice(&0u64.to_le_bytes());
    let fields_offset_pos = data.len();
    data.extend_from_slice(&0u64.to_le_bytes());

    let mut row_offsets = Vec::with_capacity(rows.len());
    for row in rows {
        row_offsets.push(data.len() as u64);
        data.extend_from_slice(&(row.len() as u32).to_le_bytes());
        data.extend_from_slice(row);
    }

    let fields_offset = data.len() as u64;
    let mut fields_section = Vec::new();
    fields_section.extend_from_slice(&14i32.to_le_bytes());
    fields_section.extend_from_slice(&3i32.to_le_bytes());
    fields_section.extend_from_slice(&table_flags.to_le_bytes());
    fields_section.extend_from_slice(&(fields.len() as i16).to_le_bytes());
    for field in fields {
        fields_section.extend_from_slice(&encode_field_descriptor(field));
    }
    data.extend_from_slice(&fields_section);

    let file_size = data.len() as u64;
    data[file_size_pos..file_size_pos + 8].copy_from_slice(&file_size.to_le_bytes());
    data[fields_offset_pos..fields_offset_pos + 8].copy_from_slice(&fields_offset.to_le_bytes());

    let mut index = Vec::new();
    index.extend_from_slice(&3u32.to_le_bytes());
    index.extend_from_slice(&0u32.to_le_bytes());
    index.extend_from_slice(&num_rows.to_le_bytes());
    index.extend_from_slice(&(offset_size as u32).to_le_bytes());
    for &offset in &row_offsets {
        index.extend_from_slice(&offset.to_le_bytes()[..offset_size]);
    }

    std::fs::write(dir.join(format!("{}.gdbtable", base_name)), &data).unwrap();
    std::fs::write(dir.join(format!("{}.gdbtablx", base_name)), &index).unwrap();
}

/// Writes one table's `.gdbtable`/`.gdbtablx` pair, in a v4 (64-bit object id) dense layout.
pub fn write_table_v4(dir: &Path, base_name: &str, fields: &[FieldSpec], rows: &[Vec<u8>], table_flags: u32) {
    let offset_size = 8usize;
    let num_rows = rows.len() as u64;
    let num_1k_blocks = num_rows.div_ceil(1024) as u32;

    let mut data = Vec::new();
    data.extend_from_slice(&0u32.to_le_bytes());
    data.extend_from_slice(&0u32.to_le_bytes());
    data.extend_from_slice(&0u32.to_le_bytes()); // max_entry_size
    data.extend_from_slice(&0u32.to_le_bytes());
    data.extend_from_slice(&num_rows.to_le_bytes());
    let file_size_pos = data.len();
    data.extend_from_slice(&0u64.to_le_bytes());
    let fields_offset_pos = data.len();
    data.extend_from_slice(&0u64.to_le_bytes());

    let mut row_offsets = Vec::with_capacity(rows.len());
    for row in rows {
        row_offsets.push(data.len() as u64);
        data.extend_from_slice(&(row.len() as u32).to_le_bytes());
        data.extend_from_slice(row);
    }

    let fields_offset = data.len() as u64;
    let mut fields_section = Vec::new();
    fields_section.extend_from_slice(&14i32.to_le_bytes());
    // Fields-section schema version 6: marks the 64-bit object id schema, distinct from the
    // `3` used by `write_table`'s v3 fixtures.
    fields_section.extend_from_slice(&6i32.to_le_bytes());
    fields_section.extend_from_slice(&table_flags.to_le_bytes());
    fields_section.extend_from_slice(&(fields.len() as i16).to_le_bytes());
    for field in fields {
        fields_section.extend_from_slice(&encode_field_descriptor(field));
    }
    data.extend_from_slice(&fields_section);

    let file_size = data.len() as u64;
    data[file_size_pos..file_size_pos + 8].copy_from_slice(&file_size.to_le_bytes());
    data[fields_offset_pos..fields_offset_pos + 8].copy_from_slice(&fields_offset.to_le_bytes());

    let mut index = Vec::new();
    index.extend_from_slice(&4u32.to_le_bytes());
    index.extend_from_slice(&num_1k_blocks.to_le_bytes());
    index.extend_from_slice(&0u32.to_le_bytes()); // unknown1
    index.extend_from_slice(&(offset_size as u32).to_le_bytes());
    for &offset in &row_offsets {
        index.extend_from_slice(&offset.to_le_bytes()[..offset_size]);
    }
    // Pad out to the full reserved block space so the trailer lands where the format expects it.
    let reserved_slots = num_1k_blocks as u64 * 1024;
    for _ in row_offsets.len() as u64..reserved_slots {
        index.extend_from_slice(&0u64.to_le_bytes()[..offset_size]);
    }
    index.extend_from_slice(&num_rows.to_le_bytes());
    index.extend_from_slice(&0u32.to_le_bytes()); // section_bytes = 0 (dense)

    std::fs::write(dir.join(format!("{}.gdbtable", base_name)), &data).unwrap();
    std::fs::write(dir.join(format!("{}.gdbtablx", base_name)), &index).unwrap();
}

/// Writes the system catalog table (`a00000001`), given `(id, name, format)` triples.
pub fn write_catalog(dir: &Path, entries: &[(i64, &str, i32)]) {
    let fields = vec![
        object_id_field("OBJECTID"),
        string_field("Name", false),
        int32_field("Format", false),
    ];
    let rows: Vec<Vec<u8>> = entries
        .iter()
        .map(|(_, name, format)| {
            encode_row(
                &fields,
                &[RowValue::ObjectId, RowValue::String(name.to_string()), RowValue::Int32(*format)],
            )
        })
        .collect();
    write_table(dir, "a00000001", &fields, &rows, 0);
}
