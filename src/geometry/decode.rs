//! The actual byte-for-byte geometry blob decoder.
//!
//! This module fills in two channels the distilled format notes leave as a gap between the XY
//! coordinate stream and the curve section: Z and M are each persisted as `(min, max): f64`
//! followed by a delta-encoded, ZigZag-signed `var_uint` stream, exactly like X/Y. That mirrors
//! how X/Y themselves are encoded and how most Esri on-disk geometry formats layer extra
//! dimensions onto a shared point stream, so it's treated as the intended (if elided) layout
//! rather than invented from nothing.

use std::io::Cursor;

use crate::cursor::{zigzag_decode, ByteCursor};
use crate::{Error, Result};

use super::{Quantization, SegmentModifier, ShapeBuffer, ShapeKind};

const HAS_Z: u32 = 1 << 31;
const HAS_M: u32 = 1 << 30;
const HAS_CURVES: u32 = 1 << 29;
const HAS_ID: u32 = 1 << 28;

pub(super) fn decode_shape_buffer(bytes: &[u8], q: &Quantization) -> Result<ShapeBuffer> {
    let mut cursor = ByteCursor::new(Cursor::new(bytes));
    let header = cursor.read_u32()?;
    let basic_code = (header & 0xff) as u8;
    let kind = ShapeKind::from_basic_type_code(basic_code)?;
    let has_z = header & HAS_Z != 0;
    let has_m = header & HAS_M != 0;
    let has_curves = header & HAS_CURVES != 0;
    let has_id = header & HAS_ID != 0;

    match kind {
        ShapeKind::Null => Ok(empty_buffer(kind, false, false, false, false)),
        ShapeKind::Point => decode_point(&mut cursor, kind, has_z, has_m, has_id),
        ShapeKind::Multipatch => {
            // Recognized but opaque: the header is enough to report the flags, nothing further
            // is consumed or materialized.
            Ok(empty_buffer(kind, has_z, has_m, has_id, has_curves))
        }
        ShapeKind::Multipoint | ShapeKind::Polyline | ShapeKind::Polygon => {
            decode_multi(&mut cursor, kind, has_z, has_m, has_curves, has_id, q)
        }
    }
}

fn empty_buffer(kind: ShapeKind, has_z: bool, has_m: bool, has_id: bool, may_have_curves: bool) -> ShapeBuffer {
    ShapeBuffer {
        kind,
        has_z,
        has_m,
        has_id,
        may_have_curves,
        is_empty: true,
        envelope: None,
        x: Vec::new(),
        y: Vec::new(),
        z: None,
        m: None,
        ids: None,
        part_start_indices: Vec::new(),
        curves: Vec::new(),
    }
}

fn decode_point(
    cursor: &mut ByteCursor<Cursor<&[u8]>>,
    kind: ShapeKind,
    has_z: bool,
    has_m: bool,
    has_id: bool,
) -> Result<ShapeBuffer> {
    let x = cursor.read_f64()?;
    if x.is_nan() {
        return Ok(ShapeBuffer {
            kind,
            has_z,
            has_m,
            has_id,
            may_have_curves: false,
            is_empty: true,
            envelope: None,
            x: vec![f64::NAN],
            y: vec![f64::NAN],
            z: None,
            m: None,
            ids: None,
            part_start_indices: vec![0],
            curves: Vec::new(),
        });
    }
    let y = cursor.read_f64()?;
    let z = if has_z { Some(vec![cursor.read_f64()?]) } else { None };
    let m = if has_m { Some(vec![cursor.read_f64()?]) } else { None };
    let ids = if has_id { Some(vec![cursor.read_i32()?]) } else { None };
    Ok(ShapeBuffer {
        kind,
        has_z,
        has_m,
        has_id,
        may_have_curves: false,
        is_empty: false,
        envelope: None,
        x: vec![x],
        y: vec![y],
        z,
        m,
        ids,
        part_start_indices: vec![0],
        curves: Vec::new(),
    })
}

#[allow(clippy::too_many_arguments)]
fn decode_multi(
    cursor: &mut ByteCursor<Cursor<&[u8]>>,
    kind: ShapeKind,
    has_z: bool,
    has_m: bool,
    has_curves: bool,
    has_id: bool,
    q: &Quantization,
) -> Result<ShapeBuffer> {
    let xmin = cursor.read_f64()?;
    let ymin = cursor.read_f64()?;
    let xmax = cursor.read_f64()?;
    let ymax = cursor.read_f64()?;
    let envelope = if xmin.is_nan() { None } else { Some((xmin, ymin, xmax, ymax)) };

    let is_multipart = matches!(kind, ShapeKind::Polyline | ShapeKind::Polygon);
    let num_parts = if is_multipart { cursor.read_i32()? as usize } else { 0 };
    let num_points = cursor.read_i32()? as usize;

    let part_start_indices = if is_multipart {
        (0..num_parts).map(|_| cursor.read_i32()).collect::<Result<Vec<_>>>()?
    } else {
        vec![0]
    };

    let (x, y) = decode_xy(cursor, num_points, q)?;

    let z = if has_z {
        let _zmin = cursor.read_f64()?;
        let _zmax = cursor.read_f64()?;
        Some(decode_delta_stream(cursor, num_points, q.z_origin, q.z_scale)?)
    } else {
        None
    };
    let m = if has_m {
        let _mmin = cursor.read_f64()?;
        let _mmax = cursor.read_f64()?;
        Some(decode_delta_stream(cursor, num_points, q.m_origin, q.m_scale)?)
    } else {
        None
    };

    let curves = if has_curves && is_multipart {
        decode_curves(cursor)?
    } else {
        Vec::new()
    };

    let ids = if has_id {
        Some((0..num_points).map(|_| cursor.read_i32()).collect::<Result<Vec<_>>>()?)
    } else {
        None
    };

    Ok(ShapeBuffer {
        kind,
        has_z,
        has_m,
        has_id,
        may_have_curves: has_curves,
        is_empty: num_points == 0,
        envelope,
        x,
        y,
        z,
        m,
        ids,
        part_start_indices,
        curves,
    })
}

fn decode_xy(cursor: &mut ByteCursor<Cursor<&[u8]>>, num_points: usize, q: &Quantization) -> Result<(Vec<f64>, Vec<f64>)> {
    let mut xs = Vec::with_capacity(num_points);
    let mut ys = Vec::with_capacity(num_points);
    let mut ix: i64 = 0;
    let mut iy: i64 = 0;
    for _ in 0..num_points {
        ix += zigzag_decode(cursor.read_var_uint()?);
        iy += zigzag_decode(cursor.read_var_uint()?);
        xs.push(q.x_origin + ix as f64 / q.xy_scale);
        ys.push(q.y_origin + iy as f64 / q.xy_scale);
    }
    Ok((xs, ys))
}

fn decode_delta_stream(
    cursor: &mut ByteCursor<Cursor<&[u8]>>,
    num_points: usize,
    origin: f64,
    scale: f64,
) -> Result<Vec<f64>> {
    let mut values = Vec::with_capacity(num_points);
    let mut acc: i64 = 0;
    for _ in 0..num_points {
        acc += zigzag_decode(cursor.read_var_uint()?);
        values.push(origin + acc as f64 / scale);
    }
    Ok(values)
}

fn decode_curves(cursor: &mut ByteCursor<Cursor<&[u8]>>) -> Result<Vec<SegmentModifier>> {
    let num_curves = cursor.read_i32()?;
    if num_curves < 0 {
        return Err(Error::FormatError("negative num_curves".to_string()));
    }
    let mut curves = Vec::with_capacity(num_curves as usize);
    for _ in 0..num_curves {
        let segment_index = cursor.read_i32()?;
        let curve_type = cursor.read_i32()?;
        let modifier = match curve_type {
            1 => {
                let d1 = cursor.read_f64()?;
                let d2 = cursor.read_f64()?;
                let flags = cursor.read_i32()?;
                SegmentModifier::CircularArc { segment_index, d1, d2, flags }
            }
            4 => {
                let cp1x = cursor.read_f64()?;
                let cp1y = cursor.read_f64()?;
                let cp2x = cursor.read_f64()?;
                let cp2y = cursor.read_f64()?;
                SegmentModifier::CubicBezier { segment_index, cp1x, cp1y, cp2x, cp2y }
            }
            5 => {
                let mut d = [0.0; 5];
                for slot in d.iter_mut() {
                    *slot = cursor.read_f64()?;
                }
                let flags = cursor.read_i32()?;
                SegmentModifier::EllipticArc { segment_index, d, flags }
            }
            other => {
                return Err(Error::FormatError(format!(
                    "unknown curve type {} at segment {}",
                    other, segment_index
                )))
            }
        };
        curves.push(modifier);
    }
    Ok(curves)
}
