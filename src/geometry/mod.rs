//! Decoding the "Extended Shape Buffer" geometry blob format.
//!
//! A geometry field's raw bytes decode into a [ShapeBuffer]: a self-describing, bit-flagged
//! binary geometry with variants `{null, point, multipoint, polyline, polygon, multipatch}`,
//! optional Z/M/ID channels, optional non-linear segment modifiers (circular arcs, cubic
//! Béziers, elliptic arcs), and a variable-length delta-encoded coordinate stream quantized
//! through a per-field origin/scale (see [Quantization]).
//!
//! [ShapeBuffer::to_shape] materializes the buffer into the friendlier tagged-variant [Shape]
//! tree; most callers that only need point-by-point access can stay on [ShapeBuffer::query_point]
//! and skip materialization entirely.

mod curve;
mod decode;

pub use curve::SegmentModifier;

use crate::{Error, Result};

/// The quantization parameters used to turn delta-encoded integers into real coordinates.
///
/// `value = origin + raw / scale`. Z and M scales/origins are meaningless (and unused) unless
/// the corresponding channel is present; they default to `1.0` / `0.0` so that a shape without
/// Z or M never divides by zero even if asked to.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Quantization {
    /// X-axis origin.
    pub x_origin: f64,
    /// Y-axis origin.
    pub y_origin: f64,
    /// Shared X/Y scale.
    pub xy_scale: f64,
    /// Z-axis origin, meaningful only when a shape has a Z channel.
    pub z_origin: f64,
    /// Z-axis scale, meaningful only when a shape has a Z channel.
    pub z_scale: f64,
    /// M-axis origin, meaningful only when a shape has an M channel.
    pub m_origin: f64,
    /// M-axis scale, meaningful only when a shape has an M channel.
    pub m_scale: f64,
}

impl Default for Quantization {
    fn default() -> Quantization {
        Quantization {
            x_origin: 0.0,
            y_origin: 0.0,
            xy_scale: 1.0,
            z_origin: 0.0,
            z_scale: 1.0,
            m_origin: 0.0,
            m_scale: 1.0,
        }
    }
}

/// The basic shape kind carried by a geometry blob's type code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShapeKind {
    /// No geometry.
    Null,
    /// A single point.
    Point,
    /// An unordered collection of points.
    Multipoint,
    /// One or more connected, possibly disjoint, polylines.
    Polyline,
    /// One or more rings.
    Polygon,
    /// A multipatch. Recognized but not decoded further (see module docs).
    Multipatch,
}

impl ShapeKind {
    pub(crate) fn from_basic_type_code(code: u8) -> Result<ShapeKind> {
        match code {
            0 => Ok(ShapeKind::Null),
            1 | 9 | 11 | 21 | 52 => Ok(ShapeKind::Point),
            3 | 10 | 13 | 23 | 50 => Ok(ShapeKind::Polyline),
            5 | 15 | 19 | 25 | 51 => Ok(ShapeKind::Polygon),
            8 | 18 | 20 | 28 | 53 => Ok(ShapeKind::Multipoint),
            31 | 32 | 54 => Ok(ShapeKind::Multipatch),
            other => Err(Error::FormatError(format!(
                "unrecognized shape type code: {}",
                other
            ))),
        }
    }
}

/// The unparsed-but-queryable view of a geometry blob.
///
/// Coordinates are kept fully decoded (not re-quantized) once parsed; only the raw header
/// flags, counts, and per-channel arrays are retained.
#[derive(Clone, Debug, PartialEq)]
pub struct ShapeBuffer {
    kind: ShapeKind,
    has_z: bool,
    has_m: bool,
    has_id: bool,
    may_have_curves: bool,
    is_empty: bool,
    envelope: Option<(f64, f64, f64, f64)>,
    x: Vec<f64>,
    y: Vec<f64>,
    z: Option<Vec<f64>>,
    m: Option<Vec<f64>>,
    ids: Option<Vec<i32>>,
    part_start_indices: Vec<i32>,
    curves: Vec<SegmentModifier>,
}

impl ShapeBuffer {
    /// Decodes a geometry blob using the field's quantization parameters.
    pub fn decode(bytes: &[u8], quantization: &Quantization) -> Result<ShapeBuffer> {
        decode::decode_shape_buffer(bytes, quantization)
    }

    /// The basic shape kind.
    pub fn kind(&self) -> ShapeKind {
        self.kind
    }

    /// Whether a Z channel is present.
    pub fn has_z(&self) -> bool {
        self.has_z
    }

    /// Whether an M channel is present.
    pub fn has_m(&self) -> bool {
        self.has_m
    }

    /// Whether a per-point ID channel is present.
    pub fn has_id(&self) -> bool {
        self.has_id
    }

    /// Whether this shape's header flags allow non-linear segment modifiers.
    pub fn may_have_curves(&self) -> bool {
        self.may_have_curves
    }

    /// Whether this shape encodes no geometry (`num_points == 0`, or the "empty point"
    /// anomaly where `num_points == 1` with NaN coordinates).
    pub fn is_empty(&self) -> bool {
        self.is_empty
    }

    /// The number of points.
    pub fn num_points(&self) -> usize {
        self.x.len()
    }

    /// The number of parts (always `1` for points and multipoints).
    pub fn num_parts(&self) -> usize {
        self.part_start_indices.len()
    }

    /// The number of segment modifiers.
    pub fn num_curves(&self) -> usize {
        self.curves.len()
    }

    /// The persisted envelope, `(xmin, ymin, xmax, ymax)`, when this shape carries one.
    pub fn envelope(&self) -> Option<(f64, f64, f64, f64)> {
        self.envelope
    }

    /// The 0-based starting point index of each part.
    pub fn part_start_indices(&self) -> &[i32] {
        &self.part_start_indices
    }

    /// The segment modifiers, ordered by strictly increasing `segment_index`.
    pub fn curves(&self) -> &[SegmentModifier] {
        &self.curves
    }

    /// Returns `(x, y, z, m, id)` for point `i`.
    ///
    /// Channels absent from the buffer report their documented default: `z = 0.0`, `m = NaN`,
    /// `id = 0`.
    pub fn query_point(&self, i: usize) -> (f64, f64, f64, f64, i32) {
        let x = self.x[i];
        let y = self.y[i];
        let z = self.z.as_ref().map(|zs| zs[i]).unwrap_or(0.0);
        let m = self.m.as_ref().map(|ms| ms[i]).unwrap_or(f64::NAN);
        let id = self.ids.as_ref().map(|ids| ids[i]).unwrap_or(0);
        (x, y, z, m, id)
    }

    /// Materializes this buffer into a tagged [Shape] tree.
    ///
    /// Returns [Error::UnsupportedFeature] for [ShapeKind::Multipatch]: recognizing the type is
    /// supported, materializing its geometry is not (see module docs).
    pub fn to_shape(&self) -> Result<Shape> {
        match self.kind {
            ShapeKind::Null => Ok(Shape::Null),
            ShapeKind::Point => {
                let (x, y, z, m, id) = if self.is_empty {
                    (f64::NAN, f64::NAN, 0.0, f64::NAN, 0)
                } else {
                    self.query_point(0)
                };
                Ok(Shape::Point(PointShape { x, y, z, m, id }))
            }
            ShapeKind::Multipoint => Ok(Shape::Multipoint(MultipointShape {
                points: (0..self.num_points()).map(|i| self.point_shape(i)).collect(),
            })),
            ShapeKind::Polyline => Ok(Shape::Polyline(PolylineShape {
                points: (0..self.num_points()).map(|i| self.point_shape(i)).collect(),
                part_start_indices: self.part_start_indices.iter().map(|&i| i as usize).collect(),
                curves: self.curves.clone(),
            })),
            ShapeKind::Polygon => Ok(Shape::Polygon(PolygonShape {
                points: (0..self.num_points()).map(|i| self.point_shape(i)).collect(),
                part_start_indices: self.part_start_indices.iter().map(|&i| i as usize).collect(),
                curves: self.curves.clone(),
            })),
            ShapeKind::Multipatch => Err(Error::UnsupportedFeature(
                "multipatch geometry is recognized but not materialized".to_string(),
            )),
        }
    }

    fn point_shape(&self, i: usize) -> PointShape {
        let (x, y, z, m, id) = self.query_point(i);
        PointShape { x, y, z, m, id }
    }

    /// Computes the 2D/3D/M bounding box of this shape's points.
    ///
    /// Unlike every other [Shape] variant, a [BoxShape] is never persisted; it is always derived
    /// on demand.
    pub fn bounding_box(&self) -> Shape {
        if self.x.is_empty() {
            return Shape::Box(BoxShape {
                xmin: f64::INFINITY,
                ymin: f64::INFINITY,
                xmax: f64::NEG_INFINITY,
                ymax: f64::NEG_INFINITY,
                z: None,
                m: None,
            });
        }
        let (mut xmin, mut xmax) = (f64::INFINITY, f64::NEG_INFINITY);
        let (mut ymin, mut ymax) = (f64::INFINITY, f64::NEG_INFINITY);
        for i in 0..self.x.len() {
            xmin = xmin.min(self.x[i]);
            xmax = xmax.max(self.x[i]);
            ymin = ymin.min(self.y[i]);
            ymax = ymax.max(self.y[i]);
        }
        let z = self.z.as_ref().map(|zs| {
            (
                zs.iter().cloned().fold(f64::INFINITY, f64::min),
                zs.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
            )
        });
        let m = self.m.as_ref().map(|ms| {
            (
                ms.iter().cloned().fold(f64::INFINITY, f64::min),
                ms.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
            )
        });
        Shape::Box(BoxShape { xmin, ymin, xmax, ymax, z, m })
    }
}

/// A materialized, tagged-variant geometry.
#[derive(Clone, Debug, PartialEq)]
pub enum Shape {
    /// No geometry.
    Null,
    /// A single point.
    Point(PointShape),
    /// An unordered collection of points.
    Multipoint(MultipointShape),
    /// One or more connected polylines, optionally curved.
    Polyline(PolylineShape),
    /// One or more rings, optionally curved.
    Polygon(PolygonShape),
    /// A derived bounding box. Never persisted.
    Box(BoxShape),
}

/// A single point, with all four optional channels resolved to their defaults.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointShape {
    #[allow(missing_docs)]
    pub x: f64,
    #[allow(missing_docs)]
    pub y: f64,
    #[allow(missing_docs)]
    pub z: f64,
    #[allow(missing_docs)]
    pub m: f64,
    #[allow(missing_docs)]
    pub id: i32,
}

/// An unordered collection of points.
#[derive(Clone, Debug, PartialEq)]
pub struct MultipointShape {
    #[allow(missing_docs)]
    pub points: Vec<PointShape>,
}

/// A multi-part polyline.
#[derive(Clone, Debug, PartialEq)]
pub struct PolylineShape {
    #[allow(missing_docs)]
    pub points: Vec<PointShape>,
    #[allow(missing_docs)]
    pub part_start_indices: Vec<usize>,
    #[allow(missing_docs)]
    pub curves: Vec<SegmentModifier>,
}

/// A multi-part polygon (one or more rings).
#[derive(Clone, Debug, PartialEq)]
pub struct PolygonShape {
    #[allow(missing_docs)]
    pub points: Vec<PointShape>,
    #[allow(missing_docs)]
    pub part_start_indices: Vec<usize>,
    #[allow(missing_docs)]
    pub curves: Vec<SegmentModifier>,
}

impl PolylineShape {
    /// Returns the points of part `k`, using `part_start_indices` and the total point count.
    pub fn part(&self, k: usize) -> &[PointShape] {
        part_slice(&self.points, &self.part_start_indices, k)
    }

    /// Returns every part as a point slice.
    ///
    /// A single-part shape's only element is, by construction, the shape's own points: the
    /// "parts is self" convenience the spec describes is this view, not shared ownership.
    pub fn parts(&self) -> Vec<&[PointShape]> {
        (0..self.part_start_indices.len()).map(|k| self.part(k)).collect()
    }
}

impl PolygonShape {
    /// Returns the points of ring `k`.
    pub fn part(&self, k: usize) -> &[PointShape] {
        part_slice(&self.points, &self.part_start_indices, k)
    }

    /// Returns every ring as a point slice.
    pub fn parts(&self) -> Vec<&[PointShape]> {
        (0..self.part_start_indices.len()).map(|k| self.part(k)).collect()
    }
}

fn part_slice<'a>(points: &'a [PointShape], starts: &[usize], k: usize) -> &'a [PointShape] {
    let start = starts[k];
    let end = starts.get(k + 1).copied().unwrap_or(points.len());
    &points[start..end]
}

/// A derived bounding box. Never persisted; always computed from a shape's points.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoxShape {
    #[allow(missing_docs)]
    pub xmin: f64,
    #[allow(missing_docs)]
    pub ymin: f64,
    #[allow(missing_docs)]
    pub xmax: f64,
    #[allow(missing_docs)]
    pub ymax: f64,
    /// `(zmin, zmax)`, when the shape has a Z channel.
    pub z: Option<(f64, f64)>,
    /// `(mmin, mmax)`, when the shape has an M channel.
    pub m: Option<(f64, f64)>,
}
