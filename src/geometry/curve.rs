//! Segment modifiers: records promoting a straight segment into a curved one.

/// A record promoting the straight segment `segment_index..segment_index+1` of a polyline or
/// polygon part into a curved segment.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SegmentModifier {
    /// A circular arc.
    CircularArc {
        /// 0-based index of the segment this modifier replaces.
        segment_index: i32,
        /// First persisted coordinate (center X, or interior-point X when `interior_point_defined`).
        d1: f64,
        /// Second persisted coordinate (center Y, or interior-point Y when `interior_point_defined`).
        d2: f64,
        /// Raw flag bits; see [CircularArcFlags].
        flags: i32,
    },
    /// A cubic Bézier curve.
    CubicBezier {
        /// 0-based index of the segment this modifier replaces.
        segment_index: i32,
        #[allow(missing_docs)]
        cp1x: f64,
        #[allow(missing_docs)]
        cp1y: f64,
        #[allow(missing_docs)]
        cp2x: f64,
        #[allow(missing_docs)]
        cp2y: f64,
    },
    /// An elliptic arc.
    EllipticArc {
        /// 0-based index of the segment this modifier replaces.
        segment_index: i32,
        /// Five persisted `f64` values; see module docs for the flag-dependent reinterpretation.
        d: [f64; 5],
        /// Raw flag bits.
        flags: i32,
    },
}

impl SegmentModifier {
    /// The curve type code persisted for this modifier: `1`, `4`, or `5`.
    pub fn curve_type(&self) -> i32 {
        match self {
            SegmentModifier::CircularArc { .. } => 1,
            SegmentModifier::CubicBezier { .. } => 4,
            SegmentModifier::EllipticArc { .. } => 5,
        }
    }

    /// The 0-based index of the segment this modifier replaces.
    pub fn segment_index(&self) -> i32 {
        match *self {
            SegmentModifier::CircularArc { segment_index, .. }
            | SegmentModifier::CubicBezier { segment_index, .. }
            | SegmentModifier::EllipticArc { segment_index, .. } => segment_index,
        }
    }
}

/// Bit accessors for [SegmentModifier::CircularArc]'s `flags`.
pub trait CircularArcFlags {
    /// Bit 0: the arc is empty.
    fn is_empty(self) -> bool;
    /// Bit 3: the arc runs counter-clockwise.
    fn is_counter_clockwise(self) -> bool;
    /// Bit 4: the arc's central angle is `<= pi`.
    fn is_minor(self) -> bool;
    /// Bit 5: the arc has infinite radius (is really a line).
    fn is_line(self) -> bool;
    /// Bit 6: start, end, and control points coincide.
    fn is_point(self) -> bool;
    /// Bit 7: `d1, d2` carry an interior point rather than the arc's center (9.2+ layout).
    fn is_interior_point_defined(self) -> bool;
}

impl CircularArcFlags for i32 {
    fn is_empty(self) -> bool {
        self & 0b1 != 0
    }

    fn is_counter_clockwise(self) -> bool {
        self & (1 << 3) != 0
    }

    fn is_minor(self) -> bool {
        self & (1 << 4) != 0
    }

    fn is_line(self) -> bool {
        self & (1 << 5) != 0
    }

    fn is_point(self) -> bool {
        self & (1 << 6) != 0
    }

    fn is_interior_point_defined(self) -> bool {
        self & (1 << 7) != 0
    }
}

/// Default subdivision tolerance for [cubic_bezier_length], per the spec's §4.4.4.
pub const DEFAULT_LENGTH_TOLERANCE: f64 = 1e-8;

fn dist(a: (f64, f64), b: (f64, f64)) -> f64 {
    ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)).sqrt()
}

/// Computes the arc length of a cubic Bézier curve by recursive subdivision.
///
/// `L0` is the chord `|P0P3|`; `L1` is the control polygon length `|P0P1|+|P1P2|+|P2P3|`. While
/// `L1 - L0` exceeds `tolerance`, the curve is split at `t = 0.5` (via de Casteljau's algorithm)
/// and each half is measured recursively; otherwise the length is approximated as
/// `0.5 * (L0 + L1)`.
pub fn cubic_bezier_length(
    p0: (f64, f64),
    p1: (f64, f64),
    p2: (f64, f64),
    p3: (f64, f64),
    tolerance: f64,
) -> f64 {
    let l0 = dist(p0, p3);
    let l1 = dist(p0, p1) + dist(p1, p2) + dist(p2, p3);
    if l1 - l0 > tolerance {
        let mid = |a: (f64, f64), b: (f64, f64)| ((a.0 + b.0) / 2.0, (a.1 + b.1) / 2.0);
        let p01 = mid(p0, p1);
        let p12 = mid(p1, p2);
        let p23 = mid(p2, p3);
        let p012 = mid(p01, p12);
        let p123 = mid(p12, p23);
        let p0123 = mid(p012, p123);
        cubic_bezier_length(p0, p01, p012, p0123, tolerance)
            + cubic_bezier_length(p0123, p123, p23, p3, tolerance)
    } else {
        0.5 * (l0 + l1)
    }
}

/// Computes the arc length of a circular arc given its two endpoints.
///
/// Returns `0.0` when the `IsPoint` flag is set (per the spec's open question, this is known to
/// not match every interpretation of a coincident start/end/control point). Returns the chord
/// length when `IsLine` is set. Otherwise, resolves the arc's center (directly, or via the
/// circumcenter of `start`, `interior_point`, `end` when `IsInteriorPointDefined` is set) and
/// computes `radius * angle`, choosing the minor or major arc per the `IsMinor` flag.
pub fn circular_arc_length(start: (f64, f64), end: (f64, f64), d1: f64, d2: f64, flags: i32) -> f64 {
    if flags.is_point() {
        return 0.0;
    }
    if flags.is_line() {
        return dist(start, end);
    }
    let center = if flags.is_interior_point_defined() {
        circumcenter(start, (d1, d2), end).unwrap_or((d1, d2))
    } else {
        (d1, d2)
    };
    let radius = dist(center, start);
    if radius == 0.0 {
        return 0.0;
    }
    let a0 = (start.1 - center.1).atan2(start.0 - center.0);
    let a1 = (end.1 - center.1).atan2(end.0 - center.0);
    let mut delta = a1 - a0;
    if flags.is_counter_clockwise() {
        while delta < 0.0 {
            delta += std::f64::consts::TAU;
        }
    } else {
        while delta > 0.0 {
            delta -= std::f64::consts::TAU;
        }
    }
    let angle = delta.abs();
    let angle = if flags.is_minor() {
        angle.min(std::f64::consts::TAU - angle)
    } else {
        angle.max(std::f64::consts::TAU - angle)
    };
    radius * angle
}

fn circumcenter(a: (f64, f64), b: (f64, f64), c: (f64, f64)) -> Option<(f64, f64)> {
    let d = 2.0 * (a.0 * (b.1 - c.1) + b.0 * (c.1 - a.1) + c.0 * (a.1 - b.1));
    if d.abs() < f64::EPSILON {
        return None;
    }
    let ux = ((a.0.powi(2) + a.1.powi(2)) * (b.1 - c.1)
        + (b.0.powi(2) + b.1.powi(2)) * (c.1 - a.1)
        + (c.0.powi(2) + c.1.powi(2)) * (a.1 - b.1))
        / d;
    let uy = ((a.0.powi(2) + a.1.powi(2)) * (c.0 - b.0)
        + (b.0.powi(2) + b.1.powi(2)) * (a.0 - c.0)
        + (c.0.powi(2) + c.1.powi(2)) * (b.0 - a.0))
        / d;
    Some((ux, uy))
}
