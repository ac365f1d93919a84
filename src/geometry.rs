//! Value types and parsing for per-child layout geometry.
//!
//! A [`GeometrySnapshot`] is computed fresh on every read and never mutated;
//! the diff works on [`LayoutDelta`] values derived from two snapshots.

/// Absolute tolerance for the visible-change test.
///
/// Layout reads of visually static content jitter below a pixel, so an exact
/// equality test would animate forever. 1/64 is sub-pixel and exactly
/// representable, which keeps the boundary (== tolerance: no change,
/// tolerance + ε: change) stable across platforms.
pub const LAYOUT_TOLERANCE: f64 = 1.0 / 64.0;

/// Scale denominators below this degrade the ratio to 1.0 instead of
/// producing inf/NaN.
const MIN_SCALE_DENOM: f64 = 1e-6;

/// Container-relative position, in the layout source's length unit.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Offset {
    pub top: f64,
    pub left: f64,
}

/// One child's visual state at a single point in time.
///
/// `top`/`left` are relative to the container's bounding box. `scale_x`/
/// `scale_y` default to 1.0 when the element carries no scale transform.
/// `opacity` is the effective value as read, not clamped.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GeometrySnapshot {
    pub top: f64,
    pub left: f64,
    pub opacity: f64,
    pub scale_x: f64,
    pub scale_y: f64,
}

impl GeometrySnapshot {
    /// Delta that visually undoes the jump from `previous` to `self`.
    pub fn delta_from(&self, previous: &Self) -> LayoutDelta {
        LayoutDelta {
            d_top: previous.top - self.top,
            d_left: previous.left - self.left,
            scale_ratio_x: scale_ratio(previous.scale_x, self.scale_x),
            scale_ratio_y: scale_ratio(previous.scale_y, self.scale_y),
        }
    }
}

fn scale_ratio(previous: f64, current: f64) -> f64 {
    if current.abs() < MIN_SCALE_DENOM {
        return 1.0;
    }
    previous / current
}

/// Position delta plus scale ratios between two snapshots of one identity.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LayoutDelta {
    pub d_top: f64,
    pub d_left: f64,
    pub scale_ratio_x: f64,
    pub scale_ratio_y: f64,
}

impl LayoutDelta {
    /// Whether the child visibly moved or rescaled.
    ///
    /// Position deltas within [`LAYOUT_TOLERANCE`] of zero and scale ratios
    /// within it of 1.0 count as unchanged. Opacity never participates here;
    /// it is carried along in the writes only.
    pub fn is_visible_change(&self) -> bool {
        self.d_top.abs() > LAYOUT_TOLERANCE
            || self.d_left.abs() > LAYOUT_TOLERANCE
            || (self.scale_ratio_x - 1.0).abs() > LAYOUT_TOLERANCE
            || (self.scale_ratio_y - 1.0).abs() > LAYOUT_TOLERANCE
    }
}

/// Extract `(scale_x, scale_y)` from a computed 2-D transform string.
///
/// Only a pure scale `matrix(a, 0, 0, d, tx, ty)` yields its diagonal.
/// `none`, absence, rotation/skew terms, `matrix3d`, or garbage all degrade
/// to `(1.0, 1.0)`; extraction never fails.
pub fn parse_scale(transform: Option<&str>) -> (f64, f64) {
    let Some(raw) = transform else {
        return (1.0, 1.0);
    };
    let raw = raw.trim();
    let Some(args) = raw
        .strip_prefix("matrix(")
        .and_then(|rest| rest.strip_suffix(')'))
    else {
        return (1.0, 1.0);
    };

    let parts: Vec<f64> = args
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .unwrap_or_default();
    if parts.len() != 6 {
        return (1.0, 1.0);
    }

    // Off-diagonal terms mean rotation or skew; unsupported, not an error.
    if parts[1].abs() > MIN_SCALE_DENOM || parts[2].abs() > MIN_SCALE_DENOM {
        return (1.0, 1.0);
    }
    (parts[0], parts[3])
}

/// Effective opacity from a computed style string; unset or unparsable reads
/// as fully opaque. The value is not clamped.
pub fn parse_opacity(raw: Option<&str>) -> f64 {
    raw.and_then(|s| s.trim().parse::<f64>().ok()).unwrap_or(1.0)
}

/// Canonical transform serialization for hosts that write style strings.
///
/// Integral components render without a decimal point, e.g.
/// `translate(100px,0px) scale(1,1)`.
pub fn transform_css(dx: f64, dy: f64, sx: f64, sy: f64) -> String {
    format!(
        "translate({}px,{}px) scale({},{})",
        fmt_component(dx),
        fmt_component(dy),
        fmt_component(sx),
        fmt_component(sy)
    )
}

fn fmt_component(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{v}")
    }
}
