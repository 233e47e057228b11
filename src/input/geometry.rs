//! Edge zone, exclusion and rubber band geometry
//!
//! Pure functions shared by the classifier and the edge panel. Coordinates
//! are raw display pixels.

use smithay::utils::{Logical, Rectangle, Size};

use crate::animation::{curves, CubicBezier};

/// How far the appearing arrow is compressed below its resting position
const RUBBER_BAND_AMOUNT_APPEAR: f64 = 4.0;

/// Screen-space insets that shrink the area where a gesture may start
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Insets {
    pub left: f64,
    pub right: f64,
    /// Height of the visible IME, 0 when hidden
    pub ime_height: f64,
    pub nav_bar_height: f64,
    /// Height of the band at the top excluded by the user, 0 when disabled
    pub top_exclusion: f64,
}

/// A set of screen rectangles
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Region {
    rects: Vec<Rectangle<i32, Logical>>,
}

impl Region {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rects(rects: impl IntoIterator<Item = Rectangle<i32, Logical>>) -> Self {
        Self {
            rects: rects.into_iter().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }

    pub fn rects(&self) -> &[Rectangle<i32, Logical>] {
        &self.rects
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        self.rects.iter().any(|rect| rect.contains((x, y)))
    }
}

/// Result of testing a touch down against the exclusion regions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExclusionClass {
    Allowed,
    /// The app asked for the gesture to be suppressed here
    StrictlyExcluded,
    /// Allowed, but the app had asked for it not to be - reported as rejected
    UnrestrictedExcluded,
}

/// True if a touch down at `(x, y)` may start a back gesture
pub fn is_within_edge_zone(
    x: f64,
    y: f64,
    display: Size<i32, Logical>,
    edge_width: f64,
    insets: &Insets,
) -> bool {
    if !x.is_finite() || !y.is_finite() {
        return false;
    }
    if display.w <= 0 || display.h <= 0 || edge_width <= 0.0 {
        return false;
    }
    let width = display.w as f64;
    let height = display.h as f64;

    // Disallow over the IME or the nav bar
    let base_y = height - insets.ime_height.max(insets.nav_bar_height);
    if y > base_y {
        return false;
    }

    // Disallow in the user excluded top band
    if insets.top_exclusion > 0.0 {
        let user_exclude = height - insets.top_exclusion;
        if y < base_y - user_exclude {
            return false;
        }
    }

    // Disallow if too far from either edge
    !(x > edge_width + insets.left && x < width - edge_width - insets.right)
}

/// True if the gesture belongs to the left edge
pub fn is_left_edge(x: f64, edge_width: f64, insets: &Insets) -> bool {
    x <= edge_width + insets.left
}

pub fn classify_exclusion(x: i32, y: i32, strict: &Region, unrestricted: &Region) -> ExclusionClass {
    if strict.contains(x, y) {
        ExclusionClass::StrictlyExcluded
    } else if unrestricted.contains(x, y) {
        ExclusionClass::UnrestrictedExcluded
    } else {
        ExclusionClass::Allowed
    }
}

pub fn saturate(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// One-dimensional rubber band.
///
/// Identity up to `limit`. Past it the overshoot is normalised over `range`,
/// eased through `interpolator` and compressed so the result approaches
/// `limit + range / band_amount`. The sign of `raw_delta` is preserved.
pub fn rubber_band(
    raw_delta: f64,
    limit: f64,
    range: f64,
    band_amount: f64,
    interpolator: &CubicBezier,
) -> f64 {
    let magnitude = raw_delta.abs();
    if magnitude <= limit {
        return raw_delta;
    }
    if range <= 0.0 || band_amount <= 0.0 {
        return limit.copysign(raw_delta);
    }
    let progress = saturate((magnitude - limit) / range);
    let banded = limit + interpolator.interpolate(progress) * (range / band_amount);
    banded.copysign(raw_delta)
}

/// Horizontal arrow position for a finger `touch_translation` away from the
/// start point.
///
/// Below `base` the arrow trails behind the finger and settles at `base`;
/// past it the arrow follows with increasing resistance up to `max`, which it
/// reaches when the finger has crossed `screen_size`.
pub fn arrow_travel(touch_translation: f64, base: f64, max: f64, screen_size: f64) -> f64 {
    if touch_translation > base {
        let range = screen_size - base;
        let extent = max - base;
        if range <= 0.0 || extent <= 0.0 {
            return base;
        }
        rubber_band(touch_translation, base, range, range / extent, &curves::RUBBER_BAND)
    } else if base > 0.0 {
        base - rubber_band(
            base - touch_translation,
            0.0,
            base,
            RUBBER_BAND_AMOUNT_APPEAR,
            &curves::RUBBER_BAND_APPEAR,
        )
    } else {
        0.0
    }
}

/// `signum` that maps zero to zero
pub fn sign(value: f64) -> f64 {
    if value > 0.0 {
        1.0
    } else if value < 0.0 {
        -1.0
    } else {
        0.0
    }
}

pub fn polar_to_cart_x(angle_degrees: f64) -> f64 {
    angle_degrees.to_radians().cos()
}

pub fn polar_to_cart_y(angle_degrees: f64) -> f64 {
    angle_degrees.to_radians().sin()
}
