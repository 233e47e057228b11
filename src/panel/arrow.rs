//! Arrow shape and bounds inside the edge panel

use serde::Serialize;
use smithay::utils::{Logical, Point, Rectangle};

use crate::animation::lerp;
use crate::config::EdgeConfig;
use crate::input::geometry::{polar_to_cart_x, polar_to_cart_y};

/// One chevron, drawn as a stroke through the three points
pub type Chevron = [Point<f64, Logical>; 3];

/// Stroke geometry of the arrow in screen coordinates
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArrowPath {
    /// Chevrons as `[(x, y); 3]`; a long swipe doubles the arrow
    #[serde(serialize_with = "serialize_chevrons")]
    pub chevrons: Vec<Chevron>,
    pub thickness: f64,
    /// ARGB stroke colour
    pub color: u32,
    pub alpha: f64,
}

fn serialize_chevrons<S: serde::Serializer>(
    chevrons: &[Chevron],
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    use serde::ser::SerializeSeq;

    let mut seq = serializer.serialize_seq(Some(chevrons.len()))?;
    for chevron in chevrons {
        let points: [(f64, f64); 3] = [
            (chevron[0].x, chevron[0].y),
            (chevron[1].x, chevron[1].y),
            (chevron[2].x, chevron[2].y),
        ];
        seq.serialize_element(&points)?;
    }
    seq.end()
}

/// Inputs for placing the arrow inside its panel
#[derive(Debug, Clone, Copy)]
pub struct ArrowPose {
    pub panel: Rectangle<i32, Logical>,
    pub is_left_panel: bool,
    pub arrows_point_left: bool,
    pub translation: f64,
    pub vertical_translation: f64,
    pub angle: f64,
    pub disappear_amount: f64,
    pub trigger_back: bool,
    pub trigger_long_swipe: bool,
}

/// Whether the arrow faces away from its panel's edge
pub fn points_inward(is_left_panel: bool, arrows_point_left: bool) -> bool {
    is_left_panel == arrows_point_left
}

/// Chevrons for the given pose, in screen coordinates
pub fn chevrons(config: &EdgeConfig, pose: &ArrowPose) -> Vec<Chevron> {
    let panel = pose.panel;
    let pointer = pose.translation - config.arrow_thickness / 2.0;
    let origin_x = panel.loc.x as f64
        + if pose.is_left_panel {
            pointer
        } else {
            panel.size.w as f64 - pointer
        };
    let origin_y = panel.loc.y as f64 + panel.size.h as f64 * 0.5 + pose.vertical_translation;

    let mut leg_x = polar_to_cart_x(pose.angle) * config.arrow_length;
    let leg_y = polar_to_cart_y(pose.angle) * config.arrow_length;
    if !pose.arrows_point_left {
        leg_x = -leg_x;
    }
    let extent = lerp(1.0, 0.75, pose.disappear_amount);
    let (leg_x, leg_y) = (leg_x * extent, leg_y * extent);

    let chevron = |dx: f64| -> Chevron {
        [
            Point::from((origin_x + dx + leg_x, origin_y + leg_y)),
            Point::from((origin_x + dx, origin_y)),
            Point::from((origin_x + dx + leg_x, origin_y - leg_y)),
        ]
    };

    let mut chevrons = vec![chevron(0.0)];
    if pose.trigger_long_swipe {
        let side = if pose.is_left_panel { 1.0 } else { -1.0 };
        chevrons.push(chevron(config.arrow_thickness * 2.0 * side));
    }
    chevrons
}

/// Screen bounds of the visible arrow, for luma sampling.
///
/// While not triggering the arrow is hidden, so the resting position is
/// used instead.
pub fn sampling_rect(config: &EdgeConfig, pose: &ArrowPose) -> Rectangle<i32, Logical> {
    let static_width = config.static_arrow_width();
    let mut translation = pose.translation;
    if !pose.trigger_back {
        translation = config.base_translation;
        if points_inward(pose.is_left_panel, pose.arrows_point_left) {
            translation -= static_width;
        }
    }

    let panel = pose.panel;
    let mut left = translation - config.arrow_thickness / 2.0;
    if !pose.is_left_panel {
        left = panel.size.w as f64 - left;
    }

    let height = polar_to_cart_y(config.arrow_angle_extended) * config.arrow_length * 2.0;
    if !pose.arrows_point_left {
        left -= static_width;
    }
    let top = panel.size.h as f64 * 0.5 + pose.vertical_translation - height / 2.0;

    let x = panel.loc.x + left as i32;
    let y = panel.loc.y + top as i32;
    let right = (x as f64 + static_width) as i32;
    let bottom = (y as f64 + height) as i32;
    Rectangle::new(Point::from((x, y)), (right - x, bottom - y).into())
}
