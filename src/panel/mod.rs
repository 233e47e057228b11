//! Edge panel - the arrow affordance that follows the finger
//!
//! Every animated dimension (translation, angle, vertical offset) is a
//! [`Spring`] chasing a desired value set from classifier events. The host
//! calls [`VisualFeedbackController::tick`] once per frame and renders
//! [`VisualFeedbackController::arrow_path`].
//!
//! Release sequence of a triggered gesture:
//! 1. the angle snaps a little further open
//! 2. once the translation spring settles the arrow slides back by
//!    `settle_back_distance` on the settle spring
//! 3. the arrow fades out (80 ms) while shrinking (100 ms) and is hidden

pub mod arrow;

use serde::Serialize;
use smithay::utils::{Logical, Point, Rectangle, Size};

use crate::animation::{blend_argb, curves, lerp, Spring, TimedAnimation};
use crate::config::EdgeConfig;
use crate::input::geometry::{arrow_travel, sign, Insets};
use crate::input::gestures::{ClassifierEvent, MoveUpdate};

pub use arrow::{ArrowPath, ArrowPose, Chevron};

const COLOR_ANIMATION_DURATION_MS: f64 = 120.0;
const DISAPPEAR_FADE_ANIMATION_DURATION_MS: f64 = 80.0;
const DISAPPEAR_ARROW_ANIMATION_DURATION_MS: f64 = 100.0;

/// Vertical rubber banding amount
const RUBBER_BAND_AMOUNT: f64 = 15.0;

/// Angle of the folded (hidden) arrow
const ANGLE_FOLDED: f64 = 90.0;

/// Degrees the angle snaps open on release
const RELEASE_ANGLE_SNAP: f64 = 8.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PanelPhase {
    Hidden,
    Tracking,
    /// Released with a back; waiting for the translation spring to settle
    AwaitTriggerSettle,
    /// Released without a back; hidden once the translation settles
    AwaitHide,
    Disappearing,
}

/// Snapshot of everything the renderer and sampler need
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VisualState {
    pub visible: bool,
    pub is_left_panel: bool,
    pub arrows_point_left: bool,
    pub trigger_back: bool,
    pub trigger_long_swipe: bool,
    pub current_translation: f64,
    pub desired_translation: f64,
    pub current_angle: f64,
    pub desired_angle: f64,
    pub vertical_translation: f64,
    pub desired_vertical_translation: f64,
    pub disappear_amount: f64,
    pub alpha: f64,
    /// ARGB
    pub current_color: u32,
    pub panel_x: i32,
    pub panel_y: i32,
    pub panel_width: i32,
    pub panel_height: i32,
}

/// Fade of the whole panel
#[derive(Debug, Clone)]
struct Fade {
    from: f64,
    animation: TimedAnimation,
}

/// Arrow colour animation
#[derive(Debug, Clone)]
struct ColorTransition {
    from: u32,
    to: u32,
    animation: TimedAnimation,
}

pub struct VisualFeedbackController {
    config: EdgeConfig,
    display: Size<i32, Logical>,
    insets: Insets,
    panel: Rectangle<i32, Logical>,
    phase: PanelPhase,
    is_left_panel: bool,
    arrows_point_left: bool,

    translation: Spring,
    angle: Spring,
    vertical: Spring,
    desired_translation: f64,
    desired_angle: f64,
    desired_vertical: f64,
    angle_offset: f64,
    trigger_back: bool,
    trigger_long_swipe: bool,

    alpha: f64,
    fade: Fade,
    disappear: TimedAnimation,
    disappear_amount: f64,

    is_dark: bool,
    current_color: u32,
    color: ColorTransition,
}

impl VisualFeedbackController {
    pub fn new(config: EdgeConfig, display: Size<i32, Logical>) -> Self {
        let springs = config.springs.clone();
        let color = config.arrow_color_light;
        let arrows_point_left = config.arrows_point_left;
        let panel = Rectangle::new(
            Point::from((0, 0)),
            Size::from((config.panel_width as i32, config.panel_height as i32)),
        );
        Self {
            config,
            display,
            insets: Insets::default(),
            panel,
            phase: PanelPhase::Hidden,
            is_left_panel: true,
            arrows_point_left,
            translation: Spring::new(0.0, springs.regular_translation),
            angle: Spring::new(ANGLE_FOLDED, springs.angle_appear).with_max_value(ANGLE_FOLDED),
            vertical: Spring::new(0.0, springs.vertical),
            desired_translation: 0.0,
            desired_angle: ANGLE_FOLDED,
            desired_vertical: 0.0,
            angle_offset: 0.0,
            trigger_back: false,
            trigger_long_swipe: false,
            alpha: 0.0,
            fade: Fade {
                from: 1.0,
                animation: TimedAnimation::new(DISAPPEAR_FADE_ANIMATION_DURATION_MS, None),
            },
            disappear: TimedAnimation::new(
                DISAPPEAR_ARROW_ANIMATION_DURATION_MS,
                Some(curves::FAST_OUT_SLOW_IN),
            ),
            disappear_amount: 0.0,
            is_dark: false,
            current_color: color,
            color: ColorTransition {
                from: color,
                to: color,
                animation: TimedAnimation::new(COLOR_ANIMATION_DURATION_MS, None),
            },
        }
    }

    pub fn set_config(&mut self, config: EdgeConfig) {
        self.arrows_point_left = config.arrows_point_left;
        self.config = config;
        self.panel.size = Size::from((
            self.config.panel_width as i32,
            self.config.panel_height as i32,
        ));
        self.update_is_dark(false);
    }

    pub fn set_display_size(&mut self, display: Size<i32, Logical>) {
        self.display = display;
    }

    pub fn set_insets(&mut self, insets: Insets) {
        self.insets = insets;
    }

    pub fn is_visible(&self) -> bool {
        self.phase != PanelPhase::Hidden
    }

    /// True while anything still needs frames
    pub fn is_animating(&self) -> bool {
        self.translation.is_running()
            || self.angle.is_running()
            || self.vertical.is_running()
            || self.color.animation.is_running()
            || matches!(
                self.phase,
                PanelPhase::AwaitTriggerSettle | PanelPhase::AwaitHide | PanelPhase::Disappearing
            )
    }

    pub fn on_classifier_event(&mut self, event: &ClassifierEvent) {
        match event {
            ClassifierEvent::Started {
                start,
                is_left_edge,
            } => self.reset_on_down(*start, *is_left_edge),
            ClassifierEvent::DragSlopPassed => {
                // Show the arrow and animate it in
                self.disappear_amount = 0.0;
                self.fade.animation.cancel();
                self.alpha = 1.0;
            }
            ClassifierEvent::Moved(update) => self.handle_move(update),
            ClassifierEvent::Released { trigger_back } => self.release(*trigger_back),
            ClassifierEvent::Cancelled { .. } => self.release(false),
            ClassifierEvent::ThresholdCrossed
            | ClassifierEvent::Haptic(_)
            | ClassifierEvent::Resolved(_) => {}
        }
    }

    /// Hide at once, dropping any running animation
    pub fn reset(&mut self) {
        self.translation.cancel();
        self.angle.cancel();
        self.vertical.cancel();
        self.alpha = 0.0;
        self.hide();
    }

    /// Follow the luma of the content under the arrow
    pub fn set_is_dark(&mut self, is_dark: bool, animate: bool) {
        self.is_dark = is_dark;
        self.update_is_dark(animate);
    }

    /// Advance all animations by `dt_ms`
    pub fn tick(&mut self, dt_ms: f64) {
        self.translation.step(dt_ms);
        self.angle.step(dt_ms);
        self.vertical.step(dt_ms);

        if self.color.animation.is_running() {
            self.color.animation.step(dt_ms);
            self.current_color =
                blend_argb(self.color.from, self.color.to, self.color.animation.value());
        }

        match self.phase {
            PanelPhase::AwaitTriggerSettle if !self.translation.is_running() => {
                self.settle_back();
            }
            PanelPhase::AwaitHide if !self.translation.is_running() => self.hide(),
            PanelPhase::Disappearing => {
                self.disappear.step(dt_ms);
                self.disappear_amount = self.disappear.value();
                if self.fade.animation.step(dt_ms) {
                    self.alpha = 0.0;
                    self.hide();
                } else {
                    self.alpha = lerp(self.fade.from, 0.0, self.fade.animation.value());
                }
            }
            _ => {}
        }
    }

    pub fn current_visual_state(&self) -> VisualState {
        VisualState {
            visible: self.is_visible(),
            is_left_panel: self.is_left_panel,
            arrows_point_left: self.arrows_point_left,
            trigger_back: self.trigger_back,
            trigger_long_swipe: self.trigger_long_swipe,
            current_translation: self.translation.value(),
            desired_translation: self.desired_translation,
            current_angle: self.angle.value(),
            desired_angle: self.desired_angle,
            vertical_translation: self.vertical.value(),
            desired_vertical_translation: self.desired_vertical,
            disappear_amount: self.disappear_amount,
            alpha: self.alpha,
            current_color: self.current_color,
            panel_x: self.panel.loc.x,
            panel_y: self.panel.loc.y,
            panel_width: self.panel.size.w,
            panel_height: self.panel.size.h,
        }
    }

    /// Screen bounds of the visible arrow
    pub fn current_sampling_rect(&self) -> Rectangle<i32, Logical> {
        arrow::sampling_rect(&self.config, &self.pose())
    }

    /// Arrow strokes to render, `None` while hidden
    pub fn arrow_path(&self) -> Option<ArrowPath> {
        if !self.is_visible() {
            return None;
        }
        Some(ArrowPath {
            chevrons: arrow::chevrons(&self.config, &self.pose()),
            thickness: self.config.arrow_thickness,
            color: self.current_color,
            alpha: self.alpha,
        })
    }

    pub fn panel_rect(&self) -> Rectangle<i32, Logical> {
        self.panel
    }

    fn pose(&self) -> ArrowPose {
        ArrowPose {
            panel: self.panel,
            is_left_panel: self.is_left_panel,
            arrows_point_left: self.arrows_point_left,
            translation: self.translation.value(),
            vertical_translation: self.vertical.value(),
            angle: self.angle.value(),
            disappear_amount: self.disappear_amount,
            trigger_back: self.trigger_back,
            trigger_long_swipe: self.trigger_long_swipe,
        }
    }

    fn reset_on_down(&mut self, start: Point<f64, Logical>, is_left_edge: bool) {
        self.fade.animation.cancel();
        self.angle.cancel();
        self.translation.cancel();
        self.vertical.cancel();
        self.disappear.cancel();
        self.disappear_amount = 0.0;
        self.angle_offset = 0.0;
        self.translation.set_force(self.config.springs.regular_translation);

        // Back to the side, folded
        self.trigger_back = false;
        self.trigger_long_swipe = false;
        self.desired_translation = 0.0;
        self.translation.jump_to(0.0);
        self.desired_angle = ANGLE_FOLDED;
        self.angle.jump_to(ANGLE_FOLDED);
        self.desired_vertical = 0.0;
        self.vertical.jump_to(0.0);

        // Invisible until the drag slop is passed
        self.alpha = 0.0;
        self.is_left_panel = is_left_edge;
        self.place_panel(start.y);
        self.phase = PanelPhase::Tracking;
    }

    fn place_panel(&mut self, touch_y: f64) {
        let config = &self.config;
        let width = config.panel_width as i32;
        let height = config.panel_height as i32;

        let anchor = (touch_y - config.finger_offset).max(config.min_arrow_position);
        let y = ((anchor - config.panel_height / 2.0) as i32).clamp(0, self.display.h.max(0));
        let x = if self.is_left_panel {
            self.insets.left as i32
        } else {
            self.display.w - self.insets.right as i32 - width
        };
        self.panel = Rectangle::new(Point::from((x, y)), Size::from((width, height)));
    }

    fn handle_move(&mut self, update: &MoveUpdate) {
        if self.phase != PanelPhase::Tracking {
            return;
        }
        let screen_size = self.display.w.min(self.display.h) as f64;
        let mut travel = arrow_travel(
            update.touch_translation,
            self.config.base_translation,
            self.config.max_translation(),
            screen_size,
        );

        self.angle_offset = update.angle_offset;
        self.set_trigger_long_swipe(update.trigger_long_swipe);
        self.set_trigger_back(update.trigger_back);

        if !self.trigger_back {
            travel = 0.0;
        } else if arrow::points_inward(self.is_left_panel, self.arrows_point_left) {
            // The arrow faces away from the edge, so it moves less
            travel -= self.config.static_arrow_width();
        }
        self.set_desired_translation(travel, true);
        self.update_angle(true);

        let max_y_offset = self.config.panel_height / 2.0 - self.config.arrow_length;
        let vertical = if max_y_offset > 0.0 {
            let progress = (update.y_offset.abs() / (max_y_offset * RUBBER_BAND_AMOUNT)).clamp(0.0, 1.0);
            curves::RUBBER_BAND.interpolate(progress) * max_y_offset * sign(update.y_offset)
        } else {
            0.0
        };
        self.set_desired_vertical(vertical, true);
    }

    fn release(&mut self, trigger_back: bool) {
        if self.phase != PanelPhase::Tracking {
            return;
        }
        if !trigger_back {
            if self.translation.is_running() {
                self.phase = PanelPhase::AwaitHide;
            } else {
                self.hide();
            }
            return;
        }

        // Snap the angle a bit
        if self.angle_offset > -RELEASE_ANGLE_SNAP / 2.0 {
            self.angle_offset = (self.angle_offset - RELEASE_ANGLE_SNAP).max(-RELEASE_ANGLE_SNAP);
            self.update_angle(true);
        }

        if self.translation.is_running() {
            self.phase = PanelPhase::AwaitTriggerSettle;
        } else {
            self.settle_back();
        }
    }

    fn settle_back(&mut self) {
        self.angle_offset = (self.angle_offset + RELEASE_ANGLE_SNAP).max(0.0);
        self.update_angle(true);

        self.translation.set_force(self.config.springs.settle_translation);
        let target = self.desired_translation - self.config.settle_back_distance;
        self.set_desired_translation(target, true);

        self.fade.from = self.alpha;
        self.fade.animation.start();
        self.disappear.start();
        self.phase = PanelPhase::Disappearing;
    }

    fn hide(&mut self) {
        self.fade.animation.cancel();
        self.disappear.cancel();
        self.phase = PanelPhase::Hidden;
    }

    fn set_trigger_back(&mut self, trigger_back: bool) {
        if self.trigger_back == trigger_back {
            return;
        }
        self.trigger_back = trigger_back;
        self.angle.cancel();
        self.update_angle(true);
        self.translation.cancel();
        self.translation.set_force(if trigger_back {
            self.config.springs.trigger_translation
        } else {
            self.config.springs.regular_translation
        });
    }

    fn set_trigger_long_swipe(&mut self, trigger_long_swipe: bool) {
        if self.trigger_long_swipe == trigger_long_swipe {
            return;
        }
        self.trigger_long_swipe = trigger_long_swipe;
        self.angle.cancel();
        self.update_angle(true);
        self.translation.cancel();
    }

    fn update_angle(&mut self, animated: bool) {
        let angle = if self.trigger_back {
            self.config.arrow_angle_extended + self.angle_offset
        } else {
            ANGLE_FOLDED
        };
        if angle == self.desired_angle {
            return;
        }
        self.desired_angle = angle;
        if animated {
            self.angle.set_force(if self.trigger_back {
                self.config.springs.angle_appear
            } else {
                self.config.springs.angle_disappear
            });
            self.angle.animate_to(angle);
        } else {
            self.angle.jump_to(angle);
        }
    }

    fn set_desired_translation(&mut self, translation: f64, animated: bool) {
        if translation == self.desired_translation {
            return;
        }
        self.desired_translation = translation;
        if animated {
            self.translation.animate_to(translation);
        } else {
            self.translation.jump_to(translation);
        }
    }

    fn set_desired_vertical(&mut self, vertical: f64, animated: bool) {
        if vertical == self.desired_vertical {
            return;
        }
        self.desired_vertical = vertical;
        if animated {
            self.vertical.animate_to(vertical);
        } else {
            self.vertical.jump_to(vertical);
        }
    }

    fn update_is_dark(&mut self, animate: bool) {
        let target = if self.is_dark {
            self.config.arrow_color_dark
        } else {
            self.config.arrow_color_light
        };
        self.color.animation.cancel();
        if animate {
            self.color.from = self.current_color;
            self.color.to = target;
            self.color.animation.start();
        } else {
            self.color.from = target;
            self.color.to = target;
            self.current_color = target;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::gestures::{AbortReason, HapticEffect};

    fn config() -> EdgeConfig {
        EdgeConfig::for_density(1.0)
    }

    fn controller() -> VisualFeedbackController {
        VisualFeedbackController::new(config(), Size::from((1080, 2000)))
    }

    fn start(controller: &mut VisualFeedbackController, x: f64, y: f64) {
        controller.on_classifier_event(&ClassifierEvent::Started {
            start: Point::from((x, y)),
            is_left_edge: x < 540.0,
        });
    }

    fn drag(controller: &mut VisualFeedbackController, translation: f64, trigger_back: bool) {
        controller.on_classifier_event(&ClassifierEvent::Moved(MoveUpdate {
            touch_translation: translation,
            y: 500.0,
            y_offset: 0.0,
            trigger_back,
            trigger_long_swipe: false,
            angle_offset: 0.0,
        }));
    }

    fn run_frames(controller: &mut VisualFeedbackController, frames: usize) {
        for _ in 0..frames {
            controller.tick(16.0);
        }
    }

    #[test]
    fn test_reset_on_down() {
        let mut controller = controller();
        assert!(!controller.current_visual_state().visible);
        assert!(controller.arrow_path().is_none());

        start(&mut controller, 2.0, 500.0);
        let state = controller.current_visual_state();
        assert!(state.visible);
        assert!(state.is_left_panel);
        assert_eq!(state.current_translation, 0.0);
        assert_eq!(state.current_angle, 90.0);
        assert_eq!(state.alpha, 0.0);
        assert!(!state.trigger_back);
    }

    #[test]
    fn test_panel_placement() {
        let mut controller = controller();
        let config = config();

        start(&mut controller, 2.0, 500.0);
        // 500 - 48 - 96 / 2
        assert_eq!(controller.panel_rect().loc, Point::from((0, 404)));

        // Never above the minimum arrow position
        start(&mut controller, 2.0, 10.0);
        assert_eq!(
            controller.panel_rect().loc.y,
            (config.min_arrow_position - config.panel_height / 2.0) as i32
        );

        controller.set_insets(Insets {
            right: 20.0,
            ..Default::default()
        });
        start(&mut controller, 1078.0, 500.0);
        assert_eq!(controller.panel_rect().loc.x, 1080 - 20 - 70);
    }

    #[test]
    fn test_drag_extends_arrow() {
        let mut controller = controller();
        let config = config();
        start(&mut controller, 2.0, 500.0);
        controller.on_classifier_event(&ClassifierEvent::DragSlopPassed);
        drag(&mut controller, 200.0, true);

        let state = controller.current_visual_state();
        assert_eq!(state.alpha, 1.0);
        assert!(state.trigger_back);
        assert_eq!(state.desired_angle, config.arrow_angle_extended);
        let expected = arrow_travel(200.0, 32.0, config.max_translation(), 1080.0)
            - config.static_arrow_width();
        assert_eq!(state.desired_translation, expected);

        run_frames(&mut controller, 120);
        let state = controller.current_visual_state();
        assert!((state.current_translation - expected).abs() < 1.0);
        assert!((state.current_angle - config.arrow_angle_extended).abs() < 1.0);
    }

    #[test]
    fn test_direction_change_folds_arrow() {
        let mut controller = controller();
        start(&mut controller, 2.0, 500.0);
        drag(&mut controller, 200.0, true);
        run_frames(&mut controller, 60);

        drag(&mut controller, 150.0, false);
        let state = controller.current_visual_state();
        assert_eq!(state.desired_translation, 0.0);
        assert_eq!(state.desired_angle, 90.0);

        run_frames(&mut controller, 120);
        assert!(controller.current_visual_state().current_angle <= 90.0);
    }

    #[test]
    fn test_vertical_follow_is_banded() {
        let mut controller = controller();
        start(&mut controller, 2.0, 500.0);
        controller.on_classifier_event(&ClassifierEvent::Moved(MoveUpdate {
            touch_translation: 100.0,
            y: 900.0,
            y_offset: 400.0,
            trigger_back: true,
            trigger_long_swipe: false,
            angle_offset: 0.0,
        }));
        let max_y_offset = 48.0 - 18.0;
        let state = controller.current_visual_state();
        assert!(state.desired_vertical_translation > 0.0);
        assert!(state.desired_vertical_translation <= max_y_offset);
    }

    #[test]
    fn test_cancelled_release_hides() {
        let mut controller = controller();
        start(&mut controller, 2.0, 500.0);
        drag(&mut controller, 20.0, false);
        controller.on_classifier_event(&ClassifierEvent::Cancelled {
            reason: AbortReason::MultiTouch,
        });
        run_frames(&mut controller, 120);
        assert!(!controller.current_visual_state().visible);
        assert!(!controller.is_animating());
    }

    #[test]
    fn test_triggered_release_settles_and_disappears() {
        let mut controller = controller();
        let config = config();
        start(&mut controller, 2.0, 500.0);
        controller.on_classifier_event(&ClassifierEvent::DragSlopPassed);
        drag(&mut controller, 200.0, true);
        run_frames(&mut controller, 120);
        let extended = controller.current_visual_state().desired_translation;

        controller.on_classifier_event(&ClassifierEvent::Haptic(HapticEffect::Click));
        controller.on_classifier_event(&ClassifierEvent::Released { trigger_back: true });

        // Translation was at rest, so the slide back starts right away
        let state = controller.current_visual_state();
        assert_eq!(
            state.desired_translation,
            extended - config.settle_back_distance
        );
        assert!(state.visible);

        controller.tick(50.0);
        let state = controller.current_visual_state();
        assert!(state.disappear_amount > 0.0);
        assert!(state.alpha < 1.0);

        controller.tick(50.0);
        assert!(!controller.current_visual_state().visible);
    }

    #[test]
    fn test_triggered_release_waits_for_translation() {
        let mut controller = controller();
        start(&mut controller, 2.0, 500.0);
        controller.on_classifier_event(&ClassifierEvent::DragSlopPassed);
        drag(&mut controller, 200.0, true);
        controller.tick(16.0);
        let desired = controller.current_visual_state().desired_translation;

        controller.on_classifier_event(&ClassifierEvent::Released { trigger_back: true });
        assert_eq!(controller.current_visual_state().desired_translation, desired);
        assert!(controller.is_animating());

        run_frames(&mut controller, 200);
        assert!(!controller.current_visual_state().visible);
    }

    #[test]
    fn test_down_interrupts_disappear() {
        let mut controller = controller();
        start(&mut controller, 2.0, 500.0);
        controller.on_classifier_event(&ClassifierEvent::DragSlopPassed);
        drag(&mut controller, 200.0, true);
        run_frames(&mut controller, 120);
        controller.on_classifier_event(&ClassifierEvent::Released { trigger_back: true });
        controller.tick(16.0);

        start(&mut controller, 2.0, 800.0);
        let state = controller.current_visual_state();
        assert!(state.visible);
        assert_eq!(state.disappear_amount, 0.0);
        assert_eq!(state.current_translation, 0.0);
        controller.tick(200.0);
        assert!(controller.current_visual_state().visible);
    }

    #[test]
    fn test_color_animates() {
        let mut controller = controller();
        let config = config();
        assert_eq!(controller.current_visual_state().current_color, config.arrow_color_light);

        controller.set_is_dark(true, true);
        controller.tick(60.0);
        let mid = controller.current_visual_state().current_color;
        assert_ne!(mid, config.arrow_color_light);
        assert_ne!(mid, config.arrow_color_dark);

        controller.tick(60.0);
        assert_eq!(controller.current_visual_state().current_color, config.arrow_color_dark);

        controller.set_is_dark(false, false);
        assert_eq!(controller.current_visual_state().current_color, config.arrow_color_light);
    }

    #[test]
    fn test_sampling_rect_tracks_panel() {
        let mut controller = controller();
        start(&mut controller, 2.0, 500.0);
        let rect = controller.current_sampling_rect();
        assert!(controller.panel_rect().contains(rect.loc));
    }
}
