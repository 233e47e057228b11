//! Edge back gesture classification
//!
//! A single-pointer state machine fed with the raw samples of the monitored
//! input channel. It decides whether the stream is a back gesture, keeps the
//! `trigger_back` / `trigger_long_swipe` decision current while the finger
//! moves, and reports everything the arrow and the host need as
//! [`ClassifierEvent`]s.
//!
//! Supports:
//! - Edge zone and exclusion region gating
//! - Multi-touch, long press and vertical intent aborts
//! - Direction-stability voting
//! - Velocity-based arrow angle correction
//! - Long swipe detection

use serde::Serialize;
use smithay::utils::{Logical, Point, Size};

use super::geometry::{self, sign, ExclusionClass, Insets, Region};
use super::touch::{TouchAction, TouchSample};
use super::velocity::VelocityTracker;
use crate::config::EdgeConfig;

/// Release slower than this (px/s) always gets the click haptic
const MAX_CLICK_VELOCITY: f64 = 500.0;

/// Gestures held at least this long after the tick always get the click haptic
const GESTURE_DURATION_FOR_CLICK_MS: i64 = 400;

/// Why a tracked gesture was dropped before the finger lifted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AbortReason {
    /// A second finger went down
    MultiTouch,
    /// The finger rested too long before moving
    LongPress,
    /// The finger moved vertically first
    VerticalIntent,
    /// The host cancelled the stream
    Cancelled,
    /// Back gestures were turned off mid-gesture
    Disabled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// Started inside a region the app excluded
    Excluded,
    /// Aborted or released without triggering
    Incomplete,
}

/// Final decision for one gesture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GestureOutcome {
    Back,
    LongSwipe,
    Rejected(RejectReason),
}

/// Key action of an injected back key event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyAction {
    Down,
    Up,
}

/// A back key event the host injects for a triggered gesture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BackKeyEvent {
    pub action: KeyAction,
    pub long_press: bool,
}

impl GestureOutcome {
    pub fn is_triggered(&self) -> bool {
        !matches!(self, GestureOutcome::Rejected(_))
    }

    /// Back key down/up pair to inject, empty for rejected gestures.
    /// A long swipe is delivered as a long-pressed back key.
    pub fn key_events(&self) -> Vec<BackKeyEvent> {
        let long_press = match self {
            GestureOutcome::Back => false,
            GestureOutcome::LongSwipe => true,
            GestureOutcome::Rejected(_) => return Vec::new(),
        };
        vec![
            BackKeyEvent {
                action: KeyAction::Down,
                long_press,
            },
            BackKeyEvent {
                action: KeyAction::Up,
                long_press,
            },
        ]
    }
}

/// Telemetry classification of a finished gesture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BackGestureType {
    Completed,
    /// Completed although it started in the unrestricted exclusion region
    CompletedRejected,
    Incomplete,
    /// Started in the strict exclusion region
    IncompleteExcluded,
}

/// Outcome report handed to the observer, exactly once per gesture
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GestureResolution {
    pub outcome: GestureOutcome,
    pub start_x: f64,
    pub start_y: f64,
    pub is_left_edge: bool,
    pub gesture_type: BackGestureType,
    pub abort: Option<AbortReason>,
}

impl GestureResolution {
    pub fn start(&self) -> Point<f64, Logical> {
        Point::from((self.start_x, self.start_y))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HapticEffect {
    /// The arrow appeared
    Tick,
    /// Long swipe toggled, or the gesture was released
    Click,
}

/// Per-sample tracking update after the touch slop was crossed
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoveUpdate {
    /// Horizontal distance from the start point
    pub touch_translation: f64,
    pub y: f64,
    /// Signed vertical distance from the start point
    pub y_offset: f64,
    pub trigger_back: bool,
    pub trigger_long_swipe: bool,
    /// Arrow angle correction in degrees
    pub angle_offset: f64,
}

/// Everything the classifier reports back for one sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClassifierEvent {
    /// A session started
    Started {
        start: Point<f64, Logical>,
        is_left_edge: bool,
    },
    /// Horizontal intent confirmed; the host should pilfer the pointers
    ThresholdCrossed,
    /// The arrow should appear
    DragSlopPassed,
    Moved(MoveUpdate),
    Haptic(HapticEffect),
    /// The session was aborted; the arrow goes away without triggering
    Cancelled { reason: AbortReason },
    /// The finger lifted
    Released { trigger_back: bool },
    Resolved(GestureResolution),
}

/// Coarse classifier state, mostly for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifierPhase {
    Idle,
    /// Tracking, touch slop not yet crossed
    Unconfirmed,
    /// Tracking with the pointers pilfered
    Confirmed,
    /// Dropping the rest of an aborted stream
    Ignoring,
}

/// State of the gesture in progress
#[derive(Debug, Clone, PartialEq)]
pub struct GestureSession {
    pub start: Point<f64, Logical>,
    pub down_time_ms: i64,
    pub is_left_edge: bool,
    pub in_rejected_exclusion: bool,
    pub threshold_crossed: bool,
    pub drag_slop_passed: bool,
    pub previous_touch_translation: f64,
    pub total_touch_delta: f64,
    pub trigger_back: bool,
    pub trigger_long_swipe: bool,
    pub angle_offset: f64,
    pub drifted_vertically: bool,
    /// When the drag slop tick fired
    pub vibration_time_ms: Option<i64>,
}

impl GestureSession {
    fn new(sample: &TouchSample, is_left_edge: bool, in_rejected_exclusion: bool) -> Self {
        Self {
            start: sample.position(),
            down_time_ms: sample.timestamp_ms,
            is_left_edge,
            in_rejected_exclusion,
            threshold_crossed: false,
            drag_slop_passed: false,
            previous_touch_translation: 0.0,
            total_touch_delta: 0.0,
            trigger_back: false,
            trigger_long_swipe: false,
            angle_offset: 0.0,
            drifted_vertically: false,
            vibration_time_ms: None,
        }
    }

    fn resolution(&self, abort: Option<AbortReason>) -> GestureResolution {
        let outcome = if abort.is_some() {
            GestureOutcome::Rejected(RejectReason::Incomplete)
        } else if self.trigger_long_swipe {
            GestureOutcome::LongSwipe
        } else if self.trigger_back {
            GestureOutcome::Back
        } else {
            GestureOutcome::Rejected(RejectReason::Incomplete)
        };
        let gesture_type = match outcome {
            GestureOutcome::Rejected(_) => BackGestureType::Incomplete,
            _ if self.in_rejected_exclusion => BackGestureType::CompletedRejected,
            _ => BackGestureType::Completed,
        };
        GestureResolution {
            outcome,
            start_x: self.start.x,
            start_y: self.start.y,
            is_left_edge: self.is_left_edge,
            gesture_type,
            abort,
        }
    }
}

#[derive(Debug, Clone)]
enum ClassifierState {
    Idle,
    Tracking(GestureSession),
    Ignoring,
}

/// What the pre-slop checks decided for a move
enum SlopDecision {
    Wait,
    Abort(AbortReason),
    Track,
}

pub struct GestureClassifier {
    config: EdgeConfig,
    display: Size<i32, Logical>,
    insets: Insets,
    strict_exclusion: Region,
    unrestricted_exclusion: Region,
    transient_immersive: bool,
    back_gesture_disabled: bool,
    long_swipe_threshold: f64,
    state: ClassifierState,
    velocity: VelocityTracker,
}

impl GestureClassifier {
    pub fn new(config: EdgeConfig, display: Size<i32, Logical>) -> Self {
        let long_swipe_threshold = config.long_swipe_threshold_for(display.w as f64);
        let insets = Insets {
            nav_bar_height: config.nav_bar_height,
            top_exclusion: if config.exclude_top {
                config.top_exclusion_size
            } else {
                0.0
            },
            ..Default::default()
        };
        Self {
            config,
            display,
            insets,
            strict_exclusion: Region::new(),
            unrestricted_exclusion: Region::new(),
            transient_immersive: false,
            back_gesture_disabled: false,
            long_swipe_threshold,
            state: ClassifierState::Idle,
            velocity: VelocityTracker::new(),
        }
    }

    pub fn config(&self) -> &EdgeConfig {
        &self.config
    }

    /// Replace the config. A gesture in progress keeps running on the new
    /// values.
    pub fn set_config(&mut self, config: EdgeConfig) {
        self.config = config;
    }

    pub fn display_size(&self) -> Size<i32, Logical> {
        self.display
    }

    pub fn set_display_size(&mut self, display: Size<i32, Logical>) {
        self.display = display;
    }

    pub fn insets(&self) -> Insets {
        self.insets
    }

    pub fn set_insets(&mut self, insets: Insets) {
        self.insets = insets;
    }

    /// Apply a new exclusion snapshot. A missing unrestricted region means
    /// the app made no unrestricted request, so it equals the strict one.
    pub fn set_exclusion(&mut self, strict: Region, unrestricted: Option<Region>) {
        self.unrestricted_exclusion = unrestricted.unwrap_or_else(|| strict.clone());
        self.strict_exclusion = strict;
    }

    pub fn clear_exclusion(&mut self) {
        self.strict_exclusion = Region::new();
        self.unrestricted_exclusion = Region::new();
    }

    pub fn strict_exclusion(&self) -> &Region {
        &self.strict_exclusion
    }

    pub fn unrestricted_exclusion(&self) -> &Region {
        &self.unrestricted_exclusion
    }

    /// Transient bars shown over an immersive-sticky app ignore exclusions
    pub fn set_transient_immersive(&mut self, transient: bool) {
        self.transient_immersive = transient;
    }

    pub fn is_transient_immersive(&self) -> bool {
        self.transient_immersive
    }

    /// Shell state that blocks new back gestures (e.g. a locked keyguard)
    pub fn set_back_gesture_disabled(&mut self, disabled: bool) {
        self.back_gesture_disabled = disabled;
    }

    pub fn is_back_gesture_disabled(&self) -> bool {
        self.back_gesture_disabled
    }

    pub fn long_swipe_threshold(&self) -> f64 {
        self.long_swipe_threshold
    }

    /// A threshold of 0 or less disables long swipes
    pub fn set_long_swipe_threshold(&mut self, threshold: f64) {
        self.long_swipe_threshold = threshold.max(0.0);
        if self.long_swipe_threshold == 0.0 {
            if let ClassifierState::Tracking(session) = &mut self.state {
                session.trigger_long_swipe = false;
            }
        }
    }

    pub fn phase(&self) -> ClassifierPhase {
        match &self.state {
            ClassifierState::Idle => ClassifierPhase::Idle,
            ClassifierState::Tracking(session) if session.threshold_crossed => {
                ClassifierPhase::Confirmed
            }
            ClassifierState::Tracking(_) => ClassifierPhase::Unconfirmed,
            ClassifierState::Ignoring => ClassifierPhase::Ignoring,
        }
    }

    pub fn session(&self) -> Option<&GestureSession> {
        match &self.state {
            ClassifierState::Tracking(session) => Some(session),
            _ => None,
        }
    }

    pub fn is_tracking(&self) -> bool {
        matches!(self.state, ClassifierState::Tracking(_))
    }

    /// Classify one sample
    pub fn on_touch(&mut self, sample: &TouchSample) -> Vec<ClassifierEvent> {
        let mut events = Vec::new();
        match sample.action {
            TouchAction::Down => self.on_down(sample, &mut events),
            TouchAction::PointerDown => {
                if self.is_tracking() {
                    self.end_session(AbortReason::MultiTouch, ClassifierState::Ignoring, &mut events);
                }
            }
            TouchAction::Move => self.on_move(sample, &mut events),
            TouchAction::Up => self.on_up(sample, &mut events),
            TouchAction::Cancel => {
                if self.is_tracking() {
                    self.velocity.add_movement(sample.timestamp_ms, sample.x, sample.y);
                    self.end_session(AbortReason::Cancelled, ClassifierState::Idle, &mut events);
                } else {
                    self.state = ClassifierState::Idle;
                }
            }
            TouchAction::PointerUp => {}
        }
        events
    }

    /// Drop the gesture in progress. The next `Down` starts afresh.
    pub fn abort(&mut self, reason: AbortReason) -> Vec<ClassifierEvent> {
        let mut events = Vec::new();
        self.end_session(reason, ClassifierState::Idle, &mut events);
        events
    }

    fn on_down(&mut self, sample: &TouchSample, events: &mut Vec<ClassifierEvent>) {
        match self.state {
            ClassifierState::Tracking(_) => {
                self.end_session(AbortReason::MultiTouch, ClassifierState::Ignoring, events);
                return;
            }
            ClassifierState::Ignoring => {
                tracing::debug!("Ignoring down until the aborted stream ends");
                return;
            }
            ClassifierState::Idle => {}
        }

        if self.back_gesture_disabled {
            tracing::trace!("Back gesture disabled, ignoring down");
            return;
        }

        let edge_width = self.config.edge_width;
        if !geometry::is_within_edge_zone(sample.x, sample.y, self.display, edge_width, &self.insets) {
            return;
        }
        let is_left_edge = geometry::is_left_edge(sample.x, edge_width, &self.insets);

        let mut in_rejected_exclusion = false;
        if !self.transient_immersive {
            let (x, y) = (sample.x as i32, sample.y as i32);
            match geometry::classify_exclusion(x, y, &self.strict_exclusion, &self.unrestricted_exclusion) {
                ExclusionClass::StrictlyExcluded => {
                    tracing::debug!("Back gesture down at ({}, {}) excluded", x, y);
                    events.push(ClassifierEvent::Resolved(GestureResolution {
                        outcome: GestureOutcome::Rejected(RejectReason::Excluded),
                        start_x: sample.x,
                        start_y: sample.y,
                        is_left_edge,
                        gesture_type: BackGestureType::IncompleteExcluded,
                        abort: None,
                    }));
                    return;
                }
                ExclusionClass::UnrestrictedExcluded => in_rejected_exclusion = true,
                ExclusionClass::Allowed => {}
            }
        }

        tracing::debug!(
            "Back gesture started at ({:.0}, {:.0}), left edge: {}",
            sample.x,
            sample.y,
            is_left_edge
        );
        self.velocity.clear();
        self.velocity.add_movement(sample.timestamp_ms, sample.x, sample.y);
        self.state = ClassifierState::Tracking(GestureSession::new(
            sample,
            is_left_edge,
            in_rejected_exclusion,
        ));
        events.push(ClassifierEvent::Started {
            start: sample.position(),
            is_left_edge,
        });
    }

    fn on_move(&mut self, sample: &TouchSample, events: &mut Vec<ClassifierEvent>) {
        let ClassifierState::Tracking(session) = &mut self.state else {
            return;
        };
        self.velocity.add_movement(sample.timestamp_ms, sample.x, sample.y);

        let decision = if session.threshold_crossed {
            SlopDecision::Track
        } else if sample.timestamp_ms.saturating_sub(session.down_time_ms)
            > self.config.long_press_timeout_ms
        {
            SlopDecision::Abort(AbortReason::LongPress)
        } else {
            let dx = (sample.x - session.start.x).abs();
            let dy = (sample.y - session.start.y).abs();
            let slop = self.config.touch_slop;
            if dy > dx && dy > slop {
                SlopDecision::Abort(AbortReason::VerticalIntent)
            } else if dx > dy && dx > slop {
                session.threshold_crossed = true;
                events.push(ClassifierEvent::ThresholdCrossed);
                SlopDecision::Track
            } else {
                SlopDecision::Wait
            }
        };

        match decision {
            SlopDecision::Wait => {}
            SlopDecision::Abort(reason) => {
                self.end_session(reason, ClassifierState::Ignoring, events);
            }
            SlopDecision::Track => {
                let velocity = self.velocity.velocity();
                let update = track(
                    session,
                    sample,
                    &self.config,
                    velocity,
                    self.long_swipe_threshold,
                    events,
                );
                events.push(ClassifierEvent::Moved(update));
            }
        }
    }

    fn on_up(&mut self, sample: &TouchSample, events: &mut Vec<ClassifierEvent>) {
        let session = match std::mem::replace(&mut self.state, ClassifierState::Idle) {
            ClassifierState::Tracking(session) => session,
            ClassifierState::Ignoring | ClassifierState::Idle => return,
        };

        self.velocity.add_movement(sample.timestamp_ms, sample.x, sample.y);
        let (x_velocity, _) = self.velocity.velocity();
        self.velocity.clear();

        let resolution = session.resolution(None);
        let triggered = resolution.outcome.is_triggered();
        events.push(ClassifierEvent::Released {
            trigger_back: triggered,
        });

        if triggered {
            let held_long_enough = session.vibration_time_ms.map_or(true, |tick| {
                sample.timestamp_ms.saturating_sub(tick) >= GESTURE_DURATION_FOR_CLICK_MS
            });
            if x_velocity.abs() < MAX_CLICK_VELOCITY || held_long_enough {
                events.push(ClassifierEvent::Haptic(HapticEffect::Click));
            }
        }

        tracing::debug!(
            "Back gesture resolved: {:?} ({:?})",
            resolution.outcome,
            resolution.gesture_type
        );
        events.push(ClassifierEvent::Resolved(resolution));
    }

    fn end_session(
        &mut self,
        reason: AbortReason,
        next: ClassifierState,
        events: &mut Vec<ClassifierEvent>,
    ) {
        match std::mem::replace(&mut self.state, next) {
            ClassifierState::Tracking(session) => {
                tracing::debug!("Back gesture aborted: {:?}", reason);
                events.push(ClassifierEvent::Cancelled { reason });
                events.push(ClassifierEvent::Resolved(session.resolution(Some(reason))));
            }
            ClassifierState::Ignoring | ClassifierState::Idle => {}
        }
        self.velocity.clear();
    }
}

/// Per-sample update once the touch slop was crossed
fn track(
    session: &mut GestureSession,
    sample: &TouchSample,
    config: &EdgeConfig,
    (x_velocity, y_velocity): (f64, f64),
    long_swipe_threshold: f64,
    events: &mut Vec<ClassifierEvent>,
) -> MoveUpdate {
    let x_offset = sample.x - session.start.x;
    let y_offset = sample.y - session.start.y;
    let touch_translation = x_offset.abs();

    if !session.drag_slop_passed && touch_translation > config.drag_threshold {
        session.drag_slop_passed = true;
        session.vibration_time_ms = Some(sample.timestamp_ms);
        session.trigger_back = true;
        events.push(ClassifierEvent::Haptic(HapticEffect::Tick));
        events.push(ClassifierEvent::DragSlopPassed);
    }

    // Direction vote: only a sustained reversal flips the decision
    let delta = touch_translation - session.previous_touch_translation;
    if delta != 0.0 {
        if sign(delta) == sign(session.total_touch_delta) {
            session.total_touch_delta += delta;
        } else {
            session.total_touch_delta = delta;
        }
    }
    session.previous_touch_translation = touch_translation;

    let mut trigger_back = session.trigger_back;
    if session.total_touch_delta.abs() > config.min_delta_for_switch {
        trigger_back = session.total_touch_delta > 0.0;
    }

    let speed = x_velocity.hypot(y_velocity);
    let mut angle_offset = (speed / 1000.0 * config.arrow_angle_per_1000_speed)
        .min(config.arrow_max_angle_speed_offset)
        * sign(x_velocity);
    if session.is_left_edge == config.arrows_point_left {
        angle_offset = -angle_offset;
    }
    session.angle_offset = angle_offset;

    if y_offset.abs() > x_offset.abs() * 2.0 {
        session.drifted_vertically = true;
    }
    if session.drifted_vertically {
        trigger_back = false;
    }

    if trigger_back != session.trigger_back {
        tracing::trace!("Back gesture trigger_back -> {}", trigger_back);
    }
    session.trigger_back = trigger_back;

    if long_swipe_threshold > 0.0 {
        let trigger_long_swipe = trigger_back && touch_translation > long_swipe_threshold;
        if trigger_long_swipe != session.trigger_long_swipe {
            session.trigger_long_swipe = trigger_long_swipe;
            events.push(ClassifierEvent::Haptic(HapticEffect::Click));
        }
    } else {
        session.trigger_long_swipe = false;
    }

    MoveUpdate {
        touch_translation,
        y: sample.y,
        y_offset,
        trigger_back: session.trigger_back,
        trigger_long_swipe: session.trigger_long_swipe,
        angle_offset,
    }
}
