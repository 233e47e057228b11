//! Edge back gesture lifecycle
//!
//! The session is enabled only while the navigation bar is attached and the
//! navigation mode is gestural. While enabled it owns the monitored input
//! channel and the exclusion listener registration, feeds every raw sample
//! through the classifier and forwards the decisions to the edge panel and
//! the [`GestureObserver`].
//!
//! Exclusion updates may arrive on any thread. The window manager publishes
//! them into the session's [`ExclusionMailbox`]; the latest one is applied
//! right before the next sample is classified.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use smithay::utils::{Logical, Rectangle, Size};

use super::geometry::{Insets, Region};
use super::gestures::{AbortReason, ClassifierEvent, GestureClassifier, GestureResolution, HapticEffect};
use super::touch::TouchSample;
use super::DisplayId;
use crate::config::EdgeConfig;
use crate::panel::{ArrowPath, VisualFeedbackController, VisualState};
use crate::Result;

/// Name the gesture input monitor is registered under
const MONITOR_NAME: &str = "edge-swipe";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavigationMode {
    ThreeButton,
    TwoButton,
    Gestural,
}

/// A registered input monitor
pub trait MonitorChannel {
    /// Take the current pointers away from the windows below
    fn pilfer_pointers(&mut self);

    fn dispose(&mut self);
}

/// Source of monitored gesture input
pub trait InputMonitor {
    fn monitor_gesture_input(
        &mut self,
        name: &str,
        display_id: DisplayId,
    ) -> Result<Box<dyn MonitorChannel>>;
}

pub trait WindowManager {
    fn display_size(&self, display_id: DisplayId) -> Size<i32, Logical>;

    /// Start publishing exclusion changes of `display_id` into `mailbox`
    fn register_exclusion_listener(
        &mut self,
        display_id: DisplayId,
        mailbox: ExclusionMailbox,
    ) -> Result<()>;

    fn unregister_exclusion_listener(&mut self, display_id: DisplayId) -> Result<()>;
}

/// Receives gesture decisions
pub trait GestureObserver {
    /// Called exactly once per gesture. Triggered outcomes should inject
    /// [`GestureOutcome::key_events`](super::GestureOutcome::key_events).
    fn on_resolved(&mut self, resolution: &GestureResolution);

    fn on_visual_state_changed(&mut self, _state: &VisualState) {}

    fn on_haptic(&mut self, _effect: HapticEffect) {}
}

/// Exclusion regions of one display
#[derive(Debug, Clone, PartialEq)]
pub struct ExclusionUpdate {
    pub display_id: DisplayId,
    pub strict: Region,
    /// Defaults to `strict` when absent
    pub unrestricted: Option<Region>,
}

/// Latest-value slot for exclusion updates, shareable across threads
#[derive(Debug, Clone, Default)]
pub struct ExclusionMailbox {
    slot: Arc<Mutex<Option<ExclusionUpdate>>>,
}

impl ExclusionMailbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace any update not yet taken
    pub fn publish(&self, update: ExclusionUpdate) {
        *self.lock() = Some(update);
    }

    pub fn take(&self) -> Option<ExclusionUpdate> {
        self.lock().take()
    }

    fn lock(&self) -> MutexGuard<'_, Option<ExclusionUpdate>> {
        // A panicked publisher cannot leave the slot half-written
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub struct InputSession<M, W, O>
where
    M: InputMonitor,
    W: WindowManager,
    O: GestureObserver,
{
    display_id: DisplayId,
    config: EdgeConfig,
    input_monitor: M,
    window_manager: W,
    observer: O,
    classifier: GestureClassifier,
    panel: VisualFeedbackController,
    channel: Option<Box<dyn MonitorChannel>>,
    mailbox: ExclusionMailbox,
    listener_registered: bool,
    is_attached: bool,
    navigation_mode: NavigationMode,
    requested_enabled: bool,
    left_inset: f64,
    right_inset: f64,
    ime_height: f64,
    last_visual_state: VisualState,
}

impl<M, W, O> InputSession<M, W, O>
where
    M: InputMonitor,
    W: WindowManager,
    O: GestureObserver,
{
    pub fn new(
        display_id: DisplayId,
        config: EdgeConfig,
        input_monitor: M,
        window_manager: W,
        observer: O,
    ) -> Self {
        let display = window_manager.display_size(display_id);
        let classifier = GestureClassifier::new(config.clone(), display);
        let panel = VisualFeedbackController::new(config.clone(), display);
        let last_visual_state = panel.current_visual_state();

        let mut session = Self {
            display_id,
            config,
            input_monitor,
            window_manager,
            observer,
            classifier,
            panel,
            channel: None,
            mailbox: ExclusionMailbox::new(),
            listener_registered: false,
            is_attached: false,
            navigation_mode: NavigationMode::ThreeButton,
            requested_enabled: false,
            left_inset: 0.0,
            right_inset: 0.0,
            ime_height: 0.0,
            last_visual_state,
        };
        session.apply_insets();
        session.apply_long_swipe_threshold();
        session
    }

    pub fn display_id(&self) -> DisplayId {
        self.display_id
    }

    pub fn config(&self) -> &EdgeConfig {
        &self.config
    }

    pub fn is_enabled(&self) -> bool {
        self.channel.is_some()
    }

    pub fn classifier(&self) -> &GestureClassifier {
        &self.classifier
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    pub fn observer_mut(&mut self) -> &mut O {
        &mut self.observer
    }

    pub fn input_monitor_mut(&mut self) -> &mut M {
        &mut self.input_monitor
    }

    pub fn window_manager(&self) -> &W {
        &self.window_manager
    }

    /// Handle for the window manager to publish exclusion updates into
    pub fn exclusion_mailbox(&self) -> ExclusionMailbox {
        self.mailbox.clone()
    }

    pub fn on_nav_bar_attached(&mut self) {
        self.is_attached = true;
        self.update_is_enabled();
    }

    pub fn on_nav_bar_detached(&mut self) {
        self.is_attached = false;
        self.update_is_enabled();
    }

    pub fn on_navigation_mode_changed(&mut self, mode: NavigationMode) {
        self.navigation_mode = mode;
        self.update_is_enabled();
    }

    /// Side insets of the display, in pixels
    pub fn set_insets(&mut self, left: f64, right: f64) {
        self.left_inset = left;
        self.right_inset = right;
        self.apply_insets();
    }

    pub fn on_ime_visibility_changed(&mut self, visible: bool, height: f64) {
        self.ime_height = if visible { height } else { 0.0 };
        self.apply_insets();
    }

    pub fn set_exclude_top(&mut self, exclude_top: bool) {
        self.config.exclude_top = exclude_top;
        self.apply_insets();
    }

    /// Re-query the display size, e.g. after a rotation
    pub fn on_display_changed(&mut self) {
        let display_size = self.window_manager.display_size(self.display_id);
        tracing::debug!("Display {} is now {}x{}", self.display_id, display_size.w, display_size.h);
        self.classifier.set_display_size(display_size);
        self.panel.set_display_size(display_size);
        self.apply_long_swipe_threshold();
    }

    /// New resources: dimensions, layout direction or colours changed
    ///
    /// Runtime toggles from [`set_long_swipe_enabled`](Self::set_long_swipe_enabled)
    /// and [`set_exclude_top`](Self::set_exclude_top) are kept.
    pub fn on_configuration_changed(&mut self, mut config: EdgeConfig) {
        config.long_swipe_enabled = self.config.long_swipe_enabled;
        config.exclude_top = self.config.exclude_top;
        self.classifier.set_config(config.clone());
        self.panel.set_config(config.clone());
        self.config = config;
        self.apply_insets();
        self.apply_long_swipe_threshold();
        self.notify_visual_state();
    }

    /// Transient system bars over an immersive-sticky app
    pub fn on_system_ui_visibility_changed(&mut self, transient_immersive: bool) {
        self.classifier.set_transient_immersive(transient_immersive);
    }

    pub fn set_back_gesture_disabled(&mut self, disabled: bool) {
        self.classifier.set_back_gesture_disabled(disabled);
    }

    pub fn set_long_swipe_enabled(&mut self, enabled: bool) {
        self.config.long_swipe_enabled = enabled;
        self.apply_long_swipe_threshold();
    }

    /// Luma sampling result for the area under the arrow
    pub fn on_region_darkness_changed(&mut self, is_region_dark: bool) {
        // Light arrow over dark content
        self.panel.set_is_dark(!is_region_dark, true);
        self.notify_visual_state();
    }

    /// Classify one raw sample of the monitored channel
    pub fn on_touch(&mut self, sample: &TouchSample) {
        if !self.is_enabled() {
            return;
        }
        self.apply_pending_exclusion();
        let events = self.classifier.on_touch(sample);
        self.dispatch(events);
    }

    /// Advance the arrow animations by one frame
    pub fn on_frame(&mut self, dt_ms: f64) {
        self.panel.tick(dt_ms);
        self.notify_visual_state();
    }

    pub fn is_animating(&self) -> bool {
        self.panel.is_animating()
    }

    pub fn current_visual_state(&self) -> VisualState {
        self.panel.current_visual_state()
    }

    pub fn current_sampling_rect(&self) -> Rectangle<i32, Logical> {
        self.panel.current_sampling_rect()
    }

    pub fn arrow_path(&self) -> Option<ArrowPath> {
        self.panel.arrow_path()
    }

    pub fn dump(&self) -> String {
        let display = self.classifier.display_size();
        let insets = self.classifier.insets();
        [
            format!("InputSession (display {}):", self.display_id),
            format!("  enabled={}", self.is_enabled()),
            format!("  attached={}", self.is_attached),
            format!("  navigation_mode={:?}", self.navigation_mode),
            format!("  phase={:?}", self.classifier.phase()),
            format!("  back_gesture_disabled={}", self.classifier.is_back_gesture_disabled()),
            format!("  transient_immersive={}", self.classifier.is_transient_immersive()),
            format!("  display={}x{}", display.w, display.h),
            format!("  insets={:?}", insets),
            format!("  edge_width={}", self.config.edge_width),
            format!("  long_swipe_threshold={}", self.classifier.long_swipe_threshold()),
            format!("  strict_exclusion={:?}", self.classifier.strict_exclusion().rects()),
            format!(
                "  unrestricted_exclusion={:?}",
                self.classifier.unrestricted_exclusion().rects()
            ),
            format!("  arrow_visible={}", self.panel.is_visible()),
        ]
        .join("\n")
    }

    fn update_is_enabled(&mut self) {
        let requested = self.is_attached && self.navigation_mode == NavigationMode::Gestural;
        if requested == self.requested_enabled {
            return;
        }
        self.requested_enabled = requested;
        if requested {
            self.enable();
        } else {
            self.disable();
        }
    }

    fn enable(&mut self) {
        self.on_display_changed();

        match self
            .window_manager
            .register_exclusion_listener(self.display_id, self.mailbox.clone())
        {
            Ok(()) => self.listener_registered = true,
            // Without exclusions every edge touch is allowed
            Err(e) => tracing::warn!(
                "Failed to register exclusion listener for display {}: {}",
                self.display_id,
                e
            ),
        }

        match self
            .input_monitor
            .monitor_gesture_input(MONITOR_NAME, self.display_id)
        {
            Ok(channel) => {
                self.channel = Some(channel);
                tracing::info!("Edge back gesture enabled on display {}", self.display_id);
            }
            Err(e) => {
                tracing::error!(
                    "Failed to monitor gesture input on display {}: {}",
                    self.display_id,
                    e
                );
                self.unregister_exclusion_listener();
            }
        }
    }

    fn disable(&mut self) {
        let events = self.classifier.abort(AbortReason::Disabled);
        self.dispatch(events);
        self.panel.reset();
        self.notify_visual_state();

        if let Some(mut channel) = self.channel.take() {
            channel.dispose();
            tracing::info!("Edge back gesture disabled on display {}", self.display_id);
        }
        self.unregister_exclusion_listener();
        self.classifier.clear_exclusion();
        self.mailbox.take();
    }

    fn unregister_exclusion_listener(&mut self) {
        if !self.listener_registered {
            return;
        }
        self.listener_registered = false;
        if let Err(e) = self
            .window_manager
            .unregister_exclusion_listener(self.display_id)
        {
            tracing::warn!(
                "Failed to unregister exclusion listener for display {}: {}",
                self.display_id,
                e
            );
        }
    }

    fn apply_pending_exclusion(&mut self) {
        let Some(update) = self.mailbox.take() else {
            return;
        };
        if update.display_id != self.display_id {
            tracing::debug!(
                "Ignoring exclusion update for display {} on display {}",
                update.display_id,
                self.display_id
            );
            return;
        }
        self.classifier
            .set_exclusion(update.strict, update.unrestricted);
    }

    fn insets(&self) -> Insets {
        Insets {
            left: self.left_inset,
            right: self.right_inset,
            ime_height: self.ime_height,
            nav_bar_height: self.config.nav_bar_height,
            top_exclusion: if self.config.exclude_top {
                self.config.top_exclusion_size
            } else {
                0.0
            },
        }
    }

    fn apply_insets(&mut self) {
        let insets = self.insets();
        self.classifier.set_insets(insets);
        self.panel.set_insets(insets);
    }

    fn apply_long_swipe_threshold(&mut self) {
        let width = self.classifier.display_size().w as f64;
        let threshold = self.config.long_swipe_threshold_for(width);
        self.classifier.set_long_swipe_threshold(threshold);
    }

    fn dispatch(&mut self, events: Vec<ClassifierEvent>) {
        for event in &events {
            match event {
                ClassifierEvent::ThresholdCrossed => {
                    if let Some(channel) = self.channel.as_mut() {
                        channel.pilfer_pointers();
                    }
                }
                ClassifierEvent::Haptic(effect) => self.observer.on_haptic(*effect),
                ClassifierEvent::Resolved(resolution) => self.observer.on_resolved(resolution),
                _ => {}
            }
            self.panel.on_classifier_event(event);
        }
        self.notify_visual_state();
    }

    fn notify_visual_state(&mut self) {
        let state = self.panel.current_visual_state();
        if state != self.last_visual_state {
            self.last_visual_state = state;
            self.observer.on_visual_state_changed(&state);
        }
    }
}

impl<M, W, O> Drop for InputSession<M, W, O>
where
    M: InputMonitor,
    W: WindowManager,
    O: GestureObserver,
{
    fn drop(&mut self) {
        if let Some(mut channel) = self.channel.take() {
            channel.dispose();
        }
        self.unregister_exclusion_listener();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::gestures::{GestureOutcome, RejectReason};
    use crate::input::touch::TouchAction;
    use crate::Error;
    use smithay::utils::Point;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Debug, Default)]
    struct Calls {
        monitors_opened: usize,
        disposed: usize,
        pilfered: usize,
        registered: usize,
        unregistered: usize,
    }

    type SharedCalls = Rc<RefCell<Calls>>;

    struct FakeChannel {
        calls: SharedCalls,
    }

    impl MonitorChannel for FakeChannel {
        fn pilfer_pointers(&mut self) {
            self.calls.borrow_mut().pilfered += 1;
        }

        fn dispose(&mut self) {
            self.calls.borrow_mut().disposed += 1;
        }
    }

    struct FakeMonitor {
        calls: SharedCalls,
        fail: bool,
    }

    impl InputMonitor for FakeMonitor {
        fn monitor_gesture_input(
            &mut self,
            name: &str,
            _display_id: DisplayId,
        ) -> Result<Box<dyn MonitorChannel>> {
            assert_eq!(name, MONITOR_NAME);
            if self.fail {
                return Err(Error::MonitorRegistration("input service unavailable".into()));
            }
            self.calls.borrow_mut().monitors_opened += 1;
            Ok(Box::new(FakeChannel {
                calls: self.calls.clone(),
            }))
        }
    }

    struct FakeWindowManager {
        calls: SharedCalls,
        size: Size<i32, Logical>,
        fail_listener: bool,
    }

    impl WindowManager for FakeWindowManager {
        fn display_size(&self, _display_id: DisplayId) -> Size<i32, Logical> {
            self.size
        }

        fn register_exclusion_listener(
            &mut self,
            _display_id: DisplayId,
            _mailbox: ExclusionMailbox,
        ) -> Result<()> {
            if self.fail_listener {
                return Err(Error::ExclusionListener("window manager unavailable".into()));
            }
            self.calls.borrow_mut().registered += 1;
            Ok(())
        }

        fn unregister_exclusion_listener(&mut self, _display_id: DisplayId) -> Result<()> {
            self.calls.borrow_mut().unregistered += 1;
            Ok(())
        }
    }

    #[derive(Default)]
    struct Recorder {
        resolutions: Vec<GestureResolution>,
        haptics: Vec<HapticEffect>,
        visual_updates: usize,
    }

    impl GestureObserver for Recorder {
        fn on_resolved(&mut self, resolution: &GestureResolution) {
            self.resolutions.push(*resolution);
        }

        fn on_visual_state_changed(&mut self, _state: &VisualState) {
            self.visual_updates += 1;
        }

        fn on_haptic(&mut self, effect: HapticEffect) {
            self.haptics.push(effect);
        }
    }

    type TestSession = InputSession<FakeMonitor, FakeWindowManager, Recorder>;

    fn session_with(fail_monitor: bool, fail_listener: bool) -> (TestSession, SharedCalls) {
        let calls = SharedCalls::default();
        let session = InputSession::new(
            0,
            EdgeConfig::default(),
            FakeMonitor {
                calls: calls.clone(),
                fail: fail_monitor,
            },
            FakeWindowManager {
                calls: calls.clone(),
                size: Size::from((1080, 2000)),
                fail_listener,
            },
            Recorder::default(),
        );
        (session, calls)
    }

    fn enabled_session() -> (TestSession, SharedCalls) {
        let (mut session, calls) = session_with(false, false);
        session.on_nav_bar_attached();
        session.on_navigation_mode_changed(NavigationMode::Gestural);
        assert!(session.is_enabled());
        (session, calls)
    }

    fn swipe(session: &mut TestSession, y: f64, t: i64) {
        session.on_touch(&TouchSample::down(2.0, y, t));
        session.on_touch(&TouchSample::moved(150.0, y, t + 16));
        session.on_touch(&TouchSample::up(150.0, y, t + 32));
    }

    fn excluded_left_band(display_id: DisplayId) -> ExclusionUpdate {
        ExclusionUpdate {
            display_id,
            strict: Region::from_rects([Rectangle::new(
                Point::from((0, 0)),
                Size::from((100, 1000)),
            )]),
            unrestricted: None,
        }
    }

    #[test]
    fn test_enable_requires_attached_and_gestural() {
        let (mut session, calls) = session_with(false, false);
        session.on_navigation_mode_changed(NavigationMode::Gestural);
        assert!(!session.is_enabled());

        session.on_navigation_mode_changed(NavigationMode::ThreeButton);
        session.on_nav_bar_attached();
        assert!(!session.is_enabled());

        session.on_navigation_mode_changed(NavigationMode::Gestural);
        assert!(session.is_enabled());
        assert_eq!(calls.borrow().monitors_opened, 1);
        assert_eq!(calls.borrow().registered, 1);
    }

    #[test]
    fn test_enable_is_idempotent() {
        let (mut session, calls) = enabled_session();
        session.on_nav_bar_attached();
        session.on_navigation_mode_changed(NavigationMode::Gestural);
        session.on_navigation_mode_changed(NavigationMode::Gestural);

        let calls = calls.borrow();
        assert_eq!(calls.monitors_opened, 1);
        assert_eq!(calls.registered, 1);
        assert_eq!(calls.disposed, 0);
        assert_eq!(calls.unregistered, 0);
    }

    #[test]
    fn test_disable_releases_resources() {
        let (mut session, calls) = enabled_session();
        session.on_navigation_mode_changed(NavigationMode::TwoButton);
        assert!(!session.is_enabled());
        assert_eq!(calls.borrow().disposed, 1);
        assert_eq!(calls.borrow().unregistered, 1);

        session.on_nav_bar_detached();
        assert_eq!(calls.borrow().disposed, 1);
        assert_eq!(calls.borrow().unregistered, 1);
    }

    #[test]
    fn test_monitor_failure_retried_on_next_transition() {
        let (mut session, calls) = session_with(true, false);
        session.on_nav_bar_attached();
        session.on_navigation_mode_changed(NavigationMode::Gestural);
        assert!(!session.is_enabled());
        // The listener registration is rolled back
        assert_eq!(calls.borrow().registered, 1);
        assert_eq!(calls.borrow().unregistered, 1);

        // Same state again: no retry
        session.input_monitor_mut().fail = false;
        session.on_navigation_mode_changed(NavigationMode::Gestural);
        assert!(!session.is_enabled());

        session.on_nav_bar_detached();
        session.on_nav_bar_attached();
        assert!(session.is_enabled());
        assert_eq!(calls.borrow().monitors_opened, 1);
    }

    #[test]
    fn test_listener_failure_fails_open() {
        let (mut session, calls) = session_with(false, true);
        session.on_nav_bar_attached();
        session.on_navigation_mode_changed(NavigationMode::Gestural);
        assert!(session.is_enabled());

        swipe(&mut session, 500.0, 0);
        assert_eq!(session.observer().resolutions[0].outcome, GestureOutcome::Back);

        session.on_nav_bar_detached();
        assert_eq!(calls.borrow().unregistered, 0);
    }

    #[test]
    fn test_swipe_reports_back_and_pilfers() {
        let (mut session, calls) = enabled_session();
        swipe(&mut session, 500.0, 0);

        let observer = session.observer();
        assert_eq!(observer.resolutions.len(), 1);
        assert_eq!(observer.resolutions[0].outcome, GestureOutcome::Back);
        assert_eq!(observer.resolutions[0].start(), Point::from((2.0, 500.0)));
        assert!(observer.haptics.contains(&HapticEffect::Tick));
        assert!(observer.visual_updates > 0);
        assert_eq!(calls.borrow().pilfered, 1);
    }

    #[test]
    fn test_touches_ignored_while_disabled() {
        let (mut session, _calls) = session_with(false, false);
        swipe(&mut session, 500.0, 0);
        assert!(session.observer().resolutions.is_empty());
        assert_eq!(session.observer().visual_updates, 0);
    }

    #[test]
    fn test_exclusion_published_from_another_thread() {
        let (mut session, _calls) = enabled_session();
        let mailbox = session.exclusion_mailbox();
        std::thread::spawn(move || mailbox.publish(excluded_left_band(0)))
            .join()
            .unwrap();

        swipe(&mut session, 500.0, 0);
        let resolutions = &session.observer().resolutions;
        assert_eq!(resolutions.len(), 1);
        assert_eq!(
            resolutions[0].outcome,
            GestureOutcome::Rejected(RejectReason::Excluded)
        );

        // Outside the excluded band
        swipe(&mut session, 1500.0, 100);
        assert_eq!(session.observer().resolutions[1].outcome, GestureOutcome::Back);
    }

    #[test]
    fn test_exclusion_for_other_display_ignored() {
        let (mut session, _calls) = enabled_session();
        session.exclusion_mailbox().publish(excluded_left_band(7));
        swipe(&mut session, 500.0, 0);
        assert_eq!(session.observer().resolutions[0].outcome, GestureOutcome::Back);
    }

    #[test]
    fn test_disable_clears_exclusion() {
        let (mut session, _calls) = enabled_session();
        session.exclusion_mailbox().publish(excluded_left_band(0));
        session.on_touch(&TouchSample::new(TouchAction::Cancel, 0.0, 0.0, 0));
        assert!(!session.classifier().strict_exclusion().is_empty());

        session.on_nav_bar_detached();
        assert!(session.classifier().strict_exclusion().is_empty());
    }

    #[test]
    fn test_teardown_mid_gesture() {
        let (mut session, calls) = enabled_session();
        session.on_touch(&TouchSample::down(2.0, 500.0, 0));
        session.on_touch(&TouchSample::moved(150.0, 500.0, 16));

        session.on_navigation_mode_changed(NavigationMode::ThreeButton);
        let resolutions = &session.observer().resolutions;
        assert_eq!(resolutions.len(), 1);
        assert_eq!(resolutions[0].abort, Some(AbortReason::Disabled));
        assert!(!resolutions[0].outcome.is_triggered());
        assert!(!session.current_visual_state().visible);
        assert_eq!(calls.borrow().disposed, 1);

        // The rest of the stream goes nowhere
        session.on_touch(&TouchSample::up(150.0, 500.0, 32));
        assert_eq!(session.observer().resolutions.len(), 1);

        session.on_navigation_mode_changed(NavigationMode::Gestural);
        swipe(&mut session, 500.0, 100);
        assert_eq!(session.observer().resolutions.len(), 2);
        assert_eq!(session.observer().resolutions[1].outcome, GestureOutcome::Back);
    }

    #[test]
    fn test_mailbox_keeps_latest() {
        let mailbox = ExclusionMailbox::new();
        assert!(mailbox.take().is_none());

        mailbox.publish(excluded_left_band(1));
        mailbox.publish(excluded_left_band(2));
        assert_eq!(mailbox.take().map(|update| update.display_id), Some(2));
        assert!(mailbox.take().is_none());
    }

    #[test]
    fn test_frames_animate_arrow() {
        let (mut session, _calls) = enabled_session();
        session.on_touch(&TouchSample::down(2.0, 500.0, 0));
        session.on_touch(&TouchSample::moved(150.0, 500.0, 16));
        assert!(session.is_animating());

        let before = session.observer().visual_updates;
        session.on_frame(16.0);
        assert!(session.observer().visual_updates > before);
        assert!(session.arrow_path().is_some());
    }

    #[test]
    fn test_long_swipe_toggle() {
        let (mut session, _calls) = enabled_session();
        assert_eq!(session.classifier().long_swipe_threshold(), 0.0);

        session.set_long_swipe_enabled(true);
        let config = session.config().clone();
        assert_eq!(
            session.classifier().long_swipe_threshold(),
            (1080.0f64 * 0.5).min(config.panel_width * 2.5)
        );

        session.set_long_swipe_enabled(false);
        assert_eq!(session.classifier().long_swipe_threshold(), 0.0);
    }

    #[test]
    fn test_ime_blocks_edge() {
        let (mut session, _calls) = enabled_session();
        session.on_ime_visibility_changed(true, 900.0);
        swipe(&mut session, 1500.0, 0);
        assert!(session.observer().resolutions.is_empty());

        session.on_ime_visibility_changed(false, 900.0);
        swipe(&mut session, 1500.0, 100);
        assert_eq!(session.observer().resolutions.len(), 1);
    }

    #[test]
    fn test_back_gesture_disabled() {
        let (mut session, _calls) = enabled_session();
        session.set_back_gesture_disabled(true);
        swipe(&mut session, 500.0, 0);
        assert!(session.observer().resolutions.is_empty());
    }

    #[test]
    fn test_region_darkness_picks_contrasting_arrow() {
        let (mut session, _calls) = enabled_session();
        let config = session.config().clone();

        session.on_region_darkness_changed(false);
        session.on_frame(200.0);
        assert_eq!(
            session.current_visual_state().current_color,
            config.arrow_color_dark
        );

        session.on_region_darkness_changed(true);
        session.on_frame(200.0);
        assert_eq!(
            session.current_visual_state().current_color,
            config.arrow_color_light
        );
    }

    #[test]
    fn test_configuration_change_keeps_runtime_toggles() {
        let (mut session, _calls) = enabled_session();
        session.set_long_swipe_enabled(true);
        session.set_exclude_top(true);

        session.on_configuration_changed(EdgeConfig::default());
        assert!(session.config().long_swipe_enabled);
        assert!(session.config().exclude_top);
        assert!(session.classifier().long_swipe_threshold() > 0.0);
    }

    #[test]
    fn test_dump() {
        let (session, _calls) = enabled_session();
        let dump = session.dump();
        assert!(dump.contains("enabled=true"));
        assert!(dump.contains("navigation_mode=Gestural"));
    }

    #[test]
    fn test_drop_disposes_channel() {
        let (session, calls) = enabled_session();
        drop(session);
        assert_eq!(calls.borrow().disposed, 1);
        assert_eq!(calls.borrow().unregistered, 1);
    }
}
