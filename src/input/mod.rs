//! Input handling for the edge back gesture
//!
//! Raw samples from the monitored input channel flow through the
//! [`InputSession`] into the [`GestureClassifier`]; geometry and velocity
//! helpers live in their own modules.

pub mod geometry;
pub mod gestures;
pub mod session;
pub mod touch;
pub mod velocity;

pub use geometry::{Insets, Region};
pub use gestures::{
    AbortReason, BackGestureType, BackKeyEvent, ClassifierEvent, ClassifierPhase,
    GestureClassifier, GestureOutcome, GestureResolution, GestureSession, HapticEffect, KeyAction,
    MoveUpdate, RejectReason,
};
pub use session::{
    ExclusionMailbox, ExclusionUpdate, GestureObserver, InputMonitor, InputSession,
    MonitorChannel, NavigationMode, WindowManager,
};
pub use touch::{TouchAction, TouchSample};
pub use velocity::VelocityTracker;

/// Identifier of a display as known to the window manager
pub type DisplayId = i32;
