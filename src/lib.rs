//! Edge back gesture for the Flick mobile shell
//!
//! Classifies the raw touch stream of a display into "back gesture" or
//! "not a back gesture" and drives the arrow affordance that follows the
//! finger while the gesture is in progress.
//!
//! # Architecture
//!
//! ```text
//!   host input (monitor channel)        exclusion updates (any thread)
//!              │                                   │
//!              ▼                                   ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        InputSession                          │
//! │   enable/disable, pilfering, ExclusionMailbox draining       │
//! │  ┌──────────────────────┐      ┌──────────────────────────┐  │
//! │  │  GestureClassifier   │ ───▶ │ VisualFeedbackController │  │
//! │  │ (state machine)      │      │ (springs, panel, rect)   │  │
//! │  └──────────────────────┘      └──────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//!              │                                   │
//!              ▼                                   ▼
//!   GestureObserver::on_resolved     GestureObserver::on_visual_state_changed
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use flick_edge_back::{EdgeConfig, InputSession, NavigationMode};
//!
//! let mut session = InputSession::new(0, EdgeConfig::load_or_default(), monitor, wm, observer);
//! session.on_nav_bar_attached();
//! session.on_navigation_mode_changed(NavigationMode::Gestural);
//! // For every raw sample delivered by the monitor channel:
//! session.on_touch(&sample);
//! // Once per frame:
//! session.on_frame(16.0);
//! ```

pub mod animation;
pub mod config;
pub mod error;
pub mod input;
pub mod panel;

pub use config::{EdgeConfig, SpringConfig};
pub use error::Error;
pub use input::{
    AbortReason, BackGestureType, ClassifierEvent, ClassifierPhase, DisplayId, ExclusionMailbox,
    ExclusionUpdate, GestureClassifier, GestureObserver, GestureOutcome, GestureResolution,
    HapticEffect, InputMonitor, InputSession, Insets, MonitorChannel, NavigationMode, Region,
    RejectReason, TouchAction, TouchSample, WindowManager,
};
pub use panel::{VisualFeedbackController, VisualState};

/// Result type for this crate
pub type Result<T> = std::result::Result<T, Error>;
