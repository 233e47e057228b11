//! Raw touch samples delivered by the monitored input channel

use serde::{Deserialize, Serialize};
use smithay::utils::{Logical, Point};

/// Masked pointer action of a sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TouchAction {
    Down,
    Move,
    Up,
    Cancel,
    /// An additional finger went down
    PointerDown,
    /// An additional finger went up while the primary stays down
    PointerUp,
}

/// One reported sample of the primary pointer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TouchSample {
    pub x: f64,
    pub y: f64,
    pub timestamp_ms: i64,
    pub action: TouchAction,
}

impl TouchSample {
    pub fn new(action: TouchAction, x: f64, y: f64, timestamp_ms: i64) -> Self {
        Self {
            x,
            y,
            timestamp_ms,
            action,
        }
    }

    pub fn down(x: f64, y: f64, timestamp_ms: i64) -> Self {
        Self::new(TouchAction::Down, x, y, timestamp_ms)
    }

    pub fn moved(x: f64, y: f64, timestamp_ms: i64) -> Self {
        Self::new(TouchAction::Move, x, y, timestamp_ms)
    }

    pub fn up(x: f64, y: f64, timestamp_ms: i64) -> Self {
        Self::new(TouchAction::Up, x, y, timestamp_ms)
    }

    pub fn position(&self) -> Point<f64, Logical> {
        Point::from((self.x, self.y))
    }
}
