//! Animation primitives for the arrow affordance
//!
//! Provides the spring integrator used for translation, angle and vertical
//! offset, the cubic bezier curves used for rubber banding, and fixed
//! duration animations for fades and colour changes. Everything is stepped
//! explicitly by the host frame clock.

use serde::{Deserialize, Serialize};

/// Springs below this displacement are considered settled
const VALUE_THRESHOLD: f64 = 0.75;

/// Velocity counterpart of [`VALUE_THRESHOLD`] (px/s)
const VELOCITY_THRESHOLD: f64 = VALUE_THRESHOLD * 62.5;

/// Spring parameters for a unit mass
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpringForce {
    pub stiffness: f64,
    pub damping_ratio: f64,
}

impl SpringForce {
    pub const STIFFNESS_MEDIUM: f64 = 1500.0;
    pub const DAMPING_RATIO_MEDIUM_BOUNCY: f64 = 0.5;
    pub const DAMPING_RATIO_LOW_BOUNCY: f64 = 0.75;
    pub const DAMPING_RATIO_NO_BOUNCY: f64 = 1.0;

    pub const fn new(stiffness: f64, damping_ratio: f64) -> Self {
        Self {
            stiffness,
            damping_ratio,
        }
    }

    /// Closed-form solution of the damped oscillator over `dt_ms`.
    ///
    /// Returns the new `(value, velocity)`. Solving analytically instead of
    /// integrating keeps long frames (dropped vsyncs) from blowing up.
    pub fn step(&self, value: f64, velocity: f64, target: f64, dt_ms: f64) -> (f64, f64) {
        let t = dt_ms.max(0.0) / 1000.0;
        let x0 = value - target;
        let v0 = velocity;
        let w0 = self.stiffness.max(0.0).sqrt();
        let zeta = self.damping_ratio.max(0.0);

        let (x, v) = if w0 == 0.0 {
            (x0 + v0 * t, v0)
        } else if zeta > 1.0 {
            let root = w0 * (zeta * zeta - 1.0).sqrt();
            let gamma_minus = -zeta * w0 - root;
            let gamma_plus = -zeta * w0 + root;
            let coeff_b = (gamma_minus * x0 - v0) / (gamma_minus - gamma_plus);
            let coeff_a = x0 - coeff_b;
            let e_minus = (gamma_minus * t).exp();
            let e_plus = (gamma_plus * t).exp();
            (
                coeff_a * e_minus + coeff_b * e_plus,
                coeff_a * gamma_minus * e_minus + coeff_b * gamma_plus * e_plus,
            )
        } else if (zeta - 1.0).abs() < f64::EPSILON {
            let coeff_a = x0;
            let coeff_b = v0 + w0 * x0;
            let decay = (-w0 * t).exp();
            let x = (coeff_a + coeff_b * t) * decay;
            (x, x * -w0 + coeff_b * decay)
        } else {
            let damped = w0 * (1.0 - zeta * zeta).sqrt();
            let cos_coeff = x0;
            let sin_coeff = (zeta * w0 * x0 + v0) / damped;
            let decay = (-zeta * w0 * t).exp();
            let (sin, cos) = (damped * t).sin_cos();
            let x = decay * (cos_coeff * cos + sin_coeff * sin);
            let v = x * -w0 * zeta + decay * (-damped * cos_coeff * sin + damped * sin_coeff * cos);
            (x, v)
        };

        (x + target, v)
    }
}

/// A spring-driven value approaching a target
#[derive(Debug, Clone)]
pub struct Spring {
    value: f64,
    velocity: f64,
    target: f64,
    force: SpringForce,
    running: bool,
    max_value: Option<f64>,
}

impl Spring {
    pub fn new(value: f64, force: SpringForce) -> Self {
        Self {
            value,
            velocity: 0.0,
            target: value,
            force,
            running: false,
            max_value: None,
        }
    }

    /// Clamp the animated value to at most `max`
    pub fn with_max_value(mut self, max: f64) -> Self {
        self.max_value = Some(max);
        self
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn velocity(&self) -> f64 {
        self.velocity
    }

    pub fn target(&self) -> f64 {
        self.target
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn set_force(&mut self, force: SpringForce) {
        self.force = force;
    }

    /// Start (or retarget) the animation, keeping the current velocity
    pub fn animate_to(&mut self, target: f64) {
        self.target = target;
        self.running = true;
    }

    /// Set the value immediately, stopping any animation
    pub fn jump_to(&mut self, value: f64) {
        self.value = self.clamp(value);
        self.target = value;
        self.velocity = 0.0;
        self.running = false;
    }

    /// Stop where the value currently is
    pub fn cancel(&mut self) {
        self.velocity = 0.0;
        self.running = false;
    }

    /// Retarget and advance in one call, returning `(value, velocity)`
    pub fn advance(&mut self, dt_ms: f64, target: f64) -> (f64, f64) {
        self.animate_to(target);
        self.step(dt_ms);
        (self.value, self.velocity)
    }

    /// Advance a running spring by `dt_ms`. Returns true while still running.
    pub fn step(&mut self, dt_ms: f64) -> bool {
        if !self.running {
            return false;
        }

        let (value, velocity) = self.force.step(self.value, self.velocity, self.target, dt_ms);
        self.value = self.clamp(value);
        self.velocity = velocity;

        if (self.value - self.target).abs() < VALUE_THRESHOLD
            && self.velocity.abs() < VELOCITY_THRESHOLD
        {
            self.value = self.clamp(self.target);
            self.velocity = 0.0;
            self.running = false;
        }

        self.running
    }

    fn clamp(&self, value: f64) -> f64 {
        match self.max_value {
            Some(max) => value.min(max),
            None => value,
        }
    }
}

/// Cubic bezier easing curve through (0,0) and (1,1)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CubicBezier {
    x1: f64,
    y1: f64,
    x2: f64,
    y2: f64,
}

impl CubicBezier {
    pub const fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Map an input fraction to the eased output fraction
    pub fn interpolate(&self, x: f64) -> f64 {
        if x.is_nan() || x <= 0.0 {
            return 0.0;
        }
        if x >= 1.0 {
            return 1.0;
        }
        let t = self.solve_t(x);
        Self::sample(self.y1, self.y2, t)
    }

    fn sample(a1: f64, a2: f64, t: f64) -> f64 {
        let u = 1.0 - t;
        3.0 * u * u * t * a1 + 3.0 * u * t * t * a2 + t * t * t
    }

    fn sample_dx(&self, t: f64) -> f64 {
        let u = 1.0 - t;
        3.0 * u * u * self.x1 + 6.0 * u * t * (self.x2 - self.x1) + 3.0 * t * t * (1.0 - self.x2)
    }

    fn solve_t(&self, x: f64) -> f64 {
        // Newton first, it converges in a handful of steps for sane curves
        let mut t = x;
        for _ in 0..8 {
            let err = Self::sample(self.x1, self.x2, t) - x;
            if err.abs() < 1e-7 {
                return t;
            }
            let dx = self.sample_dx(t);
            if dx.abs() < 1e-6 {
                break;
            }
            t -= err / dx;
        }

        let (mut lo, mut hi) = (0.0, 1.0);
        t = x;
        for _ in 0..64 {
            let value = Self::sample(self.x1, self.x2, t);
            if (value - x).abs() < 1e-7 {
                break;
            }
            if value < x {
                lo = t;
            } else {
                hi = t;
            }
            t = (lo + hi) * 0.5;
        }
        t
    }
}

/// Curves used by the edge panel
pub mod curves {
    use super::CubicBezier;

    /// Rubber band past the resting position and for the vertical follow
    pub const RUBBER_BAND: CubicBezier = CubicBezier::new(1.0 / 5.0, 1.0, 1.0, 1.0);

    /// Rubber band while the arrow is still appearing
    pub const RUBBER_BAND_APPEAR: CubicBezier = CubicBezier::new(1.0 / 4.0, 1.0, 1.0, 1.0);

    pub const FAST_OUT_SLOW_IN: CubicBezier = CubicBezier::new(0.4, 0.0, 0.2, 1.0);
}

/// Fixed-duration 0..1 animation
#[derive(Debug, Clone)]
pub struct TimedAnimation {
    duration_ms: f64,
    elapsed_ms: f64,
    running: bool,
    curve: Option<CubicBezier>,
}

impl TimedAnimation {
    pub fn new(duration_ms: f64, curve: Option<CubicBezier>) -> Self {
        Self {
            duration_ms,
            elapsed_ms: 0.0,
            running: false,
            curve,
        }
    }

    pub fn start(&mut self) {
        self.elapsed_ms = 0.0;
        self.running = true;
    }

    pub fn cancel(&mut self) {
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Advance by `dt_ms`. Returns true on the step the animation completes.
    pub fn step(&mut self, dt_ms: f64) -> bool {
        if !self.running {
            return false;
        }
        self.elapsed_ms += dt_ms.max(0.0);
        if self.elapsed_ms >= self.duration_ms {
            self.elapsed_ms = self.duration_ms;
            self.running = false;
            return true;
        }
        false
    }

    /// Eased fraction of the animation
    pub fn value(&self) -> f64 {
        let linear = if self.duration_ms <= 0.0 {
            1.0
        } else {
            (self.elapsed_ms / self.duration_ms).clamp(0.0, 1.0)
        };
        match self.curve {
            Some(curve) => curve.interpolate(linear),
            None => linear,
        }
    }
}

pub fn lerp(start: f64, stop: f64, amount: f64) -> f64 {
    start + (stop - start) * amount
}

/// Blend two ARGB colours channel by channel
pub fn blend_argb(from: u32, to: u32, ratio: f64) -> u32 {
    let ratio = ratio.clamp(0.0, 1.0);
    let channel = |shift: u32| {
        let a = ((from >> shift) & 0xff) as f64;
        let b = ((to >> shift) & 0xff) as f64;
        (lerp(a, b, ratio) as u32) & 0xff
    };
    (channel(24) << 24) | (channel(16) << 16) | (channel(8) << 8) | channel(0)
}
