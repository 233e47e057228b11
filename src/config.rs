//! Edge back gesture configuration
//!
//! All lengths are raw display pixels. The defaults are derived from
//! density-independent values through [`EdgeConfig::for_density`]; a TOML
//! file only needs to list the values it overrides (note that overriding
//! `density` alone does not rescale the other defaults).

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::animation::SpringForce;
use crate::input::geometry::polar_to_cart_x;
use crate::{Error, Result};

/// Typical phone density, used when nothing else is known
const DEFAULT_DENSITY: f64 = 2.75;

/// Spring parameters of the arrow animations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpringConfig {
    /// Translation while the finger is down
    pub regular_translation: SpringForce,
    /// Translation right after the gesture switched to triggering back
    pub trigger_translation: SpringForce,
    /// Translation sliding back once the gesture resolved
    pub settle_translation: SpringForce,
    pub vertical: SpringForce,
    pub angle_appear: SpringForce,
    pub angle_disappear: SpringForce,
}

impl Default for SpringConfig {
    fn default() -> Self {
        Self {
            regular_translation: SpringForce::new(
                SpringForce::STIFFNESS_MEDIUM,
                SpringForce::DAMPING_RATIO_LOW_BOUNCY,
            ),
            trigger_translation: SpringForce::new(2500.0, SpringForce::DAMPING_RATIO_LOW_BOUNCY),
            settle_translation: SpringForce::new(450.0, SpringForce::DAMPING_RATIO_LOW_BOUNCY),
            vertical: SpringForce::new(
                SpringForce::STIFFNESS_MEDIUM,
                SpringForce::DAMPING_RATIO_LOW_BOUNCY,
            ),
            angle_appear: SpringForce::new(500.0, SpringForce::DAMPING_RATIO_MEDIUM_BOUNCY),
            angle_disappear: SpringForce::new(
                SpringForce::STIFFNESS_MEDIUM,
                SpringForce::DAMPING_RATIO_MEDIUM_BOUNCY,
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgeConfig {
    /// Pixels per dp the defaults were derived with
    pub density: f64,

    /// Width of the zone along each vertical edge where a gesture may start
    pub edge_width: f64,

    /// Movement needed to tell horizontal from vertical intent
    pub touch_slop: f64,

    /// Travel after which the arrow appears and a haptic tick fires
    pub drag_threshold: f64,

    /// Holding still longer than this before the slop is a long press
    pub long_press_timeout_ms: i64,

    pub nav_bar_height: f64,

    /// Lowest panel anchor; above it the arrow is drawn below the finger
    pub min_arrow_position: f64,

    /// Vertical distance between the finger and the arrow
    pub finger_offset: f64,

    pub panel_width: f64,
    pub panel_height: f64,
    pub panel_padding: f64,

    /// Resting translation of the arrow
    pub base_translation: f64,
    /// Length of one arrow leg
    pub arrow_length: f64,
    pub arrow_thickness: f64,

    /// Accumulated reversal needed before the direction switches
    pub min_delta_for_switch: f64,

    /// How far the arrow slides back once a back was triggered
    pub settle_back_distance: f64,

    /// Leg angle (degrees from the x axis) of the extended arrow
    pub arrow_angle_extended: f64,
    /// Degrees added per 1000 px/s of pointer speed
    pub arrow_angle_per_1000_speed: f64,
    pub arrow_max_angle_speed_offset: f64,

    pub long_swipe_enabled: bool,
    /// Travel that turns a back into a long swipe. Derived from the display
    /// width when unset.
    pub long_swipe_threshold: Option<f64>,

    /// Keep the top band of the display free of back gestures
    pub exclude_top: bool,
    pub top_exclusion_size: f64,

    /// Arrow direction; false for right-to-left layouts
    pub arrows_point_left: bool,

    /// ARGB arrow colour over dark content
    pub arrow_color_light: u32,
    /// ARGB arrow colour over light content
    pub arrow_color_dark: u32,

    pub springs: SpringConfig,
}

impl Default for EdgeConfig {
    fn default() -> Self {
        Self::for_density(DEFAULT_DENSITY)
    }
}

impl EdgeConfig {
    pub fn for_density(density: f64) -> Self {
        let dp = |value: f64| value * density;
        Self {
            density,
            edge_width: dp(18.0),
            touch_slop: dp(8.0) * 0.75,
            drag_threshold: dp(16.0),
            long_press_timeout_ms: 250,
            nav_bar_height: dp(48.0),
            min_arrow_position: dp(64.0),
            finger_offset: dp(48.0),
            panel_width: dp(70.0),
            panel_height: dp(96.0),
            panel_padding: dp(8.0),
            base_translation: dp(32.0),
            arrow_length: dp(18.0),
            arrow_thickness: dp(2.5),
            min_delta_for_switch: dp(32.0),
            settle_back_distance: dp(32.0),
            arrow_angle_extended: 56.0,
            arrow_angle_per_1000_speed: 4.0,
            arrow_max_angle_speed_offset: 4.0,
            long_swipe_enabled: false,
            long_swipe_threshold: None,
            exclude_top: false,
            top_exclusion_size: dp(200.0),
            arrows_point_left: true,
            arrow_color_light: 0xffff_ffff,
            arrow_color_dark: 0x9900_0000,
            springs: SpringConfig::default(),
        }
    }

    /// Default config file location
    pub fn config_path() -> Option<PathBuf> {
        std::env::var("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|_| std::env::var("HOME").map(|home| PathBuf::from(home).join(".config")))
            .ok()
            .map(|dir| dir.join("flick/edge_back.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from [`Self::config_path`], falling back to the defaults
    pub fn load_or_default() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        match Self::load(&path) {
            Ok(config) => {
                tracing::info!("Loaded edge back config from {:?}", path);
                config
            }
            Err(e) => {
                tracing::warn!("Ignoring edge back config {:?}: {}", path, e);
                Self::default()
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        let lengths = [
            ("density", self.density),
            ("edge_width", self.edge_width),
            ("touch_slop", self.touch_slop),
            ("drag_threshold", self.drag_threshold),
            ("nav_bar_height", self.nav_bar_height),
            ("min_arrow_position", self.min_arrow_position),
            ("finger_offset", self.finger_offset),
            ("panel_padding", self.panel_padding),
            ("base_translation", self.base_translation),
            ("arrow_length", self.arrow_length),
            ("arrow_thickness", self.arrow_thickness),
            ("min_delta_for_switch", self.min_delta_for_switch),
            ("settle_back_distance", self.settle_back_distance),
            ("arrow_angle_per_1000_speed", self.arrow_angle_per_1000_speed),
            ("arrow_max_angle_speed_offset", self.arrow_max_angle_speed_offset),
            ("top_exclusion_size", self.top_exclusion_size),
        ];
        for (name, value) in lengths {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::InvalidConfig(format!(
                    "{name} must be a non-negative number, got {value}"
                )));
            }
        }

        if !(self.panel_width > 0.0 && self.panel_height > 0.0) {
            return Err(Error::InvalidConfig("panel size must be positive".into()));
        }
        if !(0.0..=90.0).contains(&self.arrow_angle_extended) {
            return Err(Error::InvalidConfig(format!(
                "arrow_angle_extended must be within 0..=90 degrees, got {}",
                self.arrow_angle_extended
            )));
        }
        if self.long_press_timeout_ms <= 0 {
            return Err(Error::InvalidConfig("long_press_timeout_ms must be positive".into()));
        }
        if let Some(threshold) = self.long_swipe_threshold {
            if !threshold.is_finite() || threshold <= 0.0 {
                return Err(Error::InvalidConfig(
                    "long_swipe_threshold must be positive when set".into(),
                ));
            }
        }

        let springs = [
            ("regular_translation", self.springs.regular_translation),
            ("trigger_translation", self.springs.trigger_translation),
            ("settle_translation", self.springs.settle_translation),
            ("vertical", self.springs.vertical),
            ("angle_appear", self.springs.angle_appear),
            ("angle_disappear", self.springs.angle_disappear),
        ];
        for (name, spring) in springs {
            if !(spring.stiffness > 0.0 && spring.stiffness.is_finite())
                || !(spring.damping_ratio >= 0.0 && spring.damping_ratio.is_finite())
            {
                return Err(Error::InvalidConfig(format!(
                    "spring {name} needs a positive stiffness and non-negative damping"
                )));
            }
        }

        Ok(())
    }

    /// Long swipe threshold for a display `display_width` pixels wide, 0
    /// when long swipes are disabled
    pub fn long_swipe_threshold_for(&self, display_width: f64) -> f64 {
        if !self.long_swipe_enabled {
            return 0.0;
        }
        self.long_swipe_threshold
            .unwrap_or_else(|| (display_width * 0.5).min(self.panel_width * 2.5))
    }

    /// Horizontal extent of the extended arrow
    pub fn static_arrow_width(&self) -> f64 {
        polar_to_cart_x(self.arrow_angle_extended) * self.arrow_length
    }

    /// Furthest the arrow may travel inside the panel
    pub fn max_translation(&self) -> f64 {
        self.panel_width - self.panel_padding
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_scale_with_density() {
        let one = EdgeConfig::for_density(1.0);
        let three = EdgeConfig::for_density(3.0);
        assert_eq!(one.base_translation, 32.0);
        assert_eq!(three.base_translation, 96.0);
        assert_eq!(one.touch_slop, 6.0);
        assert_eq!(three.long_press_timeout_ms, 250);
        assert!(EdgeConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = EdgeConfig::from_toml(
            r#"
            edge_width = 40.0
            long_swipe_enabled = true
            long_swipe_threshold = 300.0

            [springs.vertical]
            stiffness = 800.0
            damping_ratio = 1.0
            "#,
        )
        .unwrap();

        assert_eq!(config.edge_width, 40.0);
        assert!(config.long_swipe_enabled);
        assert_eq!(config.long_swipe_threshold, Some(300.0));
        assert_eq!(config.springs.vertical, SpringForce::new(800.0, 1.0));
        assert_eq!(config.springs.angle_appear, SpringConfig::default().angle_appear);
        assert_eq!(config.panel_width, EdgeConfig::default().panel_width);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            EdgeConfig::from_toml("touch_slop = -1.0"),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(
            EdgeConfig::from_toml("long_press_timeout_ms = 0"),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(
            EdgeConfig::from_toml("[springs.angle_appear]\nstiffness = 0.0\ndamping_ratio = 0.5"),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(
            EdgeConfig::from_toml("edge_width = \"wide\""),
            Err(Error::ConfigParse(_))
        ));
    }

    #[test]
    fn test_long_swipe_threshold() {
        let mut config = EdgeConfig::for_density(1.0);
        assert_eq!(config.long_swipe_threshold_for(1080.0), 0.0);

        config.long_swipe_enabled = true;
        // min(1080 * 0.5, 70 * 2.5)
        assert_eq!(config.long_swipe_threshold_for(1080.0), 175.0);
        assert_eq!(config.long_swipe_threshold_for(300.0), 150.0);

        config.long_swipe_threshold = Some(300.0);
        assert_eq!(config.long_swipe_threshold_for(1080.0), 300.0);
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let result = EdgeConfig::load(Path::new("/nonexistent/flick/edge_back.toml"));
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn test_roundtrip_through_toml() {
        let config = EdgeConfig::for_density(2.0);
        let text = toml::to_string(&config).unwrap();
        assert_eq!(EdgeConfig::from_toml(&text).unwrap(), config);
    }
}
