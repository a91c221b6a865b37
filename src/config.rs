//! Engine configuration.
//!
//! Everything is supplied by the caller at construction. The types
//! serialize to JSON so the binary can load them from a file; every field has
//! a default, so a config file only needs the values it changes:
//!
//! ```json
//! {
//!   "rain": { "cell_size": 16, "color": "#00ff41" },
//!   "cursor": { "color": "#ff00ff" },
//!   "meteors": { "enabled": false },
//!   "starfield": { "count": 2000 }
//! }
//! ```
//!
//! [`EngineConfig::validate`] bounds every duration by [`MAX_DURATION_MS`] and
//! every element count by [`MAX_ELEMENTS`], so timer arithmetic and
//! allocations stay in range.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::color::Color;
use crate::cursor::CursorConfig;
use crate::error::ConfigError;
use crate::meteors::MeteorConfig;
use crate::rain::RainConfig;
use crate::starfield::StarfieldConfig;
use crate::time::Millis;
use crate::trail::TrailConfig;

/// Longest accepted interval or duration: one hour.
pub const MAX_DURATION_MS: Millis = 60 * 60 * 1000;
/// Largest accepted particle, meteor or star count.
pub const MAX_ELEMENTS: usize = 100_000;

/// Complete engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Window title used by the windowed runner.
    pub title: String,
    /// Background color; also the rain's fade overlay color.
    pub background: Color,
    pub rain: RainConfig,
    pub trail: TrailConfig,
    pub cursor: CursorConfig,
    pub meteors: MeteorConfig,
    pub starfield: StarfieldConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            title: "glyphtrail".to_string(),
            background: Color::BLACK,
            rain: RainConfig::default(),
            trail: TrailConfig::default(),
            cursor: CursorConfig::default(),
            meteors: MeteorConfig::default(),
            starfield: StarfieldConfig::default(),
        }
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

fn duration(field: &'static str, value: Millis) -> Result<(), ConfigError> {
    if value > MAX_DURATION_MS {
        return Err(invalid(field, format!("{value} ms is above {MAX_DURATION_MS} ms")));
    }
    Ok(())
}

fn count(field: &'static str, value: usize) -> Result<(), ConfigError> {
    if value > MAX_ELEMENTS {
        return Err(invalid(field, format!("{value} is above {MAX_ELEMENTS}")));
    }
    Ok(())
}

fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if !(value.is_finite() && value > 0.0) {
        return Err(invalid(field, "must be a positive number"));
    }
    Ok(())
}

impl EngineConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Reject values the effects cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let rain = &self.rain;
        if rain.cell_size == 0 {
            return Err(invalid("rain.cell_size", "must be at least 1"));
        }
        if rain.interval_ms == 0 {
            return Err(invalid("rain.interval_ms", "must be at least 1"));
        }
        duration("rain.interval_ms", rain.interval_ms)?;
        if !(0.0..=1.0).contains(&rain.fade_alpha) {
            return Err(invalid("rain.fade_alpha", format!("{} is outside 0..=1", rain.fade_alpha)));
        }
        if !(0.0..=1.0).contains(&rain.reset_chance) {
            return Err(invalid(
                "rain.reset_chance",
                format!("{} is outside 0..=1", rain.reset_chance),
            ));
        }
        if rain.charset.chars().all(char::is_whitespace) {
            return Err(invalid("rain.charset", "needs at least one glyph"));
        }

        let trail = &self.trail;
        if trail.capacity == 0 {
            return Err(invalid("trail.capacity", "must be at least 1"));
        }
        count("trail.capacity", trail.capacity)?;
        if trail.sweep_interval_ms == 0 {
            return Err(invalid("trail.sweep_interval_ms", "must be at least 1"));
        }
        duration("trail.sweep_interval_ms", trail.sweep_interval_ms)?;
        duration("trail.max_age_ms", trail.max_age_ms)?;
        duration("trail.fade_ms", trail.fade_ms)?;
        duration("trail.shrink_ms", trail.shrink_ms)?;
        if !(0.0..=1.0).contains(&trail.min_scale) {
            return Err(invalid("trail.min_scale", format!("{} is outside 0..=1", trail.min_scale)));
        }

        if self.cursor.trail_colors.is_empty() {
            return Err(invalid("cursor.trail_colors", "needs at least one color"));
        }
        positive("cursor.dot_radius", self.cursor.dot_radius)?;
        duration("cursor.idle_ms", self.cursor.idle_ms)?;
        duration("cursor.ripple_ms", self.cursor.ripple_ms)?;

        let meteors = &self.meteors;
        if meteors.min_duration_ms == 0 || meteors.min_duration_ms > meteors.max_duration_ms {
            return Err(invalid(
                "meteors.min_duration_ms",
                "must be at least 1 and not above max_duration_ms",
            ));
        }
        duration("meteors.max_duration_ms", meteors.max_duration_ms)?;
        duration("meteors.max_delay_ms", meteors.max_delay_ms)?;
        count("meteors.count", meteors.count)?;

        let stars = &self.starfield;
        count("starfield.count", stars.count)?;
        positive("starfield.radius", stars.radius)?;
        positive("starfield.point_size", stars.point_size)?;
        positive("starfield.camera_distance", stars.camera_distance)?;
        if !(stars.fov_degrees > 0.0 && stars.fov_degrees < 180.0) {
            return Err(invalid("starfield.fov_degrees", "must be inside 0..180"));
        }
        if !(stars.spin_x.is_finite() && stars.spin_y.is_finite() && stars.tilt.is_finite()) {
            return Err(invalid("starfield.spin", "spin and tilt must be finite"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        EngineConfig::default().validate().unwrap();
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config = EngineConfig::from_json(
            r##"{ "rain": { "cell_size": 16 }, "cursor": { "color": "#ff00ff" } }"##,
        )
        .unwrap();
        assert_eq!(config.rain.cell_size, 16);
        assert_eq!(config.rain.interval_ms, 50);
        assert_eq!(config.cursor.color.to_hex(), "#ff00ff");
        assert_eq!(config.trail, TrailConfig::default());
    }

    #[test]
    fn test_json_roundtrip_via_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("effects.json");
        let mut config = EngineConfig::default();
        config.meteors.enabled = false;
        config.trail.capacity = 12;
        config.save(&path).unwrap();

        assert_eq!(EngineConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = EngineConfig::default();
        config.rain.cell_size = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "rain.cell_size", .. })
        ));

        let mut config = EngineConfig::default();
        config.trail.capacity = 0;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.rain.charset = " ".into();
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.meteors.min_duration_ms = 9000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_extreme_values_rejected() {
        let mut config = EngineConfig::default();
        config.meteors.min_duration_ms = Millis::MAX;
        config.meteors.max_duration_ms = Millis::MAX;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "meteors.max_duration_ms", .. })
        ));

        let mut config = EngineConfig::default();
        config.rain.interval_ms = Millis::MAX;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "rain.interval_ms", .. })
        ));

        let mut config = EngineConfig::default();
        config.trail.capacity = usize::MAX;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.starfield.count = MAX_ELEMENTS + 1;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.starfield.radius = f32::NAN;
        assert!(config.validate().is_err());

        // The bound itself is accepted
        let mut config = EngineConfig::default();
        config.rain.interval_ms = MAX_DURATION_MS;
        config.meteors.max_duration_ms = MAX_DURATION_MS;
        config.meteors.min_duration_ms = MAX_DURATION_MS;
        config.validate().unwrap();
    }

    #[test]
    fn test_cursor_and_starfield_sections_parse() {
        let config = EngineConfig::from_json(
            r##"{
                "cursor": { "trail_enabled": false, "ambient_glow": false },
                "starfield": { "count": 1200, "color": "#ffffff" },
                "rain": { "font_path": "/fonts/NotoSansJP.ttf" }
            }"##,
        )
        .unwrap();
        assert!(!config.cursor.trail_enabled);
        assert!(!config.cursor.ambient_glow);
        assert!(config.cursor.binary_ornament);
        assert_eq!(config.starfield.count, 1200);
        assert_eq!(config.starfield.radius, 1.5);
        assert_eq!(config.starfield.color, Color::WHITE);
        assert_eq!(
            config.rain.font_path.as_deref(),
            Some(Path::new("/fonts/NotoSansJP.ttf"))
        );
    }

    #[test]
    fn test_bad_color_is_parse_error() {
        let err = EngineConfig::from_json(r#"{ "background": "blue" }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = EngineConfig::load("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
