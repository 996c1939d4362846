use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Capture settings recognised by the pipeline.
///
/// `saving_format` stays a raw string on purpose: codec choice is late-bound
/// and is only parsed when a snapshot is actually encoded, so a bad value
/// surfaces at capture time rather than at startup.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Time between snapshots while capturing.
    #[serde(deserialize_with = "deserialize_duration")]
    pub capture_interval: Duration,
    /// Max distance the depth reconstruction resolves underwater; above water
    /// the engine default applies.
    pub max_render_distance_underwater: f32,
    /// Signed bias magnitude applied around the water plane to suppress
    /// reconstruction artifacts from fast vertical camera motion.
    pub water_level_tolerance: f32,
    /// Output resolution snapshots are resampled to before encoding.
    pub output_width: u32,
    pub output_height: u32,
    /// "png" or "jpg"; validated at snapshot time, not here.
    pub saving_format: String,
    pub jpg_quality: u8,
    /// Consumed only by the debug overlay, which reads core state and never
    /// mutates it.
    pub overlay_visible: bool,
    /// Initial fog toggle; flipping it while armed redirects the primary
    /// camera target for fog-free base captures.
    pub fog_enabled: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            capture_interval: Duration::from_secs(1),
            max_render_distance_underwater: 120.0,
            water_level_tolerance: 100.0,
            output_width: 960,
            output_height: 540,
            saving_format: "jpg".to_string(),
            jpg_quality: 95,
            overlay_visible: true,
            fog_enabled: true,
        }
    }
}

impl CaptureConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let config: CaptureConfig = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capture_interval.is_zero() {
            return Err(ConfigError::Invalid(
                "capture_interval must be greater than zero".into(),
            ));
        }

        if !self.max_render_distance_underwater.is_finite() {
            return Err(ConfigError::Invalid(
                "max_render_distance_underwater must be finite".into(),
            ));
        }

        if !self.water_level_tolerance.is_finite() || self.water_level_tolerance < 0.0 {
            return Err(ConfigError::Invalid(
                "water_level_tolerance must be finite and non-negative".into(),
            ));
        }

        if self.output_width == 0 || self.output_height == 0 {
            return Err(ConfigError::Invalid(format!(
                "output resolution {}x{} must be non-zero in both dimensions",
                self.output_width, self.output_height
            )));
        }

        if self.jpg_quality > 100 {
            return Err(ConfigError::Invalid(format!(
                "jpg_quality {} must be within 0-100",
                self.jpg_quality
            )));
        }

        Ok(())
    }
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    struct Visitor;
    impl<'de> de::Visitor<'de> for Visitor {
        type Value = Duration;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a duration as number of seconds or human-readable string")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            humantime::parse_duration(v)
                .map_err(|err| E::custom(format!("invalid duration '{v}': {err}")))
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Duration::from_secs(v))
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v < 0 {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Duration::from_secs(v as u64))
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v.is_nan() || v.is_sign_negative() {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Duration::from_secs_f64(v))
        }
    }

    deserializer.deserialize_any(Visitor)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
capture_interval = "2s"
max_render_distance_underwater = 150.0
water_level_tolerance = 80.0
output_width = 1280
output_height = 720
saving_format = "png"
fog_enabled = false
"#;

    #[test]
    fn parses_sample_config() {
        let config = CaptureConfig::from_toml_str(SAMPLE).expect("parse config");
        assert_eq!(config.capture_interval, Duration::from_secs(2));
        assert_eq!(config.output_width, 1280);
        assert_eq!(config.saving_format, "png");
        assert!(!config.fog_enabled);
        // untouched fields fall back to defaults
        assert_eq!(config.jpg_quality, 95);
        assert!(config.overlay_visible);
    }

    #[test]
    fn default_values() {
        let config = CaptureConfig::default();
        assert_eq!(config.capture_interval, Duration::from_secs(1));
        assert_eq!(config.max_render_distance_underwater, 120.0);
        assert_eq!(config.water_level_tolerance, 100.0);
        assert_eq!((config.output_width, config.output_height), (960, 540));
        assert!(config.fog_enabled);
    }

    #[test]
    fn accepts_fractional_interval_seconds() {
        let config = CaptureConfig::from_toml_str("capture_interval = 0.5").unwrap();
        assert_eq!(config.capture_interval, Duration::from_millis(500));
    }

    #[test]
    fn rejects_zero_interval() {
        let err = CaptureConfig::from_toml_str("capture_interval = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_zero_output_dimension() {
        let err = CaptureConfig::from_toml_str("output_width = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_out_of_range_jpg_quality() {
        let err = CaptureConfig::from_toml_str("jpg_quality = 101").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn unknown_saving_format_passes_load() {
        // Codec choice is late-bound; the snapshot encoder rejects it instead.
        let config = CaptureConfig::from_toml_str(r#"saving_format = "webp""#).unwrap();
        assert_eq!(config.saving_format, "webp");
    }
}
