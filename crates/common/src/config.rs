//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{WeeverError, WeeverResult};

/// Global application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Capture request defaults.
    #[serde(default)]
    pub capture: CaptureDefaults,

    /// Compositor settings.
    #[serde(default)]
    pub render: RenderSettings,

    /// Scroll animator settings.
    #[serde(default)]
    pub scroll: ScrollSettings,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Parameters requested from the host when acquiring a capture source.
///
/// The host may grant different dimensions; these are preferences only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureDefaults {
    pub preferred_width: u32,
    pub preferred_height: u32,
    pub preferred_frame_rate: u32,
    pub include_audio: bool,
}

/// Compositor and render loop parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderSettings {
    /// Render loop cadence (display refresh rate).
    pub refresh_hz: u32,

    /// Width at which the preview is displayed on screen. Layer geometry is
    /// expressed in this space and scaled up to the output surface.
    pub preview_width: f64,

    /// Surface size used for the "no signal" placeholder before any source
    /// dimensions are known.
    pub placeholder_width: u32,
    pub placeholder_height: u32,

    /// TrueType/OpenType font used for text banners. When unset, a few
    /// common system locations are probed.
    #[serde(default)]
    pub font_path: Option<PathBuf>,
}

/// Scroll animator parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrollSettings {
    /// Fixed tick period of the scroll animator, independent of rendering.
    pub tick_interval_ms: u64,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "weever=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            capture: CaptureDefaults::default(),
            render: RenderSettings::default(),
            scroll: ScrollSettings::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for CaptureDefaults {
    fn default() -> Self {
        Self {
            preferred_width: 1920,
            preferred_height: 1080,
            preferred_frame_rate: 60,
            include_audio: true,
        }
    }
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            refresh_hz: 60,
            preview_width: 960.0,
            placeholder_width: 1280,
            placeholder_height: 720,
            font_path: None,
        }
    }
}

impl Default for ScrollSettings {
    fn default() -> Self {
        Self {
            tick_interval_ms: 50,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl RenderSettings {
    /// Render loop period in milliseconds, never zero.
    pub fn frame_interval_ms(&self) -> u64 {
        (1000 / u64::from(self.refresh_hz.max(1))).max(1)
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if !config_path.exists() {
            return Self::default();
        }
        match Self::load_from(&config_path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Ignoring config at {:?}: {}", config_path, e);
                Self::default()
            }
        }
    }

    /// Read and validate a config file.
    pub fn load_from(path: &Path) -> WeeverResult<Self> {
        if !path.exists() {
            return Err(WeeverError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the render and scroll loops cannot run with.
    pub fn validate(&self) -> WeeverResult<()> {
        let preview_width = self.render.preview_width;
        if !preview_width.is_finite() || preview_width <= 0.0 {
            return Err(WeeverError::config(format!(
                "render.preview_width must be positive, got {preview_width}"
            )));
        }
        if self.render.placeholder_width == 0 || self.render.placeholder_height == 0 {
            return Err(WeeverError::config("render placeholder size must be non-zero"));
        }
        if self.scroll.tick_interval_ms == 0 {
            return Err(WeeverError::config("scroll.tick_interval_ms must be non-zero"));
        }
        Ok(())
    }

    /// Save config to the standard location.
    pub fn save(&self) -> WeeverResult<()> {
        self.save_to(&config_file_path())
    }

    pub fn save_to(&self, path: &Path) -> WeeverResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("streemweever").join("config.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_broadcast_preset() {
        let config = AppConfig::default();
        assert_eq!(config.capture.preferred_width, 1920);
        assert_eq!(config.capture.preferred_height, 1080);
        assert_eq!(config.scroll.tick_interval_ms, 50);
        assert_eq!(config.render.frame_interval_ms(), 16);
    }

    #[test]
    fn partial_json_fills_missing_sections() {
        let config: AppConfig =
            serde_json::from_str(r#"{"scroll": {"tick_interval_ms": 20}}"#).unwrap();
        assert_eq!(config.scroll.tick_interval_ms, 20);
        assert_eq!(config.render, RenderSettings::default());
    }

    fn scratch_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("weever-config-{}", std::process::id()))
            .join(name)
    }

    #[test]
    fn saved_config_loads_back() {
        let path = scratch_path("roundtrip.json");
        let mut config = AppConfig::default();
        config.scroll.tick_interval_ms = 30;
        config.save_to(&path).unwrap();

        let loaded = AppConfig::load_from(&path).unwrap();
        assert_eq!(loaded.scroll.tick_interval_ms, 30);
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn malformed_file_is_a_json_error() {
        let path = scratch_path("malformed.json");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{ not json").unwrap();

        let err = AppConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, WeeverError::Json(_)));
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn unusable_values_are_config_errors() {
        let path = scratch_path("zero-tick.json");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, r#"{"scroll": {"tick_interval_ms": 0}}"#).unwrap();

        let err = AppConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, WeeverError::Config { .. }));
        std::fs::remove_file(&path).unwrap();

        let mut config = AppConfig::default();
        config.render.preview_width = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_file_is_reported() {
        let err = AppConfig::load_from(&scratch_path("absent.json")).unwrap_err();
        assert!(matches!(err, WeeverError::FileNotFound { .. }));
    }

    #[test]
    fn zero_refresh_rate_does_not_divide_by_zero() {
        let settings = RenderSettings {
            refresh_hz: 0,
            ..RenderSettings::default()
        };
        assert_eq!(settings.frame_interval_ms(), 1000);
    }
}
