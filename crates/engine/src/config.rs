use std::path::Path;

use serde::{Deserialize, Serialize};
use stagecraft_render::{Camera, MAX_ZOOM, MIN_ZOOM};

use crate::error::ConfigError;
use crate::network::NetworkMode;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub units_per_screen_height: f32,
    pub zoom: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            units_per_screen_height: 10.0,
            zoom: 1.0,
        }
    }
}

impl CameraConfig {
    pub fn build(&self) -> Camera {
        let mut camera = Camera::new(self.units_per_screen_height);
        camera.set_zoom(self.zoom);
        camera
    }
}

/// Engine settings read from JSON. Missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub network_mode: NetworkMode,
    /// Replication rate in server mode.
    pub network_tick_hz: f32,
    /// Draw collision wireframes after the scene.
    pub debug_physics: bool,
    pub clear_color: [f32; 4],
    /// `None` starts the engine without a camera.
    pub camera: Option<CameraConfig>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            network_mode: NetworkMode::SinglePlayer,
            network_tick_hz: 20.0,
            debug_physics: false,
            clear_color: [0.1, 0.1, 0.12, 1.0],
            camera: Some(CameraConfig::default()),
        }
    }
}

impl EngineConfig {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        tracing::debug!(path = %path.display(), "engine config loaded");
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.network_tick_hz.is_finite() && self.network_tick_hz > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "network_tick_hz must be positive, got {}",
                self.network_tick_hz
            )));
        }
        if let Some(cam) = &self.camera {
            if !(cam.units_per_screen_height.is_finite() && cam.units_per_screen_height > 0.0) {
                return Err(ConfigError::Invalid(
                    "camera.units_per_screen_height must be positive".into(),
                ));
            }
            if !(MIN_ZOOM..=MAX_ZOOM).contains(&cam.zoom) {
                return Err(ConfigError::Invalid(format!(
                    "camera.zoom must be within [{MIN_ZOOM}, {MAX_ZOOM}], got {}",
                    cam.zoom
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn partial_json_uses_defaults() {
        let config: EngineConfig = serde_json::from_str(r#"{"network_mode":"server"}"#).unwrap();
        assert_eq!(config.network_mode, NetworkMode::Server);
        assert_eq!(config.network_tick_hz, 20.0);
        assert!(config.camera.is_some());
    }

    #[test]
    fn from_path_reads_and_validates() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"debug_physics":true,"camera":{{"zoom":2.0}}}}"#).unwrap();
        let config = EngineConfig::from_path(file.path()).unwrap();
        assert!(config.debug_physics);
        assert_eq!(config.camera.unwrap().zoom, 2.0);
    }

    #[test]
    fn rejects_bad_values() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"network_tick_hz":0}}"#).unwrap();
        assert!(matches!(
            EngineConfig::from_path(file.path()),
            Err(ConfigError::Invalid(_))
        ));

        let bad_zoom = EngineConfig {
            camera: Some(CameraConfig {
                zoom: 50.0,
                ..CameraConfig::default()
            }),
            ..EngineConfig::default()
        };
        assert!(bad_zoom.validate().is_err());
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = EngineConfig::from_path("/nonexistent/stagecraft.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn malformed_json_is_json_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{not json").unwrap();
        assert!(matches!(
            EngineConfig::from_path(file.path()),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn camera_config_builds_clamped_camera() {
        let cam = CameraConfig {
            units_per_screen_height: 8.0,
            zoom: 3.0,
        }
        .build();
        assert_eq!(cam.zoom(), 3.0);
        assert_eq!(cam.units_per_screen_height(), 8.0);
    }
}
