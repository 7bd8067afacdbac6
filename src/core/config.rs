use crate::core::logging::LogConfig;
use crate::models::pose::{PersonSelection, PoseConfig};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Environment variable pointing at an alternative settings file
pub const CONFIG_PATH_ENV: &str = "BODYMEASURE_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid settings file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Could not determine home directory")]
    NoHomeDirectory,
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    /// Largest accepted request body in bytes
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 5000,
            max_upload_bytes: 512 * 1024 * 1024,
        }
    }
}

/// How the external pose estimator is launched
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EstimatorConfig {
    /// Python interpreter of the estimator environment
    pub python: PathBuf,
    /// Bridge script that runs the estimator and writes `vibe_output.npz`
    pub script: PathBuf,
    #[serde(flatten)]
    pub pose: PoseConfig,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            python: PathBuf::from("python3"),
            script: PathBuf::from("python/vibe_bridge.py"),
            pose: PoseConfig::default(),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub server: ServerConfig,
    /// Where uploaded videos are written before processing
    pub upload_dir: PathBuf,
    /// Root for per-request working directories
    pub work_dir: PathBuf,
    /// Face topology of the body model (`.npy`, or `.npz` with key `f`)
    pub faces_path: PathBuf,
    pub estimator: EstimatorConfig,
    /// Which tracked person the mesh is built from
    pub person: PersonSelection,
    /// Which frame of that person's track is measured
    pub frame_index: usize,
    /// Keep pose output and meshes after a run
    pub keep_artifacts: bool,
    pub logging: LogConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            upload_dir: PathBuf::from("/tmp/video_uploads"),
            work_dir: PathBuf::from("output"),
            faces_path: PathBuf::from("data/vibe_data/smpl_faces.npy"),
            estimator: EstimatorConfig::default(),
            person: PersonSelection::First,
            frame_index: 0,
            keep_artifacts: false,
            logging: LogConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file, creating with defaults if it doesn't exist
    pub fn load() -> ConfigResult<Self> {
        let config_path = Self::get_config_path()?;
        Self::load_from(&config_path)
    }

    /// Load configuration from an explicit path, creating it with defaults if missing
    pub fn load_from(config_path: &std::path::Path) -> ConfigResult<Self> {
        if config_path.exists() {
            let contents = std::fs::read_to_string(config_path)?;
            let config: Config = serde_json::from_str(&contents)?;
            config.validate()?;
            Ok(config)
        } else {
            let config = Self::default();
            config.save_to(config_path)?;
            Ok(config)
        }
    }

    /// Save configuration to the default location
    pub fn save(&self) -> ConfigResult<()> {
        self.save_to(&Self::get_config_path()?)
    }

    /// Save configuration to file
    pub fn save_to(&self, config_path: &std::path::Path) -> ConfigResult<()> {
        self.validate()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(config_path, contents)?;

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> ConfigResult<()> {
        if self.server.port == 0 {
            return Err(ConfigError::Invalid("Port must be non-zero".to_string()));
        }

        if self.server.bind_address.trim().is_empty() {
            return Err(ConfigError::Invalid("Bind address cannot be empty".to_string()));
        }

        if self.server.max_upload_bytes == 0 {
            return Err(ConfigError::Invalid(
                "Upload limit must be greater than zero".to_string(),
            ));
        }

        if self.estimator.pose.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "Estimator timeout must be at least 1 second".to_string(),
            ));
        }

        if self.estimator.python.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("Python interpreter path cannot be empty".to_string()));
        }

        if self.estimator.script.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("Estimator script path cannot be empty".to_string()));
        }

        if self.faces_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("Face topology path cannot be empty".to_string()));
        }

        Ok(())
    }

    /// Reset the default settings file
    pub fn reset() -> ConfigResult<Self> {
        let config = Self::default();
        config.save()?;
        Ok(config)
    }

    /// Get the configuration file path
    fn get_config_path() -> ConfigResult<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            return Ok(PathBuf::from(path));
        }

        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .map_err(|_| ConfigError::NoHomeDirectory)?;

        let mut path = PathBuf::from(home);
        path.push(".bodymeasure");
        path.push("config");
        path.push("settings.json");

        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::pose::TrackingMethod;
    use std::fs;

    fn get_test_config_path() -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("bodymeasure_test_config_{}", uuid::Uuid::new_v4()));
        path.push("settings.json");
        path
    }

    fn cleanup_test_config(path: &std::path::Path) {
        if let Some(parent) = path.parent() {
            let _ = fs::remove_dir_all(parent);
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.upload_dir, PathBuf::from("/tmp/video_uploads"));
        assert_eq!(config.estimator.pose.tracking_method, TrackingMethod::Pose);
        assert!(config.estimator.pose.run_smplify);
        assert_eq!(config.person, PersonSelection::First);
        assert_eq!(config.frame_index, 0);
        assert!(!config.keep_artifacts);
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.server.port = 0;
        assert!(config.validate().is_err());
        config.server.port = 5000;

        config.server.max_upload_bytes = 0;
        assert!(config.validate().is_err());
        config.server.max_upload_bytes = 1024;

        config.estimator.pose.timeout_secs = 0;
        assert!(config.validate().is_err());
        config.estimator.pose.timeout_secs = 60;

        config.estimator.script = PathBuf::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let json = serde_json::to_string(&config).unwrap();
        let deserialized: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_load_creates_default_file() {
        let path = get_test_config_path();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config, Config::default());
        assert!(path.exists());

        cleanup_test_config(&path);
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let path = get_test_config_path();
        let mut config = Config::default();
        config.server.port = 0;
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, serde_json::to_string(&config).unwrap()).unwrap();

        assert!(matches!(Config::load_from(&path), Err(ConfigError::Invalid(_))));

        cleanup_test_config(&path);
    }
}
