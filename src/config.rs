//! Daemon configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

/// Environment variable naming an alternative configuration file.
pub const CONFIG_ENV: &str = "PI_CAM_UPLINK_CONFIG";
/// Environment variable overriding the SFTP password.
pub const PASSWORD_ENV: &str = "PI_CAM_UPLINK_PASSWORD";
/// Configuration file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "pi-cam-uplink.json";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("cannot read {}: {source}", path.display())]
    Read {
        /// File that was read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The configuration file is not valid JSON for [`Config`].
    #[error("cannot parse {}: {source}", path.display())]
    Parse {
        /// File that was parsed.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },
    /// A value is out of range.
    #[error("invalid value for {field}: {message}")]
    Invalid {
        /// Offending key.
        field: &'static str,
        /// What is wrong with it.
        message: String,
    },
}

/// Which camera backend produces the images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureBackend {
    /// Run an external still-capture tool.
    #[default]
    Command,
    /// Grab an MJPEG frame from a V4L2 device.
    V4l2,
}

/// Settings for one daemon run.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// SFTP server host.
    pub host: String,
    /// SFTP server port.
    pub port: u16,
    /// SFTP login.
    pub username: String,
    /// SFTP password.
    pub password: String,
    /// Remote directory receiving the images.
    pub remote_dir: String,
    /// Seconds between capture cycles.
    pub capture_interval_secs: u64,
    /// Seconds to pause after an SSH protocol error.
    pub protocol_pause_secs: u64,
    /// Local directory holding captured images.
    pub local_dir: PathBuf,
    /// File persisting the next image number.
    pub counter_file: PathBuf,
    /// Log destination.
    pub log_file: PathBuf,
    /// Retries granted to a failed upload before it is dropped.
    pub max_retry_attempts: u32,
    /// Age in seconds after which local images are deleted.
    pub retention_secs: u64,
    /// Camera backend.
    pub capture_backend: CaptureBackend,
    /// External capture program.
    pub capture_tool: String,
    /// Extra arguments passed to the capture program before `-o`.
    pub capture_args: Vec<String>,
    /// V4L2 device index (`/dev/videoN`).
    pub v4l2_device: u32,
    /// V4L2 capture width.
    pub v4l2_width: u32,
    /// V4L2 capture height.
    pub v4l2_height: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "ssh.server.com".to_owned(),
            port: 22,
            username: "username@server.com".to_owned(),
            password: "user_password".to_owned(),
            remote_dir: "/image_directory/".to_owned(),
            capture_interval_secs: 300,
            protocol_pause_secs: 60,
            local_dir: PathBuf::from("captures"),
            counter_file: PathBuf::from("image_counter.txt"),
            log_file: PathBuf::from("log_analysis.txt"),
            max_retry_attempts: 4,
            retention_secs: 172_800, // 48h
            capture_backend: CaptureBackend::Command,
            capture_tool: "libcamera-still".to_owned(),
            capture_args: Vec::new(),
            v4l2_device: 0,
            v4l2_width: 1920,
            v4l2_height: 1080,
        }
    }
}

impl Config {
    /// Load the configuration for this process.
    ///
    /// Reads the file named by `PI_CAM_UPLINK_CONFIG`, else
    /// `pi-cam-uplink.json` if present, else uses defaults. The password can
    /// always be supplied through `PI_CAM_UPLINK_PASSWORD`.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var_os(CONFIG_ENV).map(PathBuf::from).or_else(|| {
            let local = PathBuf::from(DEFAULT_CONFIG_FILE);
            local.exists().then_some(local)
        });

        let mut config = match path {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };

        if let Ok(password) = std::env::var(PASSWORD_ENV) {
            config.password = password;
        }

        config.validate()?;
        Ok(config)
    }

    /// Parse a JSON configuration file. Missing keys keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Reject settings the daemon cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(invalid("host", "must not be empty"));
        }
        if self.port == 0 {
            return Err(invalid("port", "must be non-zero"));
        }
        if self.capture_interval_secs == 0 {
            return Err(invalid("capture_interval_secs", "must be non-zero"));
        }
        if self.max_retry_attempts == 0 {
            return Err(invalid("max_retry_attempts", "must be at least 1"));
        }
        if self.capture_backend == CaptureBackend::Command && self.capture_tool.is_empty() {
            return Err(invalid("capture_tool", "must not be empty"));
        }
        Ok(())
    }

    /// Sleep between capture cycles.
    pub const fn capture_interval(&self) -> Duration {
        Duration::from_secs(self.capture_interval_secs)
    }

    /// Pause after an SSH protocol error.
    pub const fn protocol_pause(&self) -> Duration {
        Duration::from_secs(self.protocol_pause_secs)
    }

    /// Age after which local images are deleted.
    pub const fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_secs)
    }
}

fn invalid(field: &'static str, message: &str) -> ConfigError {
    ConfigError::Invalid {
        field,
        message: message.to_owned(),
    }
}
