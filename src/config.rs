//! Recorder configuration using Figment
//!
//! Configuration is loaded from:
//! 1. a TOML file (base configuration)
//! 2. environment variables prefixed with `TOPIC_LOG_`, nested keys separated
//!    by `__` (e.g. `TOPIC_LOG_OUTPUT__COMPRESSED=true`)
//!
//! # Example
//! ```no_run
//! use topic_log::config::RecorderConfig;
//! use topic_log::Recorder;
//!
//! let config = RecorderConfig::load_from("config/topic_log.toml")?;
//! let recorder = Recorder::from_config(&config)?;
//! # Ok::<(), topic_log::LogError>(())
//! ```
//!
//! ```toml
//! [application]
//! log_level = "info"
//!
//! [output]
//! path = "logs/drive.csv"
//! compressed = true
//! compression_level = 6
//!
//! [recording]
//! significant_digits = 5
//! io_error_policy = "report"
//! ```

use crate::error::{LogError, LogResult};
use crate::format::{NumberFormat, DEFAULT_SIGNIFICANT_DIGITS, MAX_SIGNIFICANT_DIGITS};
use crate::logging::parse_log_level;
use crate::recorder::RecorderOptions;
use crate::writer::IoErrorPolicy;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Prefix of environment variables that override file settings.
pub const ENV_PREFIX: &str = "TOPIC_LOG_";

/// Top-level recorder configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecorderConfig {
    /// Application settings
    #[serde(default)]
    pub application: ApplicationConfig,
    /// Output file settings
    pub output: OutputConfig,
    /// Value conversion and error handling
    #[serde(default)]
    pub recording: RecordingConfig,
}

/// Application-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Logging level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Output file configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Destination file; `.gz` is appended when compressed
    pub path: PathBuf,
    /// Gzip the output
    #[serde(default)]
    pub compressed: bool,
    /// Compression level (0-9)
    #[serde(default = "default_compression")]
    pub compression_level: u32,
}

/// Recording behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordingConfig {
    /// Significant digits of the default number format
    #[serde(default = "default_significant_digits")]
    pub significant_digits: usize,
    /// What to do when the output cannot be written
    #[serde(default)]
    pub io_error_policy: IoErrorPolicy,
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_compression() -> u32 {
    6
}

fn default_significant_digits() -> usize {
    DEFAULT_SIGNIFICANT_DIGITS
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            significant_digits: default_significant_digits(),
            io_error_policy: IoErrorPolicy::default(),
        }
    }
}

impl RecorderConfig {
    /// Configuration writing uncompressed output to `path`, everything else default.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            application: ApplicationConfig::default(),
            output: OutputConfig {
                path: path.into(),
                compressed: false,
                compression_level: default_compression(),
            },
            recording: RecordingConfig::default(),
        }
    }

    /// Load configuration from `config/topic_log.toml` and environment variables
    pub fn load() -> LogResult<Self> {
        Self::load_from("config/topic_log.toml")
    }

    /// Load configuration from a specific file path
    ///
    /// Environment variables override the file, e.g.
    /// `TOPIC_LOG_RECORDING__IO_ERROR_POLICY=fail`.
    pub fn load_from<P: AsRef<Path>>(path: P) -> LogResult<Self> {
        let config = Figment::new()
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> LogResult<()> {
        parse_log_level(&self.application.log_level).map_err(LogError::InvalidConfig)?;

        if self.output.path.as_os_str().is_empty() {
            return Err(LogError::InvalidConfig(
                "Output path must not be empty".to_string(),
            ));
        }

        if self.output.compression_level > 9 {
            return Err(LogError::InvalidConfig(format!(
                "Invalid compression_level {}. Must be 0-9",
                self.output.compression_level
            )));
        }

        let digits = self.recording.significant_digits;
        if !(1..=MAX_SIGNIFICANT_DIGITS).contains(&digits) {
            return Err(LogError::InvalidConfig(format!(
                "Invalid significant_digits {digits}. Must be 1-{MAX_SIGNIFICANT_DIGITS}"
            )));
        }

        Ok(())
    }

    /// Recorder options described by this configuration
    pub fn to_options(&self) -> RecorderOptions {
        RecorderOptions::default()
            .with_compression(self.output.compressed)
            .with_compression_level(self.output.compression_level)
            .with_io_error_policy(self.recording.io_error_policy)
            .with_number_format(NumberFormat::significant(
                self.recording.significant_digits,
            ))
    }
}
