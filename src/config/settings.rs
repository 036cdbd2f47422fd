//! Settings loading, merging and validation
//!
//! # Configuration Format
//!
//! ```toml
//! # flowsentry.toml
//!
//! codeAnalysis = true
//! scanInterval = 30          # seconds, <= 0 disables periodic scans
//! detectionLevel = 2         # 1..=3, clamped
//!
//! performanceMonitoring = true
//! performanceInterval = 10   # seconds, <= 0 disables sampling
//! cpuThreshold = 75          # percent
//! memoryThreshold = 80       # percent
//! eventLoopThreshold = 20    # milliseconds
//! sustainedAlertDuration = 300
//! alertCooldown = 1800
//! dbRetentionDays = 7
//!
//! databasePath = "flowsentry.redb"
//!
//! [gradeBands]
//! a = 90
//! b = 75
//! c = 50
//! d = 25
//! ```
//!
//! Sources are merged in priority order: environment, project file (or
//! `--config`), user file, defaults.

use crate::models::{DetectionLevel, MetricKind};
use crate::scoring::GradeBands;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Project configuration file name
pub const PROJECT_CONFIG_FILE: &str = "flowsentry.toml";

/// Prefix of environment overrides
pub const ENV_PREFIX: &str = "FLOWSENTRY_";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not determine the user config directory")]
    NoConfigDir,

    #[error("invalid value {value:?} for {key}")]
    InvalidEnv { key: String, value: String },

    #[error("{metric} threshold must be positive, got {value}; {metric} monitoring disabled")]
    InvalidThreshold { metric: MetricKind, value: f64 },

    #[error("grade bands must be strictly descending (a > b > c > d)")]
    InvalidGradeBands,

    #[error("dbRetentionDays must be positive, got {0}")]
    InvalidRetention(i64),
}

/// Effective settings after all sources are merged
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub code_analysis: bool,
    /// Seconds between scans, <= 0 disables periodic scanning
    pub scan_interval: i64,
    pub detection_level: DetectionLevel,
    pub performance_monitoring: bool,
    /// Seconds between samples, <= 0 disables sampling
    pub performance_interval: i64,
    pub cpu_threshold: f64,
    pub memory_threshold: f64,
    pub event_loop_threshold: f64,
    /// Seconds a metric must stay over threshold before alerting
    pub sustained_alert_duration: i64,
    /// Seconds between alerts for the same metric
    pub alert_cooldown: i64,
    pub db_retention_days: i64,
    pub grade_bands: GradeBands,
    pub database_path: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            code_analysis: true,
            scan_interval: 30,
            detection_level: DetectionLevel::BASIC,
            performance_monitoring: false,
            performance_interval: 10,
            cpu_threshold: 75.0,
            memory_threshold: 80.0,
            event_loop_threshold: 20.0,
            sustained_alert_duration: 300,
            alert_cooldown: 1800,
            db_retention_days: 7,
            grade_bands: GradeBands::default(),
            database_path: None,
        }
    }
}

/// One configuration file; every key is optional
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsFile {
    pub code_analysis: Option<bool>,
    pub scan_interval: Option<i64>,
    pub detection_level: Option<DetectionLevel>,
    pub performance_monitoring: Option<bool>,
    pub performance_interval: Option<i64>,
    pub cpu_threshold: Option<f64>,
    pub memory_threshold: Option<f64>,
    pub event_loop_threshold: Option<f64>,
    pub sustained_alert_duration: Option<i64>,
    pub alert_cooldown: Option<i64>,
    pub db_retention_days: Option<i64>,
    pub grade_bands: Option<GradeBands>,
    pub database_path: Option<PathBuf>,
}

impl SettingsFile {
    pub fn read(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl Settings {
    /// Load settings from all sources, with priority:
    /// 1. `FLOWSENTRY_*` environment variables (highest)
    /// 2. `explicit` path, or `flowsentry.toml` in `project_dir`
    /// 3. User config (`<config dir>/flowsentry/config.toml`)
    /// 4. Defaults
    pub fn load(project_dir: &Path, explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let project = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => Some(project_dir.join(PROJECT_CONFIG_FILE)).filter(|p| p.exists()),
        };
        let user = Self::user_config_path().filter(|p| p.exists());
        Self::load_from(user.as_deref(), project.as_deref(), |key| std::env::var(key).ok())
    }

    /// Load from explicit sources; `env` looks up an environment variable
    pub fn load_from(
        user: Option<&Path>,
        project: Option<&Path>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut settings = Settings::default();

        for path in [user, project].into_iter().flatten() {
            debug!(path = %path.display(), "loading settings file");
            settings.merge(SettingsFile::read(path)?);
        }

        settings.apply_env(env)?;
        Ok(settings)
    }

    /// Get the user config file path
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("flowsentry").join("config.toml"))
    }

    /// Merge a file into these settings (file takes priority)
    pub fn merge(&mut self, file: SettingsFile) {
        if let Some(v) = file.code_analysis {
            self.code_analysis = v;
        }
        if let Some(v) = file.scan_interval {
            self.scan_interval = v;
        }
        if let Some(v) = file.detection_level {
            self.detection_level = v;
        }
        if let Some(v) = file.performance_monitoring {
            self.performance_monitoring = v;
        }
        if let Some(v) = file.performance_interval {
            self.performance_interval = v;
        }
        if let Some(v) = file.cpu_threshold {
            self.cpu_threshold = v;
        }
        if let Some(v) = file.memory_threshold {
            self.memory_threshold = v;
        }
        if let Some(v) = file.event_loop_threshold {
            self.event_loop_threshold = v;
        }
        if let Some(v) = file.sustained_alert_duration {
            self.sustained_alert_duration = v;
        }
        if let Some(v) = file.alert_cooldown {
            self.alert_cooldown = v;
        }
        if let Some(v) = file.db_retention_days {
            self.db_retention_days = v;
        }
        if let Some(v) = file.grade_bands {
            self.grade_bands = v;
        }
        if file.database_path.is_some() {
            self.database_path = file.database_path;
        }
    }

    fn apply_env(&mut self, env: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        let lookup = |name: &str| {
            let key = format!("{ENV_PREFIX}{name}");
            env(&key).map(|value| (key, value))
        };

        if let Some((key, value)) = lookup("CODE_ANALYSIS") {
            self.code_analysis = parse_env(&key, &value)?;
        }
        if let Some((key, value)) = lookup("SCAN_INTERVAL") {
            self.scan_interval = parse_env(&key, &value)?;
        }
        if let Some((key, value)) = lookup("DETECTION_LEVEL") {
            self.detection_level = DetectionLevel::new(parse_env(&key, &value)?);
        }
        if let Some((key, value)) = lookup("PERFORMANCE_MONITORING") {
            self.performance_monitoring = parse_env(&key, &value)?;
        }
        if let Some((key, value)) = lookup("PERFORMANCE_INTERVAL") {
            self.performance_interval = parse_env(&key, &value)?;
        }
        if let Some((key, value)) = lookup("CPU_THRESHOLD") {
            self.cpu_threshold = parse_env(&key, &value)?;
        }
        if let Some((key, value)) = lookup("MEMORY_THRESHOLD") {
            self.memory_threshold = parse_env(&key, &value)?;
        }
        if let Some((key, value)) = lookup("EVENT_LOOP_THRESHOLD") {
            self.event_loop_threshold = parse_env(&key, &value)?;
        }
        if let Some((key, value)) = lookup("SUSTAINED_ALERT_DURATION") {
            self.sustained_alert_duration = parse_env(&key, &value)?;
        }
        if let Some((key, value)) = lookup("ALERT_COOLDOWN") {
            self.alert_cooldown = parse_env(&key, &value)?;
        }
        if let Some((key, value)) = lookup("DB_RETENTION_DAYS") {
            self.db_retention_days = parse_env(&key, &value)?;
        }
        if let Some((_, value)) = lookup("DB_PATH") {
            self.database_path = Some(PathBuf::from(value));
        }
        Ok(())
    }

    /// Alert threshold of one metric
    pub fn threshold(&self, metric: MetricKind) -> f64 {
        match metric {
            MetricKind::Cpu => self.cpu_threshold,
            MetricKind::Memory => self.memory_threshold,
            MetricKind::EventLoop => self.event_loop_threshold,
        }
    }

    /// Every problem with these settings; empty when valid.
    ///
    /// A bad threshold only disables its own metric, so callers keep going
    /// and report these once.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        for metric in MetricKind::ALL {
            let value = self.threshold(metric);
            if value.is_nan() || value <= 0.0 {
                errors.push(ConfigError::InvalidThreshold { metric, value });
            }
        }
        if !self.grade_bands.is_descending() {
            errors.push(ConfigError::InvalidGradeBands);
        }
        if self.db_retention_days <= 0 {
            errors.push(ConfigError::InvalidRetention(self.db_retention_days));
        }
        errors
    }

    /// Database file, relative paths resolved against `base`
    pub fn database_path(&self, base: &Path) -> PathBuf {
        let path = self
            .database_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(crate::store::DB_FILE_NAME));
        if path.is_absolute() {
            path
        } else {
            base.join(path)
        }
    }

    /// Write a commented example `flowsentry.toml` into `dir`.
    ///
    /// Returns the path and whether the file was created (an existing file
    /// is left untouched).
    pub fn init_project_config(dir: &Path) -> Result<(PathBuf, bool), ConfigError> {
        let path = dir.join(PROJECT_CONFIG_FILE);
        if path.exists() {
            return Ok((path, false));
        }
        std::fs::write(&path, EXAMPLE_CONFIG).map_err(|source| ConfigError::Write {
            path: path.clone(),
            source,
        })?;
        Ok((path, true))
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
        key: key.to_string(),
        value: value.to_string(),
    })
}

const EXAMPLE_CONFIG: &str = r#"# flowsentry configuration
#
# Environment variables (FLOWSENTRY_DETECTION_LEVEL, FLOWSENTRY_CPU_THRESHOLD,
# ...) override anything set here.

# Code analysis
codeAnalysis = true
scanInterval = 30        # seconds between scans, 0 disables
detectionLevel = 1       # 1 = critical only, 2 = + logging/markers, 3 = everything

# Performance monitoring
performanceMonitoring = false
performanceInterval = 10 # seconds between samples, 0 disables
cpuThreshold = 75        # percent
memoryThreshold = 80     # percent
eventLoopThreshold = 20  # milliseconds
sustainedAlertDuration = 300
alertCooldown = 1800
dbRetentionDays = 7

# databasePath = "flowsentry.redb"

# [gradeBands]
# a = 90
# b = 75
# c = 50
# d = 25
"#;
