//! Configuration module for flowsentry
//!
//! This module handles:
//! - Scan and telemetry settings (`flowsentry.toml`)
//! - User-level defaults (`<config dir>/flowsentry/config.toml`)
//! - `FLOWSENTRY_*` environment overrides
//! - Validation of thresholds and grade bands

mod settings;

pub use settings::{
    ConfigError, Settings, SettingsFile, PROJECT_CONFIG_FILE, ENV_PREFIX,
};
