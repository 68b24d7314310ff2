// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Configuration loading.
//!
//! # Loading Pipeline
//!
//! 1. Read the file and pick the format from its extension
//! 2. Resolve `${VAR}` and `${VAR:default}` placeholders
//! 3. Parse into [`SupervisorConfig`]
//! 4. Apply environment overrides
//! 5. Resolve the relative record path against the file's directory
//! 6. Validate
//!
//! # Environment Variable Override
//!
//! ```text
//! EURO_BUS_PORT_KIND=ttyS
//! EURO_BUS_DEVICE_DIR=/dev
//! EURO_LOG_LEVEL=debug
//! EURO_POLL_INTERVAL=500ms
//! EURO_RECORD=/var/lib/euro/snapshots.jsonl
//! ```

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use euro_modbus::types::SerialPortKind;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::error::{ConfigError, ConfigResult};
use crate::schema::{LogLevel, SupervisorConfig};

/// Default environment variable prefix.
pub const DEFAULT_ENV_PREFIX: &str = "EURO";

// =============================================================================
// ConfigLoader
// =============================================================================

/// Loads [`SupervisorConfig`] from YAML, TOML or JSON.
///
/// ```no_run
/// use euro_config::loader::ConfigLoader;
///
/// let config = ConfigLoader::new().load("eurotherm.yaml").unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    base_path: Option<PathBuf>,
    env_prefix: String,
    resolve_env_vars: bool,
    resolve_paths: bool,
}

impl ConfigLoader {
    /// Creates a loader with the `EURO` prefix and all resolution enabled.
    pub fn new() -> Self {
        Self {
            base_path: None,
            env_prefix: DEFAULT_ENV_PREFIX.to_string(),
            resolve_env_vars: true,
            resolve_paths: true,
        }
    }

    /// Sets the base path for resolving relative paths.
    pub fn with_base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Sets the environment variable prefix.
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Enables or disables placeholders and overrides.
    pub fn with_env_vars(mut self, enabled: bool) -> Self {
        self.resolve_env_vars = enabled;
        self
    }

    /// Enables or disables relative path resolution.
    pub fn with_path_resolution(mut self, enabled: bool) -> Self {
        self.resolve_paths = enabled;
        self
    }

    /// Returns the environment variable prefix.
    pub fn env_prefix(&self) -> &str {
        &self.env_prefix
    }

    /// Loads configuration from a file.
    ///
    /// The format follows the extension: `.yaml`/`.yml`, `.toml` or `.json`.
    pub fn load(&self, path: impl AsRef<Path>) -> ConfigResult<SupervisorConfig> {
        let path = path.as_ref();
        info!("Loading configuration from: {}", path.display());

        let base_path = self.base_path.clone().unwrap_or_else(|| {
            path.parent()
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| PathBuf::from("."))
        });

        let content = self.read_file(path)?;
        let format = ConfigFormat::from_path(path)?;
        let mut config = self.parse_content(&content, format, path)?;

        if self.resolve_env_vars {
            self.apply_env_overrides(&mut config)?;
        }

        if self.resolve_paths {
            self.resolve_relative_paths(&mut config, &base_path);
        }

        config.validate()?;

        info!("Configuration loaded successfully");
        debug!(
            port_kind = %config.bus.port_kind,
            start = config.bus.id_range.start,
            end = config.bus.id_range.end,
            interval = %humantime::format_duration(config.poll.interval),
            "Supervisor settings"
        );

        Ok(config)
    }

    /// Loads configuration from a string.
    ///
    /// Relative paths are only resolved when a base path was set.
    pub fn load_from_str(
        &self,
        content: &str,
        format: ConfigFormat,
    ) -> ConfigResult<SupervisorConfig> {
        let content = if self.resolve_env_vars {
            self.resolve_env_placeholders(content)?
        } else {
            content.to_string()
        };

        let mut config = parse_str(&content, format)?;

        if self.resolve_env_vars {
            self.apply_env_overrides(&mut config)?;
        }

        if let (true, Some(base_path)) = (self.resolve_paths, &self.base_path) {
            self.resolve_relative_paths(&mut config, base_path);
        }

        config.validate()?;
        Ok(config)
    }

    fn read_file(&self, path: &Path) -> ConfigResult<String> {
        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }

        fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))
    }

    fn parse_content(
        &self,
        content: &str,
        format: ConfigFormat,
        path: &Path,
    ) -> ConfigResult<SupervisorConfig> {
        let content = if self.resolve_env_vars {
            self.resolve_env_placeholders(content)?
        } else {
            content.to_string()
        };

        parse_str(&content, format).map_err(|e| match e {
            ConfigError::Serialization { message } => ConfigError::parse(path, message),
            other => other,
        })
    }

    /// Resolves `${VAR_NAME}` and `${VAR_NAME:default}` placeholders.
    ///
    /// An unset variable without a default is left in place.
    fn resolve_env_placeholders(&self, content: &str) -> ConfigResult<String> {
        let mut result = String::with_capacity(content.len());
        let mut chars = content.chars().peekable();

        while let Some(c) = chars.next() {
            if c != '$' || chars.peek() != Some(&'{') {
                result.push(c);
                continue;
            }
            chars.next();

            let mut body = String::new();
            let mut closed = false;
            for c in chars.by_ref() {
                if c == '}' {
                    closed = true;
                    break;
                }
                body.push(c);
            }

            if !closed {
                result.push_str("${");
                result.push_str(&body);
                continue;
            }

            let (name, default) = match body.split_once(':') {
                Some((name, default)) => (name, Some(default)),
                None => (body.as_str(), None),
            };

            match (env::var(name), default) {
                (Ok(value), _) => result.push_str(&value),
                (Err(_), Some(default)) => result.push_str(default),
                (Err(_), None) => {
                    warn!("Environment variable '{}' not found", name);
                    result.push_str(&format!("${{{}}}", name));
                }
            }
        }

        Ok(result)
    }

    fn env_name(&self, suffix: &str) -> String {
        format!("{}_{}", self.env_prefix, suffix)
    }

    fn apply_env_overrides(&self, config: &mut SupervisorConfig) -> ConfigResult<()> {
        let name = self.env_name("BUS_PORT_KIND");
        if let Ok(value) = env::var(&name) {
            config.bus.port_kind = value
                .parse::<SerialPortKind>()
                .map_err(|_| ConfigError::invalid_env_var(&name, "expected tty, ttyUSB or ttyS"))?;
        }

        if let Ok(value) = env::var(self.env_name("BUS_DEVICE_DIR")) {
            config.bus.device_dir = PathBuf::from(value);
        }

        let name = self.env_name("LOG_LEVEL");
        if let Ok(value) = env::var(&name) {
            match LogLevel::parse(&value) {
                Some(level) => config.logging.level = level,
                None => warn!("Ignoring {}={}: unknown log level", name, value),
            }
        }

        let name = self.env_name("POLL_INTERVAL");
        if let Ok(value) = env::var(&name) {
            config.poll.interval = humantime::parse_duration(&value)
                .map_err(|e| ConfigError::invalid_env_var(&name, e.to_string()))?;
        }

        if let Ok(value) = env::var(self.env_name("RECORD")) {
            config.record = Some(PathBuf::from(value));
        }

        Ok(())
    }

    fn resolve_relative_paths(&self, config: &mut SupervisorConfig, base_path: &Path) {
        if let Some(ref mut record) = config.record {
            if record.is_relative() {
                *record = base_path.join(&record);
            }
        }
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// ConfigFormat
// =============================================================================

/// Supported configuration file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// YAML format.
    Yaml,
    /// TOML format.
    Toml,
    /// JSON format.
    Json,
}

impl ConfigFormat {
    /// Determines the format from a file path.
    pub fn from_path(path: &Path) -> ConfigResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase());

        match ext.as_deref() {
            Some("yaml") | Some("yml") => Ok(ConfigFormat::Yaml),
            Some("toml") => Ok(ConfigFormat::Toml),
            Some("json") => Ok(ConfigFormat::Json),
            Some(other) => Err(ConfigError::unsupported_format(other)),
            None => Err(ConfigError::unsupported_format("(no extension)")),
        }
    }

    /// Returns the file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            ConfigFormat::Yaml => "yaml",
            ConfigFormat::Toml => "toml",
            ConfigFormat::Json => "json",
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

fn parse_str(content: &str, format: ConfigFormat) -> ConfigResult<SupervisorConfig> {
    match format {
        ConfigFormat::Yaml => yaml_parse(content),
        ConfigFormat::Toml => {
            toml::from_str(content).map_err(|e| ConfigError::serialization(e.to_string()))
        }
        ConfigFormat::Json => {
            serde_json::from_str(content).map_err(|e| ConfigError::serialization(e.to_string()))
        }
    }
}

fn yaml_parse<T: DeserializeOwned>(content: &str) -> ConfigResult<T> {
    let config = config::Config::builder()
        .add_source(config::File::from_str(content, config::FileFormat::Yaml))
        .build()
        .map_err(|e| ConfigError::serialization(e.to_string()))?;

    config
        .try_deserialize()
        .map_err(|e| ConfigError::serialization(e.to_string()))
}

// =============================================================================
// Convenience Functions
// =============================================================================

/// Loads configuration from a file with default settings.
pub fn load_config(path: impl AsRef<Path>) -> ConfigResult<SupervisorConfig> {
    ConfigLoader::new().load(path)
}

/// Loads configuration from a string with default settings.
pub fn load_config_str(content: &str, format: ConfigFormat) -> ConfigResult<SupervisorConfig> {
    ConfigLoader::new().load_from_str(content, format)
}

// =============================================================================
// Tests
// =============================================================================
