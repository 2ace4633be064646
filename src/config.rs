// SPDX-License-Identifier: MIT

//! Runtime configuration
//!
//! Values are resolved from built-in defaults, then an optional YAML file,
//! then `ORRA_*` environment variables. Command-line flags are applied on top
//! by the binary.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::OrraError;

/// Config file looked up in the working directory when none is given
pub const DEFAULT_CONFIG_FILE: &str = "orra.yaml";

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct OrraConfig {
    /// Address the HTTP listener binds to
    pub host: String,
    pub port: u16,
    /// Log state before and after every step
    pub debug: bool,
}

impl Default for OrraConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 1430,
            debug: false,
        }
    }
}

impl OrraConfig {
    /// Resolve configuration from file and environment.
    ///
    /// An explicit `path` must exist; without one, [`DEFAULT_CONFIG_FILE`] is
    /// read if present.
    pub fn load(path: Option<&Path>) -> Result<Self, OrraError> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(DEFAULT_CONFIG_FILE)?
            }
            None => Self::default(),
        };

        config.with_env_overrides(|key| std::env::var(key).ok())
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, OrraError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            OrraError::config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, OrraError> {
        // An empty file parses as null rather than an empty mapping
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(yaml)
            .map_err(|e| OrraError::config(format!("invalid config: {}", e)))
    }

    /// Apply `ORRA_HOST`, `ORRA_PORT` and `ORRA_DEBUG` as returned by `lookup`
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Result<Self, OrraError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("ORRA_HOST") {
            self.host = host;
        }
        if let Some(port) = lookup("ORRA_PORT") {
            self.port = port
                .parse()
                .map_err(|_| OrraError::config(format!("ORRA_PORT is not a port: {}", port)))?;
        }
        if let Some(debug) = lookup("ORRA_DEBUG") {
            self.debug = match debug.to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" | "" => false,
                other => {
                    return Err(OrraError::config(format!(
                        "ORRA_DEBUG is not a boolean: {}",
                        other
                    )))
                }
            };
        }
        Ok(self)
    }

    /// Base URL the API is served on
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}
