//! Configuration parsing and defaults.

use crate::include::DEFAULT_INCLUDE_LIMIT;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Name of the optional config file in the input directory
pub const CONFIG_FILE_NAME: &str = "wikismith.yml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    ParseError(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Compilation settings matching the wikismith.yml schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Page template, relative to the input directory
    #[serde(default = "default_template")]
    pub template: String,

    /// Glob selecting the page sources
    #[serde(default = "default_pages")]
    pub pages: String,

    /// Globs selecting files copied verbatim to the output
    #[serde(default = "default_assets")]
    pub assets: Vec<String>,

    /// Maximum include expansion rounds per page
    #[serde(default = "default_include_limit")]
    pub include_limit: usize,
}

fn default_template() -> String {
    String::from("_template.html")
}

fn default_pages() -> String {
    String::from("*.md")
}

fn default_assets() -> Vec<String> {
    vec![String::from("**/*.{css,png,jpg,gif}")]
}

fn default_include_limit() -> usize {
    DEFAULT_INCLUDE_LIMIT
}

impl Default for Config {
    fn default() -> Self {
        Self {
            template: default_template(),
            pages: default_pages(),
            assets: default_assets(),
            include_limit: default_include_limit(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&contents)
    }

    /// Parse and validate YAML. An empty document yields the defaults.
    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = if contents.trim().is_empty() {
            Config::default()
        } else {
            serde_yaml::from_str(contents)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Load `wikismith.yml` from `dir` when present, otherwise the defaults
    pub fn discover<P: AsRef<Path>>(dir: P) -> Result<Self, ConfigError> {
        let path = dir.as_ref().join(CONFIG_FILE_NAME);
        if path.is_file() {
            tracing::debug!("Using config file {:?}", path);
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.include_limit == 0 {
            return Err(ConfigError::Invalid(
                "include_limit must be at least 1".to_string(),
            ));
        }
        if self.pages.trim().is_empty() {
            return Err(ConfigError::Invalid("pages pattern is empty".to_string()));
        }
        if self.template.trim().is_empty() {
            return Err(ConfigError::Invalid("template path is empty".to_string()));
        }
        Ok(())
    }
}
