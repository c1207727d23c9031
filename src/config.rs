use crate::breakpoints::{BreakpointModel, FeatureBreakpoint, Length, WidthBreakpoint};
use crate::direction::Direction;
use crate::emission::Settings;
use crate::error::ModelError;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub direction: Direction,
    #[serde(default)]
    pub silent: bool,
    #[serde(default)]
    pub breakpoints: Breakpoints,
}

/// Either table left out falls back to the built-in one.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct Breakpoints {
    pub lengths: Option<Vec<LengthEntry>>,
    pub features: Option<Vec<FeatureEntry>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LengthEntry {
    pub name: String,
    pub width: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FeatureEntry {
    pub name: String,
    pub condition: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid breakpoints: {0}")]
    Model(#[from] ModelError),
}

pub fn load(path: &Path) -> Result<Config, ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

impl Config {
    /// Validates the configured breakpoints into pass settings.
    pub fn settings(&self) -> Result<Settings, ConfigError> {
        Ok(Settings {
            model: self.breakpoints.model()?,
            namespace: self.namespace.trim().to_string(),
            direction: self.direction,
            silent: self.silent,
        })
    }
}

impl Breakpoints {
    pub fn model(&self) -> Result<BreakpointModel, ModelError> {
        let fallback = BreakpointModel::default();

        let lengths = match &self.lengths {
            Some(entries) => entries
                .iter()
                .map(|entry| {
                    let width = Length::parse(&entry.width).ok_or_else(|| ModelError::InvalidLength {
                        name: entry.name.clone(),
                        raw: entry.width.clone(),
                    })?;
                    Ok(WidthBreakpoint {
                        name: entry.name.trim().to_string(),
                        width,
                    })
                })
                .collect::<Result<Vec<_>, ModelError>>()?,
            None => fallback.lengths().to_vec(),
        };

        let features = match &self.features {
            Some(entries) => entries
                .iter()
                .map(|entry| FeatureBreakpoint {
                    name: entry.name.trim().to_string(),
                    condition: entry.condition.trim().to_string(),
                })
                .collect(),
            None => fallback.features().to_vec(),
        };

        BreakpointModel::new(lengths, features)
    }
}
