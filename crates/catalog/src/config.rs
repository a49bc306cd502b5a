use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::parser::SchemaPolicy;

pub const CONFIG_FILE_NAME: &str = "lingcat.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse configuration {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LingcatConfig {
    #[serde(default)]
    pub schema_policy: SchemaPolicy,
    #[serde(default = "default_true")]
    pub include_unfinished: bool,
    #[serde(default)]
    pub checks: CheckConfig,
}

impl Default for LingcatConfig {
    fn default() -> Self {
        Self {
            schema_policy: SchemaPolicy::default(),
            include_unfinished: true,
            checks: CheckConfig::default(),
        }
    }
}

/// Switches for the individual catalog checks.
/// （個別目錄檢查的開關。）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckConfig {
    #[serde(default = "default_true")]
    pub numerus_arity: bool,
    #[serde(default = "default_true")]
    pub place_markers: bool,
    #[serde(default = "default_true")]
    pub duplicates: bool,
    #[serde(default = "default_true")]
    pub empty_finished: bool,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            numerus_arity: true,
            place_markers: true,
            duplicates: true,
            empty_finished: true,
        }
    }
}

fn default_true() -> bool {
    true
}

impl LingcatConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Loads `path` when it exists, defaults otherwise.
    /// （檔案存在時載入 `path`，否則使用預設值。）
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        match fs::metadata(path) {
            Ok(_) => Self::load(path),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }
}
