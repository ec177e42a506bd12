use std::{fs::File, io::BufReader, path::Path};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ident::{MAX_IDENTIFIER_LEN, is_valid_identifier};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Opening config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Parsing config YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// How shared columns whose kinds differ are reconciled.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
#[value(rename_all = "kebab-case")]
pub enum ModifyPolicy {
    /// Change every differing column to the inferred type and let the engine
    /// refuse conversions it cannot make.
    #[default]
    MatchInferred,
    /// Only widen (`INT` -> `DOUBLE` -> `TEXT`); narrower inferred kinds and
    /// unrecognized live types are left alone.
    WidenOnly,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WriterConfig {
    /// Synthetic auto-increment primary key created with new tables.
    pub identity_column: String,
    pub modify_policy: ModifyPolicy,
    /// Rows per insert batch; 0 inserts everything in one batch.
    pub batch_size: usize,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            identity_column: "id".to_string(),
            modify_policy: ModifyPolicy::default(),
            batch_size: 0,
        }
    }
}

impl WriterConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let file = File::open(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config: WriterConfig = serde_yaml::from_reader(BufReader::new(file))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_str(input: &str) -> Result<Self, ConfigError> {
        let config: WriterConfig = serde_yaml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_valid_identifier(&self.identity_column) {
            return Err(ConfigError::Invalid(format!(
                "identity_column '{}' must be an identifier of at most {MAX_IDENTIFIER_LEN} characters",
                self.identity_column
            )));
        }
        Ok(())
    }
}
