//! Configuration resolution for mlx-indexer
//!
//! Priority per setting: CLI → environment (`MLX_*`) → TOML file → defaults.
//! The TOML file carries the shared `mlx_common` keys plus an `[indexing]` table.

use crate::models::IndexingParameters;
use mlx_common::config::{
    default_data_dir, locate_config_file, read_toml_file, resolve_setting, write_toml_config,
    TomlConfig,
};
use mlx_common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

pub const LIBRARY_ROOT_ENV_VAR: &str = "MLX_LIBRARY_ROOT";
pub const DATABASE_PATH_ENV_VAR: &str = "MLX_DATABASE_PATH";
pub const BIND_ADDRESS_ENV_VAR: &str = "MLX_BIND_ADDRESS";

pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:5740";

/// On-disk layout of the config file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexerConfigFile {
    #[serde(flatten)]
    pub common: TomlConfig,

    #[serde(default)]
    pub indexing: IndexingParameters,
}

/// Values given on the command line
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub config_path: Option<PathBuf>,
    pub library_root: Option<PathBuf>,
    pub database_path: Option<PathBuf>,
    pub bind_address: Option<String>,
    pub parallelism: Option<usize>,
}

/// Fully resolved runtime configuration
#[derive(Debug, Clone, PartialEq)]
pub struct IndexerConfig {
    /// Default root for jobs started without one
    pub library_root: Option<PathBuf>,
    pub database_path: PathBuf,
    pub bind_address: String,
    pub log_level: String,
    pub indexing: IndexingParameters,
}

impl IndexerConfig {
    /// Load the config file (if any) and apply overrides
    pub fn load(overrides: ConfigOverrides) -> Result<Self> {
        let file = match locate_config_file(overrides.config_path.as_deref()) {
            Some(path) => {
                info!(path = %path.display(), "Loading config file");
                read_toml_file::<IndexerConfigFile>(&path)?
            }
            None => IndexerConfigFile::default(),
        };
        Self::resolve(file, overrides)
    }

    /// Merge a parsed file with overrides and environment
    pub fn resolve(file: IndexerConfigFile, overrides: ConfigOverrides) -> Result<Self> {
        let IndexerConfigFile { common, indexing } = file;

        let library_root: PathBuf = resolve_setting(
            overrides.library_root,
            LIBRARY_ROOT_ENV_VAR,
            common.library_root,
            PathBuf::new,
        );
        let library_root = (!library_root.as_os_str().is_empty()).then_some(library_root);

        let database_path: PathBuf = resolve_setting(
            overrides.database_path,
            DATABASE_PATH_ENV_VAR,
            common.database_path,
            || default_data_dir().join("mlx.db"),
        );

        let bind_address: String = resolve_setting(
            overrides.bind_address,
            BIND_ADDRESS_ENV_VAR,
            common.bind_address,
            || DEFAULT_BIND_ADDRESS.to_string(),
        );

        let mut indexing = indexing.normalized();
        if let Some(parallelism) = overrides.parallelism {
            indexing.parallelism = parallelism;
        }
        indexing
            .validate()
            .map_err(|e| Error::Config(format!("[indexing] {}", e)))?;

        Ok(Self {
            library_root,
            database_path,
            bind_address,
            log_level: common.logging.level,
            indexing,
        })
    }
}

/// Write a config file with every default spelled out
///
/// Refuses to overwrite an existing file.
pub fn write_default_config(path: &Path) -> Result<()> {
    if path.exists() {
        return Err(Error::Config(format!(
            "{} already exists; not overwriting",
            path.display()
        )));
    }

    let file = IndexerConfigFile {
        common: TomlConfig {
            database_path: Some(default_data_dir().join("mlx.db")),
            bind_address: Some(DEFAULT_BIND_ADDRESS.to_string()),
            ..Default::default()
        },
        indexing: IndexingParameters::default(),
    };
    write_toml_config(&file, path)?;
    info!(path = %path.display(), "Wrote default config");
    Ok(())
}
