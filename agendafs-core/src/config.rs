//! agendafs configuration.

use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::constants::DEFAULT_FILE_EXTENSION;
use crate::error::{AgendaFsError, AgendaFsResult};

static DEFAULT_VDIR_PATH: &str = "~/.calendars/journal";

/// Longest accepted default extension, in bytes
const MAX_EXTENSION_LEN: usize = 255;

fn default_vdir_path() -> PathBuf {
    PathBuf::from(DEFAULT_VDIR_PATH)
}

fn default_file_extension() -> String {
    DEFAULT_FILE_EXTENSION.to_string()
}

/// Configuration at ~/.config/agendafs/config.toml, overridable through
/// `AGENDAFS_*` environment variables and command line flags.
#[derive(Debug, Deserialize, Clone)]
pub struct AgendaFsConfig {
    /// Directory holding the .ics records
    #[serde(default = "default_vdir_path")]
    pub vdir: PathBuf,

    /// Extension shown for records without one of their own
    #[serde(default = "default_file_extension")]
    pub default_extension: String,
}

/// Values given on the command line, applied over file and environment
#[derive(Debug, Default, Clone)]
pub struct ConfigOverrides {
    pub vdir: Option<String>,
    pub default_extension: Option<String>,
}

impl AgendaFsConfig {
    pub fn config_path() -> AgendaFsResult<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| AgendaFsError::Config("Could not determine config directory".into()))?
            .join("agendafs");

        Ok(config_dir.join("config.toml"))
    }

    /// Load from the default location, creating a commented config file
    /// there if there is none yet.
    pub fn load(overrides: &ConfigOverrides) -> AgendaFsResult<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            Self::create_default_config(&config_path)?;
        }

        Self::load_from(&config_path, overrides)
    }

    pub fn load_from(path: &Path, overrides: &ConfigOverrides) -> AgendaFsResult<Self> {
        let config: AgendaFsConfig = Config::builder()
            .add_source(File::from(path.to_path_buf()).required(false))
            .add_source(Environment::with_prefix("AGENDAFS"))
            .set_override_option("vdir", overrides.vdir.clone())
            .and_then(|b| {
                b.set_override_option("default_extension", overrides.default_extension.clone())
            })
            .map_err(|e| AgendaFsError::Config(e.to_string()))?
            .build()
            .map_err(|e| AgendaFsError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| AgendaFsError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// The vdir with `~` expanded
    pub fn vdir_path(&self) -> PathBuf {
        let full_path_str = shellexpand::tilde(&self.vdir.to_string_lossy()).into_owned();

        PathBuf::from(full_path_str)
    }

    pub fn validate(&self) -> AgendaFsResult<()> {
        let vdir = self.vdir_path();
        if !vdir.is_dir() {
            return Err(AgendaFsError::Config(format!(
                "vdir {} is not a directory",
                vdir.display()
            )));
        }

        if self.default_extension.starts_with('.') {
            return Err(AgendaFsError::Config(format!(
                "default extension '{}' must not start with a dot",
                self.default_extension
            )));
        }
        if self.default_extension.len() > MAX_EXTENSION_LEN {
            return Err(AgendaFsError::Config(format!(
                "default extension is longer than {} bytes",
                MAX_EXTENSION_LEN
            )));
        }

        Ok(())
    }

    /// Create a default config file with all options commented out.
    pub fn create_default_config(path: &Path) -> AgendaFsResult<()> {
        let contents = format!(
            "\
# agendafs configuration

# Directory of .ics journal records to expose:
# vdir = \"{}\"

# Extension shown for records that do not carry one:
# default_extension = \"{}\"
",
            DEFAULT_VDIR_PATH, DEFAULT_FILE_EXTENSION
        );

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                AgendaFsError::Config(format!("Could not create config directory: {e}"))
            })?;
        }

        std::fs::write(path, contents)
            .map_err(|e| AgendaFsError::Config(format!("Could not write config file: {e}")))?;

        Ok(())
    }
}
