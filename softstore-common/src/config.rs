//! Configuration loading and root folder resolution
//!
//! Bootstrap configuration comes from an optional TOML file. Every setting has
//! a built-in default, so the service starts with no configuration at all.
//!
//! Config file priority:
//! 1. Command-line argument (`--config`)
//! 2. Environment variable (`SOFTSTORE_CONFIG`)
//! 3. `<config dir>/softstore/config.toml` if it exists
//! 4. Built-in defaults
//!
//! Root folder priority:
//! 1. Command-line argument (`--root-folder`)
//! 2. Environment variable (`SOFTSTORE_ROOT_FOLDER`)
//! 3. `root_folder` key in the TOML file
//! 4. OS-dependent compiled default

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable naming the TOML config file
pub const CONFIG_ENV_VAR: &str = "SOFTSTORE_CONFIG";

/// Environment variable naming the root folder
pub const ROOT_FOLDER_ENV_VAR: &str = "SOFTSTORE_ROOT_FOLDER";

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 5740;

/// Default maximum size of an uploaded archive (10 MiB)
pub const DEFAULT_MAX_UPLOAD_SIZE_BYTES: u64 = 10 * 1024 * 1024;

/// Default name of the metadata entry inside an uploaded archive
pub const DEFAULT_METADATA_FILE_NAME: &str = "info.txt";

/// Bootstrap configuration as written in the TOML file
///
/// All keys are optional. Paths left unset are derived from the root folder.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    #[serde(default)]
    pub database_path: Option<PathBuf>,

    #[serde(default)]
    pub bind_host: Option<String>,

    #[serde(default)]
    pub port: Option<u16>,

    #[serde(default)]
    pub max_upload_size_bytes: Option<u64>,

    /// Directory receiving uploaded archives while they are processed
    #[serde(default)]
    pub temp_upload_dir: Option<PathBuf>,

    /// Durable directory that accepted program files are transferred into
    #[serde(default)]
    pub storage_dir: Option<PathBuf>,

    #[serde(default)]
    pub metadata_file_name: Option<String>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Fully resolved service configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub root_folder: PathBuf,
    pub database_path: PathBuf,
    pub bind_host: String,
    pub port: u16,
    pub max_upload_size_bytes: u64,
    pub temp_upload_dir: PathBuf,
    pub storage_dir: PathBuf,
    pub metadata_file_name: String,
    pub log_level: String,
}

impl Config {
    /// Resolve a configuration from TOML values, filling defaults under `root_folder`
    pub fn from_toml(toml: TomlConfig, root_folder: PathBuf) -> Result<Self> {
        let max_upload_size_bytes = toml
            .max_upload_size_bytes
            .unwrap_or(DEFAULT_MAX_UPLOAD_SIZE_BYTES);
        if max_upload_size_bytes == 0 {
            return Err(Error::Config(
                "max_upload_size_bytes must be greater than zero".to_string(),
            ));
        }

        let metadata_file_name = toml
            .metadata_file_name
            .unwrap_or_else(|| DEFAULT_METADATA_FILE_NAME.to_string());
        if metadata_file_name.trim().is_empty() {
            return Err(Error::Config(
                "metadata_file_name must not be blank".to_string(),
            ));
        }

        Ok(Self {
            database_path: toml
                .database_path
                .unwrap_or_else(|| root_folder.join("softstore.db")),
            bind_host: toml.bind_host.unwrap_or_else(|| "127.0.0.1".to_string()),
            port: toml.port.unwrap_or(DEFAULT_PORT),
            max_upload_size_bytes,
            temp_upload_dir: toml
                .temp_upload_dir
                .unwrap_or_else(|| root_folder.join("tmp").join("uploads")),
            storage_dir: toml
                .storage_dir
                .unwrap_or_else(|| root_folder.join("programs")),
            metadata_file_name: metadata_file_name.trim().to_string(),
            log_level: toml.logging.level,
            root_folder,
        })
    }

    /// Upload size limit as shown on the submission form
    pub fn max_upload_size_kb(&self) -> u64 {
        self.max_upload_size_bytes / 1024
    }

    /// Socket address string the HTTP server binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.bind_host, self.port)
    }
}

/// Locate the TOML config file, if any
pub fn resolve_config_path(cli_arg: Option<&Path>, env_var_name: &str) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: Platform config directory
    dirs::config_dir()
        .map(|d| d.join("softstore").join("config.toml"))
        .filter(|path| path.exists())
}

/// Load the TOML config file, or defaults when no file is given
pub fn load_toml_config(path: Option<&Path>) -> Result<TomlConfig> {
    let Some(path) = path else {
        return Ok(TomlConfig::default());
    };

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    parse_toml_config(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// Parse TOML text into a [`TomlConfig`]
pub fn parse_toml_config(content: &str) -> std::result::Result<TomlConfig, toml::de::Error> {
    toml::from_str(content)
}

/// Root folder resolution (CLI, environment, TOML, OS default)
pub fn resolve_root_folder(
    cli_arg: Option<&Path>,
    env_var_name: &str,
    toml: &TomlConfig,
) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &toml.root_folder {
        return path.clone();
    }

    get_default_root_folder()
}

/// Get OS-dependent default root folder path
fn get_default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        dirs::data_local_dir()
            .map(|d| d.join("softstore"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/softstore"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("softstore"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/softstore"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("softstore"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\softstore"))
    } else {
        PathBuf::from("./softstore_data")
    }
}
