//! Configuration loading and root folder resolution
//!
//! Every setting follows the same priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. OS-dependent compiled default (fallback)

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::warn;

pub const ENV_ROOT_FOLDER: &str = "RESUMO_ROOT_FOLDER";
pub const ENV_HOST: &str = "RESUMO_HOST";
pub const ENV_PORT: &str = "RESUMO_PORT";
pub const ENV_MEDIA_DIR: &str = "RESUMO_MEDIA_DIR";

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 5780;
pub const DATABASE_FILE_NAME: &str = "resumo.db";

/// Contents of `config.toml`; every key is optional
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    pub root_folder: Option<PathBuf>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub media_dir: Option<PathBuf>,
}

impl TomlConfig {
    /// Parse a config file. Missing or malformed files are errors here;
    /// callers decide whether to degrade to defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    /// Load the platform config file if one exists.
    ///
    /// A missing file yields `None`; a broken one is logged and ignored so
    /// the service still starts on defaults.
    pub fn load_default() -> Option<Self> {
        let path = default_config_path()?;
        match Self::load(&path) {
            Ok(config) => Some(config),
            Err(e) => {
                warn!("Ignoring config file: {}", e);
                None
            }
        }
    }
}

/// Values supplied on the command line
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub root_folder: Option<PathBuf>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub media_dir: Option<PathBuf>,
    /// Explicit config file; replaces the platform lookup
    pub config_file: Option<PathBuf>,
}

/// Fully resolved server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub root_folder: PathBuf,
    pub media_dir: PathBuf,
    pub database_path: PathBuf,
}

impl ServerConfig {
    pub fn resolve(overrides: &ConfigOverrides) -> Result<Self> {
        let toml = match &overrides.config_file {
            Some(path) => Some(TomlConfig::load(path)?),
            None => TomlConfig::load_default(),
        };

        let root_folder = resolve_root_folder(overrides.root_folder.as_deref(), toml.as_ref());

        let host = overrides
            .host
            .clone()
            .or_else(|| std::env::var(ENV_HOST).ok())
            .or_else(|| toml.as_ref().and_then(|t| t.host.clone()))
            .unwrap_or_else(|| DEFAULT_HOST.to_string());

        let port = match overrides.port {
            Some(port) => port,
            None => match std::env::var(ENV_PORT) {
                Ok(raw) => parse_port(&raw)?,
                Err(_) => toml.as_ref().and_then(|t| t.port).unwrap_or(DEFAULT_PORT),
            },
        };
        if port == 0 {
            return Err(Error::Config("port must be between 1 and 65535".to_string()));
        }

        let media_dir = overrides
            .media_dir
            .clone()
            .or_else(|| std::env::var(ENV_MEDIA_DIR).ok().map(PathBuf::from))
            .or_else(|| toml.as_ref().and_then(|t| t.media_dir.clone()))
            .unwrap_or_else(|| root_folder.join("media"));

        let database_path = root_folder.join(DATABASE_FILE_NAME);

        Ok(Self {
            host,
            port,
            root_folder,
            media_dir,
            database_path,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_port(raw: &str) -> Result<u16> {
    raw.trim()
        .parse::<u16>()
        .map_err(|e| Error::Config(format!("invalid {} '{}': {}", ENV_PORT, raw, e)))
}

/// Resolve the root folder holding the database and media
pub fn resolve_root_folder(cli_arg: Option<&Path>, toml: Option<&TomlConfig>) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(ENV_ROOT_FOLDER) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(root) = toml.and_then(|t| t.root_folder.clone()) {
        return root;
    }

    default_root_folder()
}

/// Platform config file location, if one exists
fn default_config_path() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("resumo").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/resumo/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// OS-dependent default root folder path
pub fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        dirs::data_local_dir()
            .map(|d| d.join("resumo"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/resumo"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("resumo"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/resumo"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("resumo"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\resumo"))
    } else {
        PathBuf::from("./resumo_data")
    }
}
