use std::env;
use std::fs::{File, create_dir_all};
use std::io::Write;
use std::path::PathBuf;

use color_eyre::Result;
use config::{Config, Environment};
use directories::ProjectDirs;
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

lazy_static! {
    pub static ref PROJECT_NAME: String = env!("CARGO_CRATE_NAME").to_uppercase().to_string();
    pub static ref DATA_FOLDER: Option<PathBuf> =
        env::var(format!("{}_DATA", PROJECT_NAME.clone()))
            .ok()
            .map(PathBuf::from);
    pub static ref CONFIG_FOLDER: Option<PathBuf> =
        env::var(format!("{}_CONFIG", PROJECT_NAME.clone()))
            .ok()
            .map(PathBuf::from);
}

const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Spaces per nesting level in written XML, 0 for a single line.
    pub indent: usize,
    /// Treat unrecognised plugin classes as errors instead of warnings.
    pub strict_diagnostics: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            indent: 2,
            strict_diagnostics: false,
        }
    }
}

impl AppConfig {
    /// Defaults, then `config.toml` in the config dir, then `JOBCONF_*` env vars.
    pub fn new() -> Result<Self> {
        let defaults = Self::default();
        let config_file = get_config_dir().join(CONFIG_FILE);

        let settings = Config::builder()
            .set_default("indent", defaults.indent as i64)?
            .set_default("strict_diagnostics", defaults.strict_diagnostics)?
            .add_source(config::File::from(config_file).required(false))
            .add_source(Environment::with_prefix(&PROJECT_NAME).try_parsing(true))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    pub fn save(&self) -> Result<PathBuf> {
        let cfg_dir = get_config_dir();
        create_dir_all(&cfg_dir)?;

        let path = cfg_dir.join(CONFIG_FILE);
        let mut file = File::create(&path)?;
        let content = toml::to_string_pretty(self)?;
        file.write_all(content.as_bytes())?;
        Ok(path)
    }
}

pub fn get_data_dir() -> PathBuf {
    if let Some(s) = DATA_FOLDER.clone() {
        s
    } else if let Some(proj_dirs) = project_directory() {
        proj_dirs.data_local_dir().to_path_buf()
    } else {
        PathBuf::from(".").join(".data")
    }
}

pub fn get_config_dir() -> PathBuf {
    if let Some(s) = CONFIG_FOLDER.clone() {
        s
    } else if let Some(proj_dirs) = project_directory() {
        proj_dirs.config_local_dir().to_path_buf()
    } else {
        PathBuf::from(".").join(".config")
    }
}

fn project_directory() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "snpefk", env!("CARGO_PKG_NAME"))
}
