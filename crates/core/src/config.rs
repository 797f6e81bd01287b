use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_OUTPUT_DIR: &str = "renamed";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub image_extensions: Vec<String>,
    pub video_extensions: Vec<String>,
    pub output_dir_name: String,
    pub ffprobe_path: String,
    pub log_dir: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            image_extensions: ["jpg", "jpeg", "heic", "cr2", "png"]
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
            video_extensions: ["mp4", "mov"].iter().map(|ext| ext.to_string()).collect(),
            output_dir_name: DEFAULT_OUTPUT_DIR.to_string(),
            ffprobe_path: "ffprobe".to_string(),
            log_dir: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub config_path: PathBuf,
}

pub fn app_paths() -> Result<AppPaths> {
    let proj = ProjectDirs::from("com", "media-renamer", "media-renamer")
        .context("could not resolve the OS config directory")?;
    Ok(AppPaths {
        config_path: proj.config_dir().join("config.toml"),
    })
}

/// Loads `config.toml` from the OS config directory, or defaults when absent.
pub fn load_config() -> Result<AppConfig> {
    let paths = app_paths()?;
    if !paths.config_path.exists() {
        return Ok(AppConfig::default());
    }
    load_config_from(&paths.config_path)
}

pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("could not read config file: {}", path.display()))?;

    let config = toml::from_str::<AppConfig>(&raw)
        .with_context(|| format!("could not parse config file: {}", path.display()))?;
    Ok(config)
}
