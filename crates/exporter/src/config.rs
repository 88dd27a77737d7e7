use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::settings::{X264Preset, X264Tune};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExporterConfig {
    pub ffmpeg_path: PathBuf,
    pub work_dir: PathBuf,
    pub keep_work_dir: bool,
    pub output_dir: PathBuf,
    pub write_reports: bool,
    pub default_preset: X264Preset,
    pub default_tune: X264Tune,
    pub default_bitrate_kbps: u32,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: PathBuf::from("ffmpeg"),
            work_dir: std::env::temp_dir().join("clipcut"),
            keep_work_dir: false,
            output_dir: PathBuf::from("."),
            write_reports: false,
            default_preset: X264Preset::Medium,
            default_tune: X264Tune::None,
            default_bitrate_kbps: 2000,
        }
    }
}

pub fn load_config(path: Option<&std::path::Path>) -> Result<ExporterConfig> {
    let config = if let Some(config_path) = path {
        if config_path.exists() {
            let contents = std::fs::read_to_string(config_path)
                .map_err(|e| anyhow::anyhow!("Failed to read config file: {}", e))?;

            toml::from_str::<ExporterConfig>(&contents)
                .map_err(|e| anyhow::anyhow!("Failed to parse TOML config: {}", e))?
        } else {
            #[cfg(not(test))]
            tracing::warn!("Config file not found at {:?}, using defaults", config_path);
            ExporterConfig::default()
        }
    } else {
        #[cfg(not(test))]
        tracing::info!("No config path provided, using defaults");
        ExporterConfig::default()
    };

    validate_config(&config)?;
    Ok(config)
}

pub fn validate_config(config: &ExporterConfig) -> Result<()> {
    if config.ffmpeg_path.as_os_str().is_empty() {
        anyhow::bail!("ffmpeg_path cannot be empty");
    }

    if config.work_dir.as_os_str().is_empty() {
        anyhow::bail!("work_dir cannot be empty");
    }

    if config.default_bitrate_kbps == 0 {
        anyhow::bail!("default_bitrate_kbps must be at least 1");
    }

    Ok(())
}
