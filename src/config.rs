use crate::model::MonitorConfig;
use anyhow::{Context, Result};
use log::{info, warn};
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_ENV: &str = "PANELMAP_CONFIG";
const CONFIG_FILE: &str = "panelmap_config.json";
/// Shortest refresh period accepted from the config file.
pub const MIN_REFRESH_SECS: u64 = 5;

/// Loads the config, falling back to defaults when the file is missing or broken.
pub fn load_config() -> MonitorConfig {
    let path = config_path();
    if !path.exists() {
        info!("No config at {}, using defaults", path.display());
        return MonitorConfig::default();
    }
    match read_config(&path) {
        Ok(cfg) => {
            info!("Loaded config from {}", path.display());
            cfg
        }
        Err(e) => {
            warn!("Ignoring config: {:#}", e);
            MonitorConfig::default()
        }
    }
}

pub fn read_config(path: &Path) -> Result<MonitorConfig> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config at {:?}", path))?;
    parse_config(&text).with_context(|| format!("Invalid config at {:?}", path))
}

pub fn parse_config(text: &str) -> Result<MonitorConfig> {
    let mut cfg: MonitorConfig = serde_json::from_str(text)?;
    cfg.refresh_interval_secs = cfg.refresh_interval_secs.max(MIN_REFRESH_SECS);
    cfg.layout_url = cfg.layout_url.filter(|u| !u.trim().is_empty());
    cfg.readings_url = cfg.readings_url.filter(|u| !u.trim().is_empty());
    Ok(cfg)
}

pub fn config_path() -> PathBuf {
    if let Some(path) = std::env::var_os(CONFIG_ENV) {
        return PathBuf::from(path);
    }

    #[cfg(target_os = "macos")]
    {
        if let Some(home) = home::home_dir() {
            return home
                .join("Library")
                .join("Application Support")
                .join("Panelmap")
                .join(CONFIG_FILE);
        }
    }

    #[cfg(target_os = "windows")]
    {
        if let Some(base) = std::env::var_os("APPDATA") {
            return PathBuf::from(base).join("Panelmap").join(CONFIG_FILE);
        }
    }

    // Linux / fallback: XDG or ~/.config
    if let Ok(base) = std::env::var("XDG_CONFIG_HOME") {
        PathBuf::from(base).join("panelmap").join(CONFIG_FILE)
    } else if let Some(home) = home::home_dir() {
        home.join(".config").join("panelmap").join(CONFIG_FILE)
    } else {
        PathBuf::from(CONFIG_FILE)
    }
}
