//! Configuration paths
//!
//! Uses the directories crate for platform-appropriate locations:
//! - Linux: `~/.config/backend-scenarios/`
//! - macOS: `~/Library/Application Support/backend-scenarios/`
//! - Windows: `%APPDATA%\backend-scenarios\`

use std::io;
use std::path::PathBuf;

/// Application name used for config directories
const APP_NAME: &str = "backend-scenarios";

/// Get the configuration directory path
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the configuration file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.toml"))
}

/// Directory searched for declarative scenario files given by bare name
pub fn scenarios_dir() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("scenarios"))
}

/// Ensure the configuration directory exists
pub fn ensure_config_dir() -> io::Result<Option<PathBuf>> {
    if let Some(dir) = config_dir() {
        if !dir.exists() {
            std::fs::create_dir_all(&dir)?;
        }
        Ok(Some(dir))
    } else {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_path_is_toml() {
        if let Some(path) = config_path() {
            assert_eq!(path.extension().and_then(|e| e.to_str()), Some("toml"));
        }
    }

    #[test]
    fn test_scenarios_dir_under_config_dir() {
        if let (Some(config), Some(scenarios)) = (config_dir(), scenarios_dir()) {
            assert!(scenarios.starts_with(config));
        }
    }
}
