use anyhow::{anyhow, Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Backend configuration. API keys fall back to environment variables
/// (`GEMINI_API_KEY`, `CLIPDROP_API_KEY`) when unset here.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    pub gemini_api_key: Option<String>,
    pub gemini_model: Option<String>,
    pub clipdrop_api_key: Option<String>,
    pub clipdrop_base_url: Option<String>,
}

pub fn app_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("app", "storyviz", "storyviz")
        .ok_or_else(|| anyhow!("cannot resolve project dirs"))
}

pub fn ensure_data_dir() -> Result<PathBuf> {
    let dirs = app_dirs()?;
    let data_dir = dirs.data_dir().to_path_buf();
    fs::create_dir_all(&data_dir).context("create data dir")?;
    Ok(data_dir)
}

pub fn settings_path(data_dir: &Path) -> PathBuf {
    data_dir.join("settings.json")
}

pub fn load_settings_from_dir(data_dir: &Path) -> Settings {
    let path = settings_path(data_dir);
    if let Ok(bytes) = fs::read(&path) {
        if let Ok(s) = serde_json::from_slice::<Settings>(&bytes) {
            return s;
        }
    }
    Settings::default()
}

/// Loads settings from the app data dir, creating the dir on first use.
pub fn load_settings() -> Result<Settings> {
    let data_dir = ensure_data_dir()?;
    Ok(load_settings_from_dir(&data_dir))
}

pub fn save_settings_to_dir(data_dir: &Path, s: &Settings) -> Result<()> {
    let path = settings_path(data_dir);
    let json = serde_json::to_vec_pretty(s)?;
    fs::write(path, json).context("write settings")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_settings() {
        let dir = tempfile::tempdir().unwrap();
        let s = Settings {
            gemini_api_key: Some("k1".into()),
            gemini_model: None,
            clipdrop_api_key: Some("k2".into()),
            clipdrop_base_url: Some("http://localhost:9999".into()),
        };
        save_settings_to_dir(dir.path(), &s).unwrap();
        let loaded = load_settings_from_dir(dir.path());
        assert_eq!(loaded.gemini_api_key.as_deref(), Some("k1"));
        assert_eq!(
            loaded.clipdrop_base_url.as_deref(),
            Some("http://localhost:9999")
        );
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = load_settings_from_dir(dir.path());
        assert!(loaded.gemini_api_key.is_none());
    }
}
