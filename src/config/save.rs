use crate::config::load::SETTINGS_FILE;
use crate::config::types::{Config, MAX_RECENT_PATHS, UserSettings};
use anyhow::{Context, Result};
use log::warn;
use std::fs;
use std::path::Path;

pub fn save_settings(settings: &UserSettings) -> Result<()> {
    save_settings_to(settings, Path::new(SETTINGS_FILE))
}

pub fn save_settings_to(settings: &UserSettings, path: &Path) -> Result<()> {
    let content = serde_json::to_string_pretty(settings).context("Failed to serialize settings")?;

    fs::write(path, content)
        .with_context(|| format!("Failed to write settings to {}", path.display()))?;

    Ok(())
}

/// 更新最近使用的路徑
/// 將新路徑加入最前面，去重並限制數量
pub fn add_recent_path(settings: &mut UserSettings, path: &str) {
    settings.recent_paths.retain(|p| p != path);
    settings.recent_paths.insert(0, path.to_string());
    settings.recent_paths.truncate(MAX_RECENT_PATHS);
}

impl Config {
    /// 記錄路徑並寫回設定檔；寫入失敗只記錄警告
    pub fn remember_path(&mut self, path: &str) {
        add_recent_path(&mut self.settings, path);
        if let Err(e) = save_settings(&self.settings) {
            warn!("無法儲存設定: {e:#}");
        }
    }
}
