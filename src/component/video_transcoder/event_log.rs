//! 轉檔事件紀錄
//!
//! 每次狀態轉換附加一行 JSON 到紀錄檔，只供查閱；續傳判斷只看狀態檔。

use crate::error::{VideoError, VideoResult};
use chrono::{DateTime, Utc};
use log::warn;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// 預設事件紀錄檔位置（相對於工作目錄）
pub const DEFAULT_LOG_FILE: &str = "transcoding_log.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TranscodeEventKind {
    Started,
    Skipped,
    Completed,
    Failed,
    Interrupted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscodeEvent {
    pub timestamp: DateTime<Utc>,
    pub job: String,
    pub rendition: String,
    pub event: TranscodeEventKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// JSON Lines 格式的事件紀錄檔，只附加不改寫
#[derive(Debug, Clone)]
pub struct EventLog {
    path: PathBuf,
}

impl EventLog {
    #[must_use]
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(
        &self,
        job: &str,
        rendition: &str,
        event: TranscodeEventKind,
        detail: Option<&str>,
    ) -> VideoResult<()> {
        let record = TranscodeEvent {
            timestamp: Utc::now(),
            job: job.to_string(),
            rendition: rendition.to_string(),
            event,
            detail: detail.map(str::to_string),
        };
        let line = serde_json::to_string(&record)
            .map_err(|e| VideoError::io(&self.path, std::io::Error::other(e)))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| VideoError::io(parent, e))?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| VideoError::io(&self.path, e))?;
        writeln!(file, "{line}").map_err(|e| VideoError::io(&self.path, e))
    }

    /// 讀回所有事件；程序中斷時可能留下不完整的最後一行，直接略過
    pub fn read_all(&self) -> VideoResult<Vec<TranscodeEvent>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&self.path).map_err(|e| VideoError::io(&self.path, e))?;
        Ok(content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| match serde_json::from_str(line) {
                Ok(event) => Some(event),
                Err(e) => {
                    warn!("略過無法解析的事件紀錄: {e}");
                    None
                }
            })
            .collect())
    }
}
