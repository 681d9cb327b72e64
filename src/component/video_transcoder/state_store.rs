//! 轉檔進度狀態檔
//!
//! 每次狀態轉換都整份重寫：先寫入同目錄的暫存檔、fsync，再 rename 覆蓋，
//! 因此程序在任何時間點被終止，磁碟上的狀態檔都仍可完整讀回。

use crate::error::{VideoError, VideoResult};
use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// 預設狀態檔位置（相對於工作目錄）
pub const DEFAULT_STATE_FILE: &str = "transcoding_state.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RenditionStatus {
    NotStarted,
    InProgress,
    Completed { output_path: PathBuf },
    Failed { reason: String },
}

impl RenditionStatus {
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenditionRecord {
    pub status: RenditionStatus,
    pub updated_at: DateTime<Utc>,
}

/// 單一工作（輸入檔 + 輸出名稱）的所有 rendition 狀態
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobState {
    #[serde(default)]
    pub renditions: BTreeMap<String, RenditionRecord>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl JobState {
    /// 沒有紀錄的 rendition 視為尚未開始
    #[must_use]
    pub fn status(&self, rendition_id: &str) -> RenditionStatus {
        self.renditions
            .get(rendition_id)
            .map_or(RenditionStatus::NotStarted, |record| record.status.clone())
    }

    /// 上次執行中斷時留下的 in_progress 不可信任，重新載入時改回 not_started
    fn reset_interrupted(&mut self) {
        for (id, record) in &mut self.renditions {
            if record.status == RenditionStatus::InProgress {
                debug!("rendition {id} 上次未完成，重新編碼");
                record.status = RenditionStatus::NotStarted;
            }
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StateFile {
    #[serde(default)]
    jobs: BTreeMap<String, JobState>,
}

/// 工作識別：輸入路徑 + 輸出名稱
#[must_use]
pub fn job_key(input_path: &Path, output_name: &str) -> String {
    format!("{}::{output_name}", input_path.display())
}

/// 以 JSON 檔保存單一工作的轉檔狀態，每次標記都立即寫入
#[derive(Debug)]
pub struct StateStore {
    path: PathBuf,
    job_key: String,
    job: JobState,
}

impl StateStore {
    #[must_use]
    pub fn new(path: &Path, job_key: impl Into<String>) -> Self {
        Self {
            path: path.to_path_buf(),
            job_key: job_key.into(),
            job: JobState::default(),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn job_state(&self) -> &JobState {
        &self.job
    }

    /// 讀取此工作的狀態；沒有狀態檔或沒有此工作時回傳空狀態
    pub fn load(&mut self) -> VideoResult<JobState> {
        let mut file = read_state_file(&self.path)?;
        let mut job = file.jobs.remove(&self.job_key).unwrap_or_default();
        job.reset_interrupted();
        self.job = job;
        Ok(self.job.clone())
    }

    pub fn mark_in_progress(&mut self, rendition_id: &str) -> VideoResult<()> {
        self.update(rendition_id, RenditionStatus::InProgress)
    }

    pub fn mark_completed(&mut self, rendition_id: &str, output_path: &Path) -> VideoResult<()> {
        self.update(
            rendition_id,
            RenditionStatus::Completed {
                output_path: output_path.to_path_buf(),
            },
        )
    }

    pub fn mark_failed(&mut self, rendition_id: &str, reason: &str) -> VideoResult<()> {
        self.update(
            rendition_id,
            RenditionStatus::Failed {
                reason: reason.to_string(),
            },
        )
    }

    fn update(&mut self, rendition_id: &str, status: RenditionStatus) -> VideoResult<()> {
        let now = Utc::now();
        self.job.renditions.insert(
            rendition_id.to_string(),
            RenditionRecord {
                status,
                updated_at: now,
            },
        );
        self.job.updated_at = Some(now);
        self.persist()
    }

    /// 重新讀取狀態檔以保留其他工作的紀錄，再整份原子寫回
    fn persist(&self) -> VideoResult<()> {
        let mut file = read_state_file(&self.path)?;
        file.jobs.insert(self.job_key.clone(), self.job.clone());

        let content = serde_json::to_string_pretty(&file)
            .map_err(|e| VideoError::io(&self.path, std::io::Error::other(e)))?;
        write_atomically(&self.path, content.as_bytes())
    }
}

fn read_state_file(path: &Path) -> VideoResult<StateFile> {
    if !path.exists() {
        return Ok(StateFile::default());
    }

    let content = fs::read_to_string(path).map_err(|e| VideoError::io(path, e))?;
    if content.trim().is_empty() {
        return Ok(StateFile::default());
    }

    serde_json::from_str(&content).map_err(|e| {
        VideoError::config(format!("無法解析狀態檔 {}: {e}", path.display()))
    })
}

fn write_atomically(path: &Path, content: &[u8]) -> VideoResult<()> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent).map_err(|e| VideoError::io(parent, e))?;

    let mut temp_file = NamedTempFile::new_in(parent).map_err(|e| VideoError::io(parent, e))?;
    temp_file
        .write_all(content)
        .and_then(|()| temp_file.as_file().sync_all())
        .map_err(|e| VideoError::io(temp_file.path(), e))?;

    temp_file
        .persist(path)
        .map_err(|e| VideoError::io(path, e.error))?;
    Ok(())
}
