use crate::component::sharpest_frame_extractor::DEFAULT_SAVE_WORKERS;
use crate::component::video_transcoder::{DEFAULT_LOG_FILE, DEFAULT_STATE_FILE, RenditionLadder};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// 最近使用路徑的保存數量
pub const MAX_RECENT_PATHS: usize = 10;

/// 介面語言
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Language {
    #[default]
    #[serde(rename = "zh-TW")]
    ZhTw,
    #[serde(rename = "en-US")]
    EnUs,
}

impl Language {
    pub const ALL: [Self; 2] = [Self::ZhTw, Self::EnUs];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ZhTw => "zh-TW",
            Self::EnUs => "en-US",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZhTw => write!(f, "繁體中文"),
            Self::EnUs => write!(f, "English"),
        }
    }
}

/// 每秒最清晰影格擷取設定
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorSettings {
    pub output_dir: PathBuf,
    /// 存檔執行緒數
    pub max_workers: usize,
}

impl Default for ExtractorSettings {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("video_frames"),
            max_workers: DEFAULT_SAVE_WORKERS,
        }
    }
}

/// 多解析度轉檔設定
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscoderSettings {
    pub output_dir: PathBuf,
    /// 編碼中的檔案先寫在這裡，完成後才移到 `output_dir`
    pub temp_dir: PathBuf,
    pub state_file: PathBuf,
    /// 每次狀態轉換附加一筆事件
    pub log_file: PathBuf,
    pub ladder: RenditionLadder,
}

impl Default for TranscoderSettings {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("transcoded_output"),
            temp_dir: PathBuf::from("temp_transcode"),
            state_file: PathBuf::from(DEFAULT_STATE_FILE),
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
            ladder: RenditionLadder::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserSettings {
    pub language: Language,
    pub extractor: ExtractorSettings,
    pub transcoder: TranscoderSettings,
    pub recent_paths: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub settings: UserSettings,
}
