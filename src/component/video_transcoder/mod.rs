//! 多解析度轉檔元件
//!
//! 依設定的解析度列表產生 H.264/AAC MP4，進度記錄在狀態檔中，中斷後可續傳

mod event_log;
mod ffmpeg_command;
mod main;
mod rendition_ladder;
mod state_store;

pub use event_log::{DEFAULT_LOG_FILE, EventLog, TranscodeEvent, TranscodeEventKind};
pub use ffmpeg_command::{Encoder, FfmpegCommand, FfmpegEncoder};
pub use main::{RenditionFailure, RenditionOutput, TranscodeSummary, VideoTranscoder};
pub use rendition_ladder::{RenditionLadder, RenditionSpec};
pub use state_store::{
    DEFAULT_STATE_FILE, JobState, RenditionRecord, RenditionStatus, StateStore, job_key,
};
