use crate::error::{VideoError, VideoResult};
use serde::Deserialize;
use std::path::Path;
use std::process::Command;

#[derive(Debug, Clone)]
pub struct VideoInfo {
    pub duration_seconds: f64,
    pub width: u32,
    pub height: u32,
    pub frame_rate: f64,
    pub frame_count: u64,
}

impl VideoInfo {
    /// 整數 fps（無條件捨去，29.97 → 29）
    #[must_use]
    pub fn whole_fps(&self) -> u32 {
        if self.frame_rate.is_finite() && self.frame_rate > 0.0 {
            self.frame_rate.trunc() as u32
        } else {
            0
        }
    }
}

#[derive(Deserialize)]
struct FfprobeOutput {
    format: Option<FormatInfo>,
    streams: Option<Vec<StreamInfo>>,
}

#[derive(Deserialize)]
struct FormatInfo {
    duration: Option<String>,
}

#[derive(Deserialize)]
struct StreamInfo {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
    nb_frames: Option<String>,
    duration: Option<String>,
}

/// 使用 ffprobe 取得影片資訊
pub fn get_video_info(path: &Path) -> VideoResult<VideoInfo> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .output()
        .map_err(|e| VideoError::config(format!("無法執行 ffprobe ({}): {e}", path.display())))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(VideoError::config(format!(
            "ffprobe 執行失敗 ({}): {}",
            path.display(),
            stderr.trim()
        )));
    }

    parse_ffprobe_output(&String::from_utf8_lossy(&output.stdout), path)
}

fn parse_ffprobe_output(stdout: &str, path: &Path) -> VideoResult<VideoInfo> {
    let probe: FfprobeOutput = serde_json::from_str(stdout)
        .map_err(|e| VideoError::config(format!("無法解析 ffprobe 輸出: {e}")))?;

    let video_stream = probe
        .streams
        .as_ref()
        .and_then(|streams| {
            streams
                .iter()
                .find(|s| s.codec_type.as_deref() == Some("video"))
        })
        .ok_or_else(|| VideoError::config(format!("找不到視訊串流: {}", path.display())))?;

    let width = video_stream
        .width
        .ok_or_else(|| VideoError::config("無法取得影片寬度"))?;
    let height = video_stream
        .height
        .ok_or_else(|| VideoError::config("無法取得影片高度"))?;

    // 影片長度：優先從 format，其次從 stream
    let duration_seconds = probe
        .format
        .as_ref()
        .and_then(|f| f.duration.as_ref())
        .or(video_stream.duration.as_ref())
        .and_then(|d| d.parse::<f64>().ok())
        .unwrap_or(0.0);

    let frame_rate = video_stream
        .r_frame_rate
        .as_deref()
        .and_then(parse_frame_rate)
        .or_else(|| video_stream.avg_frame_rate.as_deref().and_then(parse_frame_rate))
        .ok_or_else(|| VideoError::config(format!("無法取得影片幀率: {}", path.display())))?;

    // 沒有 nb_frames 的容器（例如 mkv）改用時長推算
    let frame_count = video_stream
        .nb_frames
        .as_ref()
        .and_then(|n| n.parse::<u64>().ok())
        .filter(|&n| n > 0)
        .unwrap_or_else(|| (duration_seconds * frame_rate).round().max(0.0) as u64);

    Ok(VideoInfo {
        duration_seconds,
        width,
        height,
        frame_rate,
        frame_count,
    })
}

/// 解析幀率字串（例如 "30/1" 或 "30000/1001"）
fn parse_frame_rate(rate: &str) -> Option<f64> {
    if let Some((num_str, den_str)) = rate.split_once('/') {
        let num: f64 = num_str.parse().ok()?;
        let den: f64 = den_str.parse().ok()?;
        if den > 0.0 && num > 0.0 {
            return Some(num / den);
        }
        return None;
    }
    rate.parse::<f64>().ok().filter(|r| *r > 0.0)
}
