use crate::error::{VideoError, VideoResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// 單一輸出規格：解析度與視訊位元率（kbit/s）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RenditionSpec {
    pub width: u32,
    pub height: u32,
    pub video_bitrate_kbps: u32,
}

impl RenditionSpec {
    #[must_use]
    pub const fn new(width: u32, height: u32, video_bitrate_kbps: u32) -> Self {
        Self {
            width,
            height,
            video_bitrate_kbps,
        }
    }

    /// 狀態檔與輸出檔名使用的識別碼，例如 `1280x720_2500k`
    #[must_use]
    pub fn id(&self) -> String {
        format!("{}x{}_{}k", self.width, self.height, self.video_bitrate_kbps)
    }

    #[must_use]
    pub fn video_bitrate(&self) -> String {
        format!("{}k", self.video_bitrate_kbps)
    }

    #[must_use]
    pub fn output_file_name(&self, output_name: &str) -> String {
        format!("{output_name}_{}.mp4", self.id())
    }
}

/// 依序（高畫質在前）產生的輸出規格列表，共用同一個音訊位元率
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenditionLadder {
    pub renditions: Vec<RenditionSpec>,
    pub audio_bitrate_kbps: u32,
}

impl Default for RenditionLadder {
    fn default() -> Self {
        Self {
            renditions: vec![
                RenditionSpec::new(1920, 1080, 5000),
                RenditionSpec::new(1280, 720, 2500),
                RenditionSpec::new(854, 480, 1200),
            ],
            audio_bitrate_kbps: 192,
        }
    }
}

impl RenditionLadder {
    #[must_use]
    pub const fn new(renditions: Vec<RenditionSpec>, audio_bitrate_kbps: u32) -> Self {
        Self {
            renditions,
            audio_bitrate_kbps,
        }
    }

    #[must_use]
    pub fn audio_bitrate(&self) -> String {
        format!("{}k", self.audio_bitrate_kbps)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RenditionSpec> {
        self.renditions.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.renditions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.renditions.is_empty()
    }

    /// 工作開始前檢查；任何一項不合法都是設定錯誤
    pub fn validate(&self) -> VideoResult<()> {
        if self.renditions.is_empty() {
            return Err(VideoError::config("輸出規格列表是空的"));
        }
        if self.audio_bitrate_kbps == 0 {
            return Err(VideoError::config("音訊位元率必須大於 0"));
        }

        let mut seen = HashSet::new();
        for (index, spec) in self.renditions.iter().enumerate() {
            if spec.width == 0 || spec.height == 0 {
                return Err(VideoError::config(format!(
                    "第 {} 項解析度不合法: {}x{}",
                    index + 1,
                    spec.width,
                    spec.height
                )));
            }
            if spec.video_bitrate_kbps == 0 {
                return Err(VideoError::config(format!(
                    "第 {} 項視訊位元率必須大於 0",
                    index + 1
                )));
            }
            if !seen.insert(spec.id()) {
                return Err(VideoError::config(format!(
                    "輸出規格重複: {}",
                    spec.id()
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ladder() {
        let ladder = RenditionLadder::default();
        assert_eq!(ladder.len(), 3);
        assert_eq!(ladder.renditions[0], RenditionSpec::new(1920, 1080, 5000));
        assert_eq!(ladder.audio_bitrate(), "192k");
        assert!(ladder.validate().is_ok());
    }

    #[test]
    fn test_rendition_naming() {
        let spec = RenditionSpec::new(1280, 720, 2500);
        assert_eq!(spec.id(), "1280x720_2500k");
        assert_eq!(spec.video_bitrate(), "2500k");
        assert_eq!(spec.output_file_name("movie"), "movie_1280x720_2500k.mp4");
    }

    #[test]
    fn test_invalid_ladders_are_config_errors() {
        let cases = [
            RenditionLadder::new(Vec::new(), 192),
            RenditionLadder::new(vec![RenditionSpec::new(0, 720, 2500)], 192),
            RenditionLadder::new(vec![RenditionSpec::new(1280, 0, 2500)], 192),
            RenditionLadder::new(vec![RenditionSpec::new(1280, 720, 0)], 192),
            RenditionLadder::new(vec![RenditionSpec::new(1280, 720, 2500)], 0),
            RenditionLadder::new(
                vec![
                    RenditionSpec::new(1280, 720, 2500),
                    RenditionSpec::new(1280, 720, 2500),
                ],
                192,
            ),
        ];

        for ladder in cases {
            assert!(matches!(ladder.validate(), Err(VideoError::Config(_))));
        }
    }

    #[test]
    fn test_ladder_serde_shape() {
        let json = r#"{
            "renditions": [ { "width": 640, "height": 360, "video_bitrate_kbps": 800 } ],
            "audio_bitrate_kbps": 128
        }"#;
        let ladder: RenditionLadder = serde_json::from_str(json).unwrap();
        assert_eq!(ladder.renditions[0].id(), "640x360_800k");
        assert_eq!(ladder.audio_bitrate(), "128k");
    }
}
