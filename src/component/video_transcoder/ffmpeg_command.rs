use super::rendition_ladder::RenditionSpec;
use crate::error::{VideoError, VideoResult};
use log::debug;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// 產生單一 rendition 的編碼器
///
/// 成功時 `output_path` 必須是完整可播放的檔案；失敗時呼叫端負責清除殘留檔案。
pub trait Encoder {
    fn encode(
        &self,
        input_path: &Path,
        rendition: &RenditionSpec,
        audio_bitrate: &str,
        output_path: &Path,
    ) -> VideoResult<()>;
}

/// H.264/AAC MP4 的 ffmpeg 命令
pub struct FfmpegCommand {
    source_path: PathBuf,
    destination_path: PathBuf,
    rendition: RenditionSpec,
    audio_bitrate: String,
}

impl FfmpegCommand {
    #[must_use]
    pub fn new(
        source_path: &Path,
        destination_path: &Path,
        rendition: &RenditionSpec,
        audio_bitrate: &str,
    ) -> Self {
        Self {
            source_path: source_path.to_path_buf(),
            destination_path: destination_path.to_path_buf(),
            rendition: *rendition,
            audio_bitrate: audio_bitrate.to_string(),
        }
    }

    #[must_use]
    pub fn destination_path(&self) -> &Path {
        &self.destination_path
    }

    #[must_use]
    pub fn build_command(&self) -> Command {
        let mut cmd = Command::new("ffmpeg");
        let video_bitrate = self.rendition.video_bitrate();

        cmd.args([
            "-hide_banner",
            "-nostdin",
            "-loglevel", "error",
            "-y",
            "-i", &format!("file:{}", self.source_path.display()),
            "-map", "0:v:0",
            "-map", "0:a:0?",
            "-sn", "-dn",
            "-vf", &format!("scale={}:{}", self.rendition.width, self.rendition.height),
            "-c:v", "libx264",
            "-preset", "medium",
            "-pix_fmt", "yuv420p",
            "-b:v", &video_bitrate,
            "-c:a", "aac",
            "-b:a", &self.audio_bitrate,
            "-movflags", "+faststart",
            "-f", "mp4",
        ]);
        cmd.arg(&self.destination_path);

        cmd
    }
}

/// 透過系統的 ffmpeg 執行編碼
#[derive(Debug, Default, Clone, Copy)]
pub struct FfmpegEncoder;

impl Encoder for FfmpegEncoder {
    fn encode(
        &self,
        input_path: &Path,
        rendition: &RenditionSpec,
        audio_bitrate: &str,
        output_path: &Path,
    ) -> VideoResult<()> {
        let command = FfmpegCommand::new(input_path, output_path, rendition, audio_bitrate);
        debug!("執行 ffmpeg: {}", rendition.id());

        let output = command
            .build_command()
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| VideoError::encode(format!("無法執行 ffmpeg: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let reason = stderr.trim();
            return Err(VideoError::encode(if reason.is_empty() {
                format!("ffmpeg 結束代碼異常: {}", output.status)
            } else {
                format!("ffmpeg 失敗 ({}): {reason}", output.status)
            }));
        }

        if !command.destination_path().is_file() {
            return Err(VideoError::encode("ffmpeg 未產生輸出檔"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args_of(cmd: &Command) -> Vec<String> {
        cmd.get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    fn value_after(args: &[String], flag: &str) -> Option<String> {
        args.iter()
            .position(|a| a == flag)
            .and_then(|i| args.get(i + 1).cloned())
    }

    #[test]
    fn test_build_command_uses_rendition_settings() {
        let spec = RenditionSpec::new(1280, 720, 2500);
        let cmd = FfmpegCommand::new(
            Path::new("/videos/in.mov"),
            Path::new("/tmp/scratch/movie_1280x720_2500k.mp4"),
            &spec,
            "192k",
        );
        let args = args_of(&cmd.build_command());

        assert_eq!(value_after(&args, "-vf").as_deref(), Some("scale=1280:720"));
        assert_eq!(value_after(&args, "-b:v").as_deref(), Some("2500k"));
        assert_eq!(value_after(&args, "-b:a").as_deref(), Some("192k"));
        assert_eq!(value_after(&args, "-c:v").as_deref(), Some("libx264"));
        assert_eq!(value_after(&args, "-c:a").as_deref(), Some("aac"));
        assert_eq!(value_after(&args, "-i").as_deref(), Some("file:/videos/in.mov"));
        assert_eq!(
            args.last().map(String::as_str),
            Some("/tmp/scratch/movie_1280x720_2500k.mp4")
        );
    }

    #[test]
    fn test_destination_path_is_kept() {
        let spec = RenditionSpec::new(854, 480, 1200);
        let cmd = FfmpegCommand::new(Path::new("a.mp4"), Path::new("b.mp4"), &spec, "128k");
        assert_eq!(cmd.destination_path(), Path::new("b.mp4"));
    }
}
