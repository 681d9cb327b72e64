use crate::error::{VideoError, VideoResult};
use crate::tools::frame::Frame;
use crate::tools::{VideoInfo, get_video_info};
use log::{debug, warn};
use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;
use std::process::{Child, ChildStdout, Command, Stdio};

/// 依序產生影格的解碼來源
///
/// 只會在單一讀取執行緒中使用；`read_frame` 回傳 `Ok(None)` 代表串流結束。
pub trait FrameSource {
    /// 整數 fps
    fn frame_rate(&self) -> u32;

    /// 來源回報的總影格數
    fn frame_count(&self) -> u64;

    fn read_frame(&mut self) -> VideoResult<Option<Frame>>;
}

/// 透過 ffmpeg 管線讀取 rgb24 原始影格
///
/// Drop 時會終止並回收 ffmpeg 程序，確保解碼資源在任何情況下都被釋放。
pub struct FfmpegFrameReader {
    child: Child,
    reader: BufReader<ChildStdout>,
    info: VideoInfo,
    frame_bytes: usize,
    next_index: u64,
    finished: bool,
}

impl FfmpegFrameReader {
    pub fn open(path: &Path) -> VideoResult<Self> {
        if !path.is_file() {
            return Err(VideoError::config(format!(
                "影片檔案不存在: {}",
                path.display()
            )));
        }

        let info = get_video_info(path)?;
        if info.whole_fps() == 0 {
            return Err(VideoError::config(format!(
                "fps 必須為正整數: {} ({:.3})",
                path.display(),
                info.frame_rate
            )));
        }
        if info.frame_count == 0 {
            return Err(VideoError::config(format!(
                "無法取得影格總數: {}",
                path.display()
            )));
        }

        let mut child = Command::new("ffmpeg")
            .args(["-hide_banner", "-nostdin", "-loglevel", "error", "-noautorotate", "-i"])
            .arg(path)
            .args(["-map", "0:v:0", "-an", "-sn", "-dn", "-f", "rawvideo", "-pix_fmt", "rgb24", "pipe:1"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| VideoError::config(format!("無法啟動 ffmpeg 解碼: {e}")))?;

        let Some(stdout) = child.stdout.take() else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(VideoError::config("無法取得 ffmpeg 標準輸出"));
        };

        let frame_bytes = info.width as usize * info.height as usize * 3;
        debug!(
            "開啟解碼來源 {}: {}x{}, fps={}, frames={}",
            path.display(),
            info.width,
            info.height,
            info.whole_fps(),
            info.frame_count
        );

        Ok(Self {
            child,
            reader: BufReader::new(stdout),
            info,
            frame_bytes,
            next_index: 0,
            finished: false,
        })
    }

    #[must_use]
    pub const fn info(&self) -> &VideoInfo {
        &self.info
    }
}

impl FrameSource for FfmpegFrameReader {
    fn frame_rate(&self) -> u32 {
        self.info.whole_fps()
    }

    fn frame_count(&self) -> u64 {
        self.info.frame_count
    }

    fn read_frame(&mut self) -> VideoResult<Option<Frame>> {
        if self.finished {
            return Ok(None);
        }

        let mut buf = vec![0u8; self.frame_bytes];
        match self.reader.read_exact(&mut buf) {
            Ok(()) => {
                let frame = Frame::rgb(self.next_index, self.info.width, self.info.height, buf);
                self.next_index += 1;
                Ok(Some(frame))
            }
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                // 不完整的尾端影格直接捨棄
                self.finished = true;
                Ok(None)
            }
            Err(e) => {
                self.finished = true;
                Err(VideoError::decode(format!(
                    "讀取影格 {} 失敗: {e}",
                    self.next_index
                )))
            }
        }
    }
}

impl Drop for FfmpegFrameReader {
    fn drop(&mut self) {
        if let Ok(None) = self.child.try_wait() {
            if let Err(e) = self.child.kill() {
                warn!("無法終止 ffmpeg 解碼程序: {e}");
            }
        }
        let _ = self.child.wait();
    }
}
