use super::window_aggregator::SelectedFrame;
use crate::error::{VideoError, VideoResult};
use crate::tools::Frame;
use image::{ExtendedColorType, ImageError, ImageFormat};
use log::{debug, error};
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};

/// 預設存檔執行緒數
pub const DEFAULT_SAVE_WORKERS: usize = 4;

/// 將選出的影格寫入儲存空間
pub trait FrameSink: Send + Sync {
    fn save(&self, window_index: u64, frame: &Frame) -> VideoResult<PathBuf>;
}

/// 輸出檔名：`{影片名稱}_sec{四位數秒數}.png`
#[must_use]
pub fn artifact_file_name(video_name: &str, window_index: u64) -> String {
    format!("{video_name}_sec{window_index:04}.png")
}

/// 以 PNG 格式寫入輸出目錄，同名檔案直接覆寫
#[derive(Debug, Clone)]
pub struct PngFrameSink {
    output_dir: PathBuf,
    video_name: String,
}

impl PngFrameSink {
    #[must_use]
    pub fn new(output_dir: &Path, video_name: &str) -> Self {
        Self {
            output_dir: output_dir.to_path_buf(),
            video_name: video_name.to_string(),
        }
    }

    #[must_use]
    pub fn artifact_path(&self, window_index: u64) -> PathBuf {
        self.output_dir
            .join(artifact_file_name(&self.video_name, window_index))
    }
}

impl FrameSink for PngFrameSink {
    fn save(&self, window_index: u64, frame: &Frame) -> VideoResult<PathBuf> {
        frame.validate()?;

        let color = match frame.channels {
            1 => ExtendedColorType::L8,
            3 => ExtendedColorType::Rgb8,
            _ => ExtendedColorType::Rgba8,
        };

        let path = self.artifact_path(window_index);
        image::save_buffer_with_format(
            &path,
            &frame.data,
            frame.width,
            frame.height,
            color,
            ImageFormat::Png,
        )
        .map_err(|e| match e {
            ImageError::IoError(io) => VideoError::io(&path, io),
            other => VideoError::io(&path, std::io::Error::other(other)),
        })?;

        Ok(path)
    }
}

/// 單一視窗的存檔結果
#[derive(Debug)]
pub struct SaveOutcome {
    pub window_index: u64,
    pub frame_index: u64,
    pub result: VideoResult<PathBuf>,
}

/// 固定執行緒數的存檔工作池
///
/// `submit` 依視窗順序派送，完成順序不固定；`wait_all` 等待所有工作結束後
/// 依視窗編號排序回傳。排隊中的工作數超過上限時 `submit` 會先等待一個完成，
/// 避免解碼速度遠快於存檔時影格在記憶體中堆積。
pub struct SavePool {
    pool: ThreadPool,
    sink: Arc<dyn FrameSink>,
    shutdown_signal: Arc<AtomicBool>,
    sender: Sender<SaveOutcome>,
    receiver: Receiver<SaveOutcome>,
    max_pending: usize,
    submitted: usize,
    finished: Vec<SaveOutcome>,
}

impl SavePool {
    pub fn new(
        workers: usize,
        sink: Arc<dyn FrameSink>,
        shutdown_signal: Arc<AtomicBool>,
    ) -> VideoResult<Self> {
        if workers == 0 {
            return Err(VideoError::config("存檔執行緒數必須大於 0"));
        }

        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("frame-sink-{i}"))
            .build()
            .map_err(|e| VideoError::config(format!("無法建立存檔工作池: {e}")))?;

        let (sender, receiver) = mpsc::channel();

        Ok(Self {
            pool,
            sink,
            shutdown_signal,
            sender,
            receiver,
            max_pending: workers * 2,
            submitted: 0,
            finished: Vec::new(),
        })
    }

    #[must_use]
    pub const fn submitted(&self) -> usize {
        self.submitted
    }

    pub fn submit(&mut self, selected: SelectedFrame) {
        while self.submitted - self.finished.len() >= self.max_pending {
            match self.receiver.recv() {
                Ok(outcome) => self.finished.push(outcome),
                Err(_) => break,
            }
        }

        let sink = Arc::clone(&self.sink);
        let sender = self.sender.clone();
        let shutdown_signal = Arc::clone(&self.shutdown_signal);
        self.submitted += 1;

        self.pool.spawn(move || {
            // 收到中斷信號後，尚未開始的工作直接丟棄
            let result = if shutdown_signal.load(Ordering::SeqCst) {
                Err(VideoError::Cancelled)
            } else {
                sink.save(selected.window_index, &selected.frame)
            };

            match &result {
                Ok(path) => debug!("第 {} 秒已存檔: {}", selected.window_index, path.display()),
                Err(VideoError::Cancelled) => {}
                Err(e) => error!("第 {} 秒存檔失敗: {e}", selected.window_index),
            }

            let _ = sender.send(SaveOutcome {
                window_index: selected.window_index,
                frame_index: selected.frame.index,
                result,
            });
        });
    }

    /// 等待所有已派送的存檔工作，依視窗編號排序回傳
    #[must_use]
    pub fn wait_all(self) -> Vec<SaveOutcome> {
        let Self {
            pool,
            sender,
            receiver,
            mut finished,
            ..
        } = self;

        drop(sender);
        finished.extend(receiver.iter());
        drop(pool);

        finished.sort_by_key(|outcome| outcome.window_index);
        finished
    }
}
