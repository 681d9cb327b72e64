use super::frame_sink::{FrameSink, PngFrameSink, SavePool};
use super::sharpness::laplacian_variance;
use super::window_aggregator::WindowAggregator;
use crate::config::{Config, ExtractorSettings};
use crate::error::{VideoError, VideoResult};
use crate::tools::{
    FfmpegFrameReader, FrameSource, collect_input_videos, ensure_directory_exists, file_stem_or,
    unique_output_names,
};
use anyhow::Result;
use console::style;
use dialoguer::Input;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, error, info, warn};
use rust_i18n::t;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// 已存檔的最清晰影格
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedArtifact {
    pub window_index: u64,
    pub frame_index: u64,
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowFailure {
    pub window_index: u64,
    pub reason: String,
}

/// 單一影片的擷取結果，存檔與失敗皆依秒數排序
#[derive(Debug)]
pub struct ExtractionSummary {
    pub video_name: String,
    pub fps: u32,
    pub total_windows: u64,
    pub saved: Vec<SavedArtifact>,
    pub failures: Vec<WindowFailure>,
    /// 沒有任何影格的視窗（解碼提早結束）
    pub skipped_windows: u64,
    /// 因讀取或解碼錯誤而截斷的視窗
    pub truncated_windows: u64,
    /// 收到中斷信號後被丟棄的存檔工作
    pub cancelled_saves: usize,
    pub interrupted: bool,
    pub elapsed: Duration,
}

impl ExtractionSummary {
    #[must_use]
    pub fn saved_count(&self) -> usize {
        self.saved.len()
    }

    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.failures.len()
    }
}

#[derive(Debug, Default)]
struct ReadStats {
    empty_windows: u64,
    truncated_windows: u64,
    interrupted: bool,
}

/// 每秒最清晰影格擷取器
///
/// 單一執行緒依序解碼並評分，選出的影格交給存檔工作池平行寫入。
pub struct SharpestFrameExtractor {
    settings: ExtractorSettings,
    shutdown_signal: Arc<AtomicBool>,
}

impl SharpestFrameExtractor {
    #[must_use]
    pub const fn new(settings: ExtractorSettings, shutdown_signal: Arc<AtomicBool>) -> Self {
        Self {
            settings,
            shutdown_signal,
        }
    }

    #[must_use]
    pub const fn settings(&self) -> &ExtractorSettings {
        &self.settings
    }

    /// 互動模式：詢問輸入路徑（影片或資料夾）後逐一處理
    ///
    /// 資料夾中同名的影片以相對路徑區分輸出檔名，避免互相覆蓋。
    pub fn run(&self, config: &mut Config) -> Result<()> {
        println!("{}", style(t!("extract.title")).cyan().bold());

        let input_path = self.prompt_input_path()?;
        let input = PathBuf::from(&input_path);
        let videos = collect_input_videos(&input, &[self.settings.output_dir.as_path()])?;

        if videos.is_empty() {
            println!("{}", style(t!("common.no_videos")).yellow());
            return Ok(());
        }
        config.remember_path(&input_path);

        let video_names = if input.is_file() {
            vec![file_stem_or(&input, "video")]
        } else {
            unique_output_names(&input, &videos)
        };

        println!(
            "{}",
            style(t!(
                "extract.found",
                count = videos.len(),
                dir = self.settings.output_dir.display()
            ))
            .green()
        );

        for (index, (video, video_name)) in videos.iter().zip(&video_names).enumerate() {
            if self.shutdown_signal.load(Ordering::SeqCst) {
                warn!("收到中斷信號，停止處理");
                break;
            }

            println!(
                "\n{} [{}/{}] {}",
                style(t!("extract.processing")).cyan(),
                index + 1,
                videos.len(),
                style(video.display()).bold()
            );

            match self.extract_video_as(video, video_name) {
                Ok(summary) => Self::print_summary(&summary, &self.settings.output_dir),
                Err(e) => {
                    error!("處理影片失敗 {}: {e}", video.display());
                    println!("  {} {}", style("✗").red(), t!("extract.failed", error = e));
                }
            }
        }

        Ok(())
    }

    fn prompt_input_path(&self) -> Result<String> {
        let path: String = Input::new()
            .with_prompt(t!("common.input_prompt"))
            .interact_text()?;
        Ok(path.trim().to_string())
    }

    /// 擷取影片每一秒最清晰的影格，存為 `{影片名稱}_sec{NNNN}.png`
    ///
    /// 無法建立輸出目錄或開啟來源時直接回傳錯誤；單一視窗的錯誤記錄在結果中。
    pub fn extract_sharpest_per_second(&self, video_path: &Path) -> VideoResult<ExtractionSummary> {
        self.extract_video_as(video_path, &file_stem_or(video_path, "video"))
    }

    /// 同上，但以 `video_name` 作為輸出檔名前綴
    pub fn extract_video_as(
        &self,
        video_path: &Path,
        video_name: &str,
    ) -> VideoResult<ExtractionSummary> {
        ensure_directory_exists(&self.settings.output_dir)?;

        let source = FfmpegFrameReader::open(video_path)?;
        let sink = Arc::new(PngFrameSink::new(&self.settings.output_dir, video_name));

        self.extract_from_source(source, video_name, sink)
    }

    /// 以任意解碼來源與存檔方式執行擷取流程
    ///
    /// 讀取迴圈結束後立即釋放來源，再等待所有存檔工作完成。
    pub fn extract_from_source<S: FrameSource>(
        &self,
        source: S,
        video_name: &str,
        sink: Arc<dyn FrameSink>,
    ) -> VideoResult<ExtractionSummary> {
        let start_time = Instant::now();

        let fps = source.frame_rate();
        let frame_count = source.frame_count();
        if frame_count == 0 {
            return Err(VideoError::config(format!("{video_name}: 影格總數為 0")));
        }

        let mut aggregator = WindowAggregator::new(fps, frame_count)?;
        let mut pool = SavePool::new(
            self.settings.max_workers,
            sink,
            Arc::clone(&self.shutdown_signal),
        )?;
        let total_windows = aggregator.total_windows();

        info!("影片: {video_name}, FPS: {fps}, 長度: {total_windows}s");

        let progress_bar = ProgressBar::new(total_windows);
        progress_bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len}s ({eta}) {msg}")
                .expect("Invalid progress bar template")
                .progress_chars("#>-"),
        );
        progress_bar.set_message(video_name.to_string());

        let stats = {
            let mut source = source;
            self.read_windows(&mut source, &mut aggregator, &mut pool, &progress_bar)
        };
        progress_bar.finish_and_clear();

        let outcomes = pool.wait_all();

        let mut saved = Vec::new();
        let mut failures = Vec::new();
        let mut cancelled_saves = 0;
        for outcome in outcomes {
            match outcome.result {
                Ok(path) => saved.push(SavedArtifact {
                    window_index: outcome.window_index,
                    frame_index: outcome.frame_index,
                    path,
                }),
                Err(VideoError::Cancelled) => cancelled_saves += 1,
                Err(e) => failures.push(WindowFailure {
                    window_index: outcome.window_index,
                    reason: e.to_string(),
                }),
            }
        }

        let never_started = total_windows - aggregator.windows_started();
        let summary = ExtractionSummary {
            video_name: video_name.to_string(),
            fps,
            total_windows,
            saved,
            failures,
            skipped_windows: stats.empty_windows + never_started,
            truncated_windows: stats.truncated_windows,
            cancelled_saves,
            interrupted: stats.interrupted,
            elapsed: start_time.elapsed(),
        };

        info!(
            "{video_name}: 已存檔 {} 張最清晰影格（每秒一張），失敗 {}，耗時 {:.2}s",
            summary.saved_count(),
            summary.failed_count(),
            summary.elapsed.as_secs_f64()
        );

        Ok(summary)
    }

    fn read_windows<S: FrameSource>(
        &self,
        source: &mut S,
        aggregator: &mut WindowAggregator,
        pool: &mut SavePool,
        progress_bar: &ProgressBar,
    ) -> ReadStats {
        let mut stats = ReadStats::default();

        loop {
            if self.shutdown_signal.load(Ordering::SeqCst) {
                warn!("收到中斷信號，停止讀取影格");
                aggregator.drain();
                stats.interrupted = true;
                break;
            }

            let Some(window_index) = aggregator.begin_window() else {
                break;
            };

            let mut exhausted = false;
            while !aggregator.is_window_full() {
                match source.read_frame() {
                    Ok(Some(frame)) => match laplacian_variance(&frame) {
                        Ok(score) => {
                            aggregator.accept(frame, score);
                        }
                        Err(e) => {
                            warn!("第 {window_index} 秒影格無效，截斷視窗: {e}");
                            stats.truncated_windows += 1;
                            break;
                        }
                    },
                    Ok(None) => {
                        exhausted = true;
                        break;
                    }
                    Err(e) => {
                        warn!("第 {window_index} 秒讀取失敗，截斷視窗: {e}");
                        stats.truncated_windows += 1;
                        break;
                    }
                }
            }

            if !aggregator.finish_window(|selected| pool.submit(selected)) {
                debug!("第 {window_index} 秒沒有影格，略過");
                stats.empty_windows += 1;
            }
            progress_bar.inc(1);

            if exhausted {
                debug!("解碼串流已結束（第 {window_index} 秒）");
                aggregator.drain();
                break;
            }
        }

        stats
    }

    fn print_summary(summary: &ExtractionSummary, output_dir: &Path) {
        println!(
            "  {} {}",
            style("✓").green(),
            t!(
                "extract.video_info",
                name = summary.video_name,
                fps = summary.fps,
                secs = summary.total_windows
            )
        );
        println!(
            "  {}",
            style(t!(
                "extract.saved",
                count = summary.saved_count(),
                dir = output_dir.display()
            ))
            .green()
        );

        if summary.failed_count() > 0 {
            println!(
                "  {}",
                style(t!("extract.failed_count", count = summary.failed_count())).red()
            );
            for failure in &summary.failures {
                println!(
                    "    {}",
                    t!(
                        "extract.failed_window",
                        second = failure.window_index,
                        reason = failure.reason
                    )
                );
            }
        }
        if summary.skipped_windows > 0 {
            println!(
                "  {}",
                style(t!("extract.skipped", count = summary.skipped_windows)).yellow()
            );
        }
        if summary.interrupted {
            println!(
                "  {} {}",
                style("!").yellow(),
                t!("extract.interrupted", count = summary.cancelled_saves)
            );
        }
        println!(
            "{}",
            t!("common.elapsed", secs = format!("{:.2}", summary.elapsed.as_secs_f64()))
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::Frame;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// 每張影格只有一個灰階像素資料列，分數由像素決定
    struct ScriptedSource {
        fps: u32,
        frame_count: u64,
        frames: VecDeque<VideoResult<Option<Frame>>>,
    }

    impl ScriptedSource {
        fn from_frames(fps: u32, frames: Vec<Frame>) -> Self {
            Self {
                fps,
                frame_count: frames.len() as u64,
                frames: frames.into_iter().map(|f| Ok(Some(f))).collect(),
            }
        }
    }

    impl FrameSource for ScriptedSource {
        fn frame_rate(&self) -> u32 {
            self.fps
        }

        fn frame_count(&self) -> u64 {
            self.frame_count
        }

        fn read_frame(&mut self) -> VideoResult<Option<Frame>> {
            self.frames.pop_front().unwrap_or(Ok(None))
        }
    }

    #[derive(Default)]
    struct MemorySink {
        saved: Mutex<Vec<(u64, u64)>>,
    }

    impl FrameSink for MemorySink {
        fn save(&self, window_index: u64, frame: &Frame) -> VideoResult<PathBuf> {
            self.saved.lock().unwrap().push((window_index, frame.index));
            Ok(PathBuf::from(format!("mem_sec{window_index:04}")))
        }
    }

    /// 中間像素越亮，Laplacian 變異數越高
    fn frame_with_peak(index: u64, peak: u8) -> Frame {
        Frame::new(index, 3, 1, 1, vec![0, peak, 0])
    }

    fn extractor(shutdown: bool) -> SharpestFrameExtractor {
        SharpestFrameExtractor::new(
            ExtractorSettings::default(),
            Arc::new(AtomicBool::new(shutdown)),
        )
    }

    #[test]
    fn test_picks_sharpest_frame_per_window() {
        let peaks = [1u8, 50, 20, 9, 3, 9];
        let frames = peaks
            .iter()
            .enumerate()
            .map(|(i, &p)| frame_with_peak(i as u64, p))
            .collect();
        let sink = Arc::new(MemorySink::default());

        let summary = extractor(false)
            .extract_from_source(ScriptedSource::from_frames(3, frames), "clip", sink.clone())
            .unwrap();

        assert_eq!(summary.total_windows, 2);
        assert_eq!(summary.saved_count(), 2);
        assert_eq!(summary.saved[0].frame_index, 1);
        // 同分時取最前面的影格
        assert_eq!(summary.saved[1].frame_index, 3);
        assert_eq!(sink.saved.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_trailing_frames_are_not_processed() {
        let frames = (0..7).map(|i| frame_with_peak(i, 10)).collect();
        let sink = Arc::new(MemorySink::default());

        let summary = extractor(false)
            .extract_from_source(ScriptedSource::from_frames(3, frames), "clip", sink.clone())
            .unwrap();

        assert_eq!(summary.total_windows, 2);
        assert_eq!(summary.saved_count(), 2);
        let saved = sink.saved.lock().unwrap();
        assert!(saved.iter().all(|&(_, frame)| frame < 6));
    }

    #[test]
    fn test_read_error_truncates_window_only() {
        let mut frames: VecDeque<VideoResult<Option<Frame>>> = VecDeque::new();
        frames.push_back(Ok(Some(frame_with_peak(0, 5))));
        frames.push_back(Err(VideoError::decode("corrupt packet")));
        for i in 1..4 {
            frames.push_back(Ok(Some(frame_with_peak(i, i as u8))));
        }
        let source = ScriptedSource {
            fps: 3,
            frame_count: 6,
            frames,
        };

        let summary = extractor(false)
            .extract_from_source(source, "clip", Arc::new(MemorySink::default()))
            .unwrap();

        assert_eq!(summary.truncated_windows, 1);
        assert_eq!(summary.saved_count(), 2);
        assert_eq!(summary.saved[0].frame_index, 0);
        assert_eq!(summary.saved[1].frame_index, 3);
    }

    #[test]
    fn test_malformed_frame_truncates_window() {
        let frames = vec![
            frame_with_peak(0, 40),
            Frame::new(1, 0, 0, 1, Vec::new()),
            frame_with_peak(2, 1),
            frame_with_peak(3, 2),
        ];
        let source = ScriptedSource {
            fps: 2,
            frame_count: 4,
            frames: frames.into_iter().map(|f| Ok(Some(f))).collect(),
        };

        let summary = extractor(false)
            .extract_from_source(source, "clip", Arc::new(MemorySink::default()))
            .unwrap();

        assert_eq!(summary.truncated_windows, 1);
        assert_eq!(summary.saved[0].frame_index, 0);
        assert_eq!(summary.saved[1].frame_index, 3);
    }

    #[test]
    fn test_early_end_of_stream_skips_remaining_windows() {
        let frames: VecDeque<_> = (0..4).map(|i| Ok(Some(frame_with_peak(i, 1)))).collect();
        let source = ScriptedSource {
            fps: 2,
            frame_count: 10,
            frames,
        };

        let summary = extractor(false)
            .extract_from_source(source, "clip", Arc::new(MemorySink::default()))
            .unwrap();

        assert_eq!(summary.total_windows, 5);
        assert_eq!(summary.saved_count(), 2);
        assert_eq!(summary.skipped_windows, 3);
    }

    #[test]
    fn test_zero_fps_and_zero_frames_are_fatal() {
        let no_fps = ScriptedSource::from_frames(0, vec![frame_with_peak(0, 1)]);
        assert!(matches!(
            extractor(false).extract_from_source(no_fps, "clip", Arc::new(MemorySink::default())),
            Err(VideoError::Config(_))
        ));

        let no_frames = ScriptedSource::from_frames(30, Vec::new());
        assert!(matches!(
            extractor(false).extract_from_source(no_frames, "clip", Arc::new(MemorySink::default())),
            Err(VideoError::Config(_))
        ));
    }

    #[test]
    fn test_shutdown_stops_before_reading() {
        let frames = (0..6).map(|i| frame_with_peak(i, 1)).collect();
        let summary = extractor(true)
            .extract_from_source(
                ScriptedSource::from_frames(3, frames),
                "clip",
                Arc::new(MemorySink::default()),
            )
            .unwrap();

        assert!(summary.interrupted);
        assert_eq!(summary.saved_count(), 0);
        assert_eq!(summary.skipped_windows, 2);
    }
}
