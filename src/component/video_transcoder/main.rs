use super::event_log::{EventLog, TranscodeEventKind};
use super::ffmpeg_command::{Encoder, FfmpegEncoder};
use super::rendition_ladder::RenditionSpec;
use super::state_store::{RenditionStatus, StateStore, job_key};
use crate::config::{Config, TranscoderSettings};
use crate::error::{VideoError, VideoResult};
use crate::tools::{
    collect_input_videos, ensure_directory_exists, file_stem_or, unique_output_names,
};
use anyhow::Result;
use console::style;
use dialoguer::Input;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, error, info, warn};
use rust_i18n::t;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenditionOutput {
    pub rendition_id: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenditionFailure {
    pub rendition_id: String,
    pub reason: String,
}

/// 單一轉檔工作的結果
#[derive(Debug)]
pub struct TranscodeSummary {
    pub job_key: String,
    /// 本次執行完成的 rendition
    pub completed: Vec<RenditionOutput>,
    /// 先前已完成而略過的 rendition
    pub skipped: Vec<RenditionOutput>,
    pub failed: Vec<RenditionFailure>,
    /// 收到中斷信號而未處理的 rendition
    pub pending: Vec<String>,
    pub elapsed: Duration,
}

impl TranscodeSummary {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty() && self.pending.is_empty()
    }

    /// 所有已完成（含略過）的輸出檔
    pub fn outputs(&self) -> impl Iterator<Item = &RenditionOutput> {
        self.skipped.iter().chain(self.completed.iter())
    }
}

/// 可續傳的多解析度轉檔器
///
/// 依序處理列表中每個 rendition，每次狀態轉換都寫入狀態檔；
/// 重新執行同一工作時略過已完成的項目。
pub struct VideoTranscoder<E: Encoder = FfmpegEncoder> {
    settings: TranscoderSettings,
    encoder: E,
    shutdown_signal: Arc<AtomicBool>,
}

impl VideoTranscoder<FfmpegEncoder> {
    #[must_use]
    pub const fn new(settings: TranscoderSettings, shutdown_signal: Arc<AtomicBool>) -> Self {
        Self::with_encoder(settings, FfmpegEncoder, shutdown_signal)
    }
}

impl<E: Encoder> VideoTranscoder<E> {
    #[must_use]
    pub const fn with_encoder(
        settings: TranscoderSettings,
        encoder: E,
        shutdown_signal: Arc<AtomicBool>,
    ) -> Self {
        Self {
            settings,
            encoder,
            shutdown_signal,
        }
    }

    #[must_use]
    pub const fn settings(&self) -> &TranscoderSettings {
        &self.settings
    }

    #[must_use]
    pub const fn encoder(&self) -> &E {
        &self.encoder
    }

    /// 互動模式：單一影片可指定輸出名稱，資料夾則為每個影片產生不重複的名稱
    pub fn run(&self, config: &mut Config) -> Result<()> {
        println!("{}", style(t!("transcode.title")).cyan().bold());

        let input_path = self.prompt_input_path()?;
        let input = PathBuf::from(&input_path);
        let videos = collect_input_videos(
            &input,
            &[
                self.settings.output_dir.as_path(),
                self.settings.temp_dir.as_path(),
            ],
        )?;

        if videos.is_empty() {
            println!("{}", style(t!("common.no_videos")).yellow());
            return Ok(());
        }
        config.remember_path(&input_path);

        let output_names = if input.is_file() {
            vec![self.prompt_output_name(&file_stem_or(&input, "output"))?]
        } else {
            unique_output_names(&input, &videos)
        };

        println!(
            "{}",
            style(t!(
                "transcode.found",
                count = videos.len(),
                renditions = self.settings.ladder.len(),
                dir = self.settings.output_dir.display()
            ))
            .green()
        );

        for (video, output_name) in videos.iter().zip(&output_names) {
            if self.shutdown_signal.load(Ordering::SeqCst) {
                warn!("收到中斷信號，停止處理");
                break;
            }

            println!(
                "\n{} {} → {}",
                style(t!("transcode.processing")).cyan(),
                style(video.display()).bold(),
                output_name
            );

            match self.transcode_video(video, output_name) {
                Ok(summary) => Self::print_summary(&summary),
                Err(e) => {
                    error!("轉檔失敗 {}: {e}", video.display());
                    println!(
                        "  {} {}",
                        style("✗").red(),
                        t!("transcode.failed", error = e)
                    );
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

    fn prompt_output_name(&self, default: &str) -> Result<String> {
        let name: String = Input::new()
            .with_prompt(t!("transcode.output_prompt"))
            .default(default.to_string())
            .interact_text()?;
        Ok(name.trim().to_string())
    }

    /// 將影片轉為列表中所有解析度，輸出 `{output_name}_{寬}x{高}_{位元率}k.mp4`
    ///
    /// 設定錯誤或狀態檔無法寫入時中止並回傳錯誤；單一 rendition 失敗只記錄在結果中。
    pub fn transcode_video(&self, input_path: &Path, output_name: &str) -> VideoResult<TranscodeSummary> {
        let start_time = Instant::now();
        let ladder = &self.settings.ladder;
        ladder.validate()?;

        if output_name.trim().is_empty() {
            return Err(VideoError::config("輸出名稱不可為空"));
        }
        if !input_path.is_file() {
            return Err(VideoError::config(format!(
                "找不到輸入影片: {}",
                input_path.display()
            )));
        }

        ensure_directory_exists(&self.settings.output_dir)?;
        ensure_directory_exists(&self.settings.temp_dir)?;

        let key = job_key(input_path, output_name);
        let mut store = StateStore::new(&self.settings.state_file, key.clone());
        let state = store.load()?;
        let events = EventLog::new(&self.settings.log_file);

        info!("開始轉檔: {key}，共 {} 種解析度", ladder.len());

        let progress_bar = ProgressBar::new(ladder.len() as u64);
        progress_bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .expect("Invalid progress bar template")
                .progress_chars("#>-"),
        );

        let mut summary = TranscodeSummary {
            job_key: key,
            completed: Vec::new(),
            skipped: Vec::new(),
            failed: Vec::new(),
            pending: Vec::new(),
            elapsed: Duration::ZERO,
        };

        for spec in ladder.iter() {
            let rendition_id = spec.id();

            if self.shutdown_signal.load(Ordering::SeqCst) {
                record_event(
                    &events,
                    &summary.job_key,
                    &rendition_id,
                    TranscodeEventKind::Interrupted,
                    None,
                );
                summary.pending.push(rendition_id);
                continue;
            }

            if let RenditionStatus::Completed { output_path } = state.status(&rendition_id) {
                info!("略過已完成的 {rendition_id}: {}", output_path.display());
                record_event(
                    &events,
                    &summary.job_key,
                    &rendition_id,
                    TranscodeEventKind::Skipped,
                    None,
                );
                summary.skipped.push(RenditionOutput {
                    rendition_id,
                    path: output_path,
                });
                progress_bar.inc(1);
                continue;
            }

            progress_bar.set_message(rendition_id.clone());
            store.mark_in_progress(&rendition_id)?;
            record_event(
                &events,
                &summary.job_key,
                &rendition_id,
                TranscodeEventKind::Started,
                None,
            );

            let file_name = spec.output_file_name(output_name);
            let temp_path = self.settings.temp_dir.join(&file_name);
            let final_path = self.settings.output_dir.join(&file_name);

            match self.produce_rendition(input_path, spec, &temp_path, &final_path) {
                Ok(()) => {
                    store.mark_completed(&rendition_id, &final_path)?;
                    info!("完成 {rendition_id}: {}", final_path.display());
                    let detail = final_path.display().to_string();
                    record_event(
                        &events,
                        &summary.job_key,
                        &rendition_id,
                        TranscodeEventKind::Completed,
                        Some(&detail),
                    );
                    summary.completed.push(RenditionOutput {
                        rendition_id,
                        path: final_path,
                    });
                }
                Err(e) => {
                    error!("{rendition_id} 轉檔失敗: {e}");
                    remove_if_exists(&temp_path);
                    let reason = e.to_string();
                    store.mark_failed(&rendition_id, &reason)?;
                    record_event(
                        &events,
                        &summary.job_key,
                        &rendition_id,
                        TranscodeEventKind::Failed,
                        Some(&reason),
                    );
                    summary.failed.push(RenditionFailure {
                        rendition_id,
                        reason,
                    });
                }
            }
            progress_bar.inc(1);
        }
        progress_bar.finish_and_clear();

        if !summary.pending.is_empty() {
            warn!("收到中斷信號，{} 種解析度尚未處理", summary.pending.len());
        }

        summary.elapsed = start_time.elapsed();
        info!(
            "{}: 完成 {}，略過 {}，失敗 {}，耗時 {:.2}s",
            summary.job_key,
            summary.completed.len(),
            summary.skipped.len(),
            summary.failed.len(),
            summary.elapsed.as_secs_f64()
        );

        Ok(summary)
    }

    /// 編碼到暫存目錄，成功後才移到輸出目錄
    fn produce_rendition(
        &self,
        input_path: &Path,
        spec: &RenditionSpec,
        temp_path: &Path,
        final_path: &Path,
    ) -> VideoResult<()> {
        // 上次中斷留下的暫存檔
        remove_if_exists(temp_path);

        self.encoder.encode(
            input_path,
            spec,
            &self.settings.ladder.audio_bitrate(),
            temp_path,
        )?;

        if !temp_path.is_file() {
            return Err(VideoError::encode(format!(
                "編碼器未產生輸出檔: {}",
                temp_path.display()
            )));
        }

        promote(temp_path, final_path)
    }

    fn print_summary(summary: &TranscodeSummary) {
        for output in &summary.skipped {
            println!(
                "  {} {}",
                style("-").dim(),
                t!("transcode.already_done", id = output.rendition_id)
            );
        }
        for output in &summary.completed {
            println!(
                "  {} {} → {}",
                style("✓").green(),
                output.rendition_id,
                output.path.display()
            );
        }
        for failure in &summary.failed {
            println!(
                "  {} {}: {}",
                style("✗").red(),
                failure.rendition_id,
                failure.reason
            );
        }
        if !summary.pending.is_empty() {
            println!(
                "  {} {}",
                style("!").yellow(),
                t!("transcode.pending", ids = summary.pending.join(", "))
            );
        }
        if !summary.failed.is_empty() {
            println!("{}", style(t!("transcode.retry_hint")).yellow());
        }
        println!(
            "{}",
            t!("common.elapsed", secs = format!("{:.2}", summary.elapsed.as_secs_f64()))
        );
    }
}

/// 同一檔案系統直接 rename；跨檔案系統時先複製到同目錄的暫存名稱再 rename
fn promote(temp_path: &Path, final_path: &Path) -> VideoResult<()> {
    if fs::rename(temp_path, final_path).is_ok() {
        return Ok(());
    }

    debug!("rename 失敗，改用複製: {}", temp_path.display());
    let partial_path = final_path.with_extension("mp4.partial");
    let result = fs::copy(temp_path, &partial_path)
        .map_err(|e| VideoError::io(&partial_path, e))
        .and_then(|_| {
            fs::rename(&partial_path, final_path).map_err(|e| VideoError::io(final_path, e))
        });

    if result.is_err() {
        remove_if_exists(&partial_path);
        return result;
    }

    remove_if_exists(temp_path);
    Ok(())
}

/// 事件紀錄寫入失敗不影響轉檔，只記錄警告
fn record_event(
    events: &EventLog,
    job: &str,
    rendition_id: &str,
    kind: TranscodeEventKind,
    detail: Option<&str>,
) {
    if let Err(e) = events.append(job, rendition_id, kind, detail) {
        warn!("無法寫入事件紀錄 {}: {e}", events.path().display());
    }
}

fn remove_if_exists(path: &Path) {
    if !path.exists() {
        return;
    }
    if let Err(e) = fs::remove_file(path) {
        warn!("無法刪除暫存檔 {}: {e}", path.display());
    }
}
