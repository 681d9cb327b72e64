use crate::component::{SharpestFrameExtractor, VideoTranscoder};
use crate::config::Config;
use crate::pause;
use anyhow::Result;
use console::{Term, style};
use rust_i18n::t;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

pub fn run_sharpest_frame_extractor(
    term: &Term,
    shutdown_signal: &Arc<AtomicBool>,
    config: &mut Config,
) -> Result<()> {
    let extractor = SharpestFrameExtractor::new(
        config.settings.extractor.clone(),
        Arc::clone(shutdown_signal),
    );

    if let Err(e) = extractor.run(config) {
        eprintln!("{} {}", style(t!("common.error_prefix")).red().bold(), e);
    }

    pause(term)?;
    Ok(())
}

pub fn run_video_transcoder(
    term: &Term,
    shutdown_signal: &Arc<AtomicBool>,
    config: &mut Config,
) -> Result<()> {
    let transcoder = VideoTranscoder::new(
        config.settings.transcoder.clone(),
        Arc::clone(shutdown_signal),
    );

    if let Err(e) = transcoder.run(config) {
        eprintln!("{} {}", style(t!("common.error_prefix")).red().bold(), e);
    }

    pause(term)?;
    Ok(())
}
