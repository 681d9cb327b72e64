use anyhow::{Context, Result};
use rust_i18n::t;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// 註冊 Ctrl-C 處理器，回傳所有元件共用的中斷旗標
///
/// 旗標只會被設為 `true`；進行中的工作在下一個檢查點停止。
pub fn setup_shutdown_signal() -> Result<Arc<AtomicBool>> {
    let shutdown_signal = Arc::new(AtomicBool::new(false));
    let signal_clone = Arc::clone(&shutdown_signal);

    ctrlc::set_handler(move || {
        signal_clone.store(true, Ordering::SeqCst);
        eprintln!("\n{}", t!("common.interrupted"));
    })
    .context("無法設定 Ctrl-C 處理器")?;

    Ok(shutdown_signal)
}
