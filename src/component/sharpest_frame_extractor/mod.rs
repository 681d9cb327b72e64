//! 每秒最清晰影格擷取元件
//!
//! 流程：
//! A. 讀取來源 fps 與影格總數
//! B. 依序解碼，每張影格以 Laplacian 變異數評分
//! C. 每 fps 張為一個視窗，選出分數最高的影格
//! D. 交給存檔工作池平行寫成 PNG

mod frame_sink;
mod main;
mod sharpness;
mod window_aggregator;

pub use frame_sink::{
    DEFAULT_SAVE_WORKERS, FrameSink, PngFrameSink, SaveOutcome, SavePool, artifact_file_name,
};
pub use main::{ExtractionSummary, SavedArtifact, SharpestFrameExtractor, WindowFailure};
pub use sharpness::laplacian_variance;
pub use window_aggregator::{AggregatorState, SelectedFrame, WindowAggregator, select_best};
