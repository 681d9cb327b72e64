//! 功能元件模組
//!
//! 每個子模組實現一個獨立的功能，包含主要邏輯和專用工具

pub mod sharpest_frame_extractor;
pub mod video_transcoder;

pub use sharpest_frame_extractor::SharpestFrameExtractor;
pub use video_transcoder::VideoTranscoder;
