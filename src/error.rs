use std::path::Path;
use thiserror::Error;

/// 影片處理錯誤分類
///
/// - `Config`：設定或來源資訊錯誤，工作開始前即中止
/// - `Decode`：單一影格損壞，只截斷目前的視窗
/// - `Io`：單一視窗或單一 rendition 的寫入失敗，記錄後繼續
/// - `Encode`：編碼器執行失敗，該 rendition 標記為失敗
/// - `Cancelled`：收到中斷信號後被丟棄的排隊工作
#[derive(Debug, Error)]
pub enum VideoError {
    #[error("設定錯誤: {0}")]
    Config(String),

    #[error("解碼錯誤: {0}")]
    Decode(String),

    #[error("I/O 錯誤 ({context}): {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("編碼錯誤: {0}")]
    Encode(String),

    #[error("操作已取消")]
    Cancelled,
}

impl VideoError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode(message.into())
    }

    pub fn encode(message: impl Into<String>) -> Self {
        Self::Encode(message.into())
    }

    pub fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            context: path.display().to_string(),
            source,
        }
    }

    /// 是否為工作層級的致命錯誤
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

pub type VideoResult<T> = Result<T, VideoError>;
