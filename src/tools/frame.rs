use crate::error::{VideoError, VideoResult};

/// 解碼後的單一影格
///
/// `index` 為影格在來源中的順序（從 0 開始），`data` 為逐列排列的像素資料。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub index: u64,
    pub width: u32,
    pub height: u32,
    pub channels: u8,
    pub data: Vec<u8>,
}

impl Frame {
    #[must_use]
    pub const fn new(index: u64, width: u32, height: u32, channels: u8, data: Vec<u8>) -> Self {
        Self {
            index,
            width,
            height,
            channels,
            data,
        }
    }

    #[must_use]
    pub const fn rgb(index: u64, width: u32, height: u32, data: Vec<u8>) -> Self {
        Self::new(index, width, height, 3, data)
    }

    #[must_use]
    pub const fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// 檢查尺寸、通道數與資料長度是否一致
    pub fn validate(&self) -> VideoResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(VideoError::decode(format!(
                "影格 {} 尺寸為零: {}x{}",
                self.index, self.width, self.height
            )));
        }

        if !matches!(self.channels, 1 | 3 | 4) {
            return Err(VideoError::decode(format!(
                "影格 {} 通道數不支援: {}",
                self.index, self.channels
            )));
        }

        let expected = self.pixel_count() * usize::from(self.channels);
        if self.data.len() != expected {
            return Err(VideoError::decode(format!(
                "影格 {} 資料長度錯誤: 預期 {expected}，實際 {}",
                self.index,
                self.data.len()
            )));
        }

        Ok(())
    }
}
