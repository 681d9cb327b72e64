use crate::error::{VideoError, VideoResult};
use std::path::Path;

/// 確保目錄存在，不存在時建立（包含上層目錄）
pub fn ensure_directory_exists(path: &Path) -> VideoResult<()> {
    if path.is_dir() {
        return Ok(());
    }
    if path.exists() {
        return Err(VideoError::config(format!(
            "路徑不是資料夾: {}",
            path.display()
        )));
    }
    std::fs::create_dir_all(path).map_err(|e| VideoError::io(path, e))
}

/// 取得不含副檔名的檔名，失敗時使用預設值
#[must_use]
pub fn file_stem_or(path: &Path, fallback: &str) -> String {
    path.file_stem()
        .map_or_else(|| fallback.to_string(), |s| s.to_string_lossy().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_ensure_directory_creates_nested() {
        let temp = TempDir::new().unwrap();
        let nested = temp.path().join("a").join("b");
        ensure_directory_exists(&nested).unwrap();
        assert!(nested.is_dir());
        // 已存在時不報錯
        ensure_directory_exists(&nested).unwrap();
    }

    #[test]
    fn test_ensure_directory_rejects_file() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("file.txt");
        std::fs::write(&file, "x").unwrap();
        assert!(ensure_directory_exists(&file).unwrap_err().is_fatal());
    }

    #[test]
    fn test_file_stem_or() {
        assert_eq!(file_stem_or(Path::new("/videos/clip.v2.mp4"), "video"), "clip.v2");
        assert_eq!(file_stem_or(Path::new("/"), "video"), "video");
    }
}
