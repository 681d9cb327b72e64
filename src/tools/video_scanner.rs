use crate::tools::file_stem_or;
use anyhow::{Result, bail};
use std::collections::{HashMap, HashSet};
use std::path::{Component, Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// 視為影片的副檔名（小寫、不含點）
pub const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "mkv", "mov", "avi", "webm", "m4v", "wmv", "flv", "ts", "mts", "m2ts", "mpg", "mpeg",
    "3gp",
];

#[derive(Debug, Clone)]
pub struct VideoFileInfo {
    pub path: PathBuf,
    pub size: u64,
}

#[must_use]
pub fn is_video_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| VIDEO_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
}

/// 遞迴掃描資料夾中的影片，依檔案大小排序（由小到大）
pub fn scan_video_files(directory: &Path) -> Result<Vec<VideoFileInfo>> {
    scan_video_files_excluding(directory, &[])
}

/// 同 `scan_video_files`，但不進入 `excluded` 中的子資料夾（例如輸出目錄）
pub fn scan_video_files_excluding(
    directory: &Path,
    excluded: &[&Path],
) -> Result<Vec<VideoFileInfo>> {
    let excluded: Vec<PathBuf> = excluded
        .iter()
        .filter_map(|path| path.canonicalize().ok())
        .collect();

    let mut video_files: Vec<VideoFileInfo> = WalkDir::new(directory)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| !is_excluded_dir(entry, &excluded))
        .filter_map(std::result::Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| is_video_file(entry.path()))
        .filter_map(|entry| {
            let metadata = entry.metadata().ok()?;
            Some(VideoFileInfo {
                path: entry.into_path(),
                size: metadata.len(),
            })
        })
        .collect();

    video_files.sort_by_key(|file| file.size);
    Ok(video_files)
}

fn is_excluded_dir(entry: &DirEntry, excluded: &[PathBuf]) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && !excluded.is_empty()
        && entry
            .path()
            .canonicalize()
            .is_ok_and(|path| excluded.contains(&path))
}

/// 輸入可以是單一影片或資料夾；資料夾模式會略過 `excluded` 中的子資料夾
pub fn collect_input_videos(input: &Path, excluded: &[&Path]) -> Result<Vec<PathBuf>> {
    if input.is_file() {
        return Ok(vec![input.to_path_buf()]);
    }
    if input.is_dir() {
        return Ok(scan_video_files_excluding(input, excluded)?
            .into_iter()
            .map(|file| file.path)
            .collect());
    }
    bail!("路徑不存在: {}", input.display())
}

/// 資料夾模式下每個影片的輸出名稱，順序與 `videos` 相同
///
/// 預設使用檔名；不同子資料夾有同名影片時改用相對路徑（`a/clip.mp4` → `a_clip`），
/// 仍然重複時加上 `_2`、`_3`… 以保證名稱唯一。
#[must_use]
pub fn unique_output_names(root: &Path, videos: &[PathBuf]) -> Vec<String> {
    let mut stem_counts: HashMap<String, usize> = HashMap::new();
    for video in videos {
        *stem_counts.entry(file_stem_or(video, "output")).or_default() += 1;
    }

    let mut taken = HashSet::new();
    videos
        .iter()
        .map(|video| {
            let stem = file_stem_or(video, "output");
            let base = if stem_counts.get(&stem).copied().unwrap_or(0) > 1 {
                relative_name(root, video).unwrap_or(stem)
            } else {
                stem
            };

            let mut name = base.clone();
            let mut suffix = 2;
            while !taken.insert(name.clone()) {
                name = format!("{base}_{suffix}");
                suffix += 1;
            }
            name
        })
        .collect()
}

fn relative_name(root: &Path, video: &Path) -> Option<String> {
    let relative = video.strip_prefix(root).unwrap_or(video).with_extension("");
    let parts: Vec<String> = relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();

    (!parts.is_empty()).then(|| parts.join("_"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_is_video_file() {
        assert!(is_video_file(Path::new("/a/b.MP4")));
        assert!(is_video_file(Path::new("clip.mkv")));
        assert!(!is_video_file(Path::new("notes.txt")));
        assert!(!is_video_file(Path::new("no_extension")));
    }

    #[test]
    fn test_scan_video_files_sorted_by_size() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("big.mp4"), vec![0u8; 300]).unwrap();
        fs::create_dir(temp.path().join("sub")).unwrap();
        fs::write(temp.path().join("sub").join("small.mkv"), vec![0u8; 10]).unwrap();
        fs::write(temp.path().join("readme.txt"), "skip").unwrap();

        let files = scan_video_files(temp.path()).unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].size, 10);
        assert_eq!(files[1].size, 300);
    }

    #[test]
    fn test_collect_input_videos_single_file() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("one.mov");
        fs::write(&file, "x").unwrap();
        assert_eq!(collect_input_videos(&file, &[]).unwrap(), vec![file]);
        assert!(collect_input_videos(&temp.path().join("missing"), &[]).is_err());
    }

    #[test]
    fn test_collect_input_videos_skips_excluded_dirs() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("movie.mp4");
        let output_dir = temp.path().join("transcoded_output");
        let temp_dir = temp.path().join("temp_transcode");
        fs::write(&source, "src").unwrap();
        fs::create_dir_all(&output_dir).unwrap();
        fs::create_dir_all(&temp_dir).unwrap();
        fs::write(output_dir.join("movie_1280x720_2500k.mp4"), "out").unwrap();
        fs::write(temp_dir.join("movie_854x480_1200k.mp4"), "half").unwrap();

        let all = collect_input_videos(temp.path(), &[]).unwrap();
        assert_eq!(all.len(), 3);

        let inputs =
            collect_input_videos(temp.path(), &[output_dir.as_path(), temp_dir.as_path()]).unwrap();
        assert_eq!(inputs, vec![source]);
    }

    #[test]
    fn test_excluded_dir_given_as_relative_path() {
        let temp = TempDir::new().unwrap();
        let output_dir = temp.path().join("out");
        fs::create_dir_all(&output_dir).unwrap();
        fs::write(output_dir.join("a.mp4"), "x").unwrap();

        // 同一目錄的另一種寫法
        let alias = temp.path().join("out").join("..").join("out");
        assert!(collect_input_videos(temp.path(), &[alias.as_path()]).unwrap().is_empty());
    }

    #[test]
    fn test_unique_output_names_for_same_stem() {
        let root = Path::new("/videos");
        let videos = vec![
            root.join("a").join("clip.mp4"),
            root.join("b").join("clip.mkv"),
            root.join("other.mp4"),
        ];

        let names = unique_output_names(root, &videos);
        assert_eq!(names, vec!["a_clip", "b_clip", "other"]);
    }

    #[test]
    fn test_unique_output_names_resolves_remaining_collisions() {
        let root = Path::new("/videos");
        let videos = vec![
            root.join("a").join("clip.mp4"),
            root.join("a").join("clip.mkv"),
            root.join("a_clip.mov"),
        ];

        let names = unique_output_names(root, &videos);
        assert_eq!(names, vec!["a_clip", "a_clip_2", "a_clip_3"]);
        let distinct: HashSet<&String> = names.iter().collect();
        assert_eq!(distinct.len(), names.len());
    }
}
