mod ffprobe_info;
mod frame;
mod frame_reader;
mod path_validator;
mod video_scanner;

pub use ffprobe_info::{VideoInfo, get_video_info};
pub use frame::Frame;
pub use frame_reader::{FfmpegFrameReader, FrameSource};
pub use path_validator::{ensure_directory_exists, file_stem_or};
pub use video_scanner::{
    VIDEO_EXTENSIONS, VideoFileInfo, collect_input_videos, is_video_file, scan_video_files,
    scan_video_files_excluding, unique_output_names,
};
