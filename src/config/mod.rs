pub mod load;
pub mod save;
pub mod types;

pub use load::SETTINGS_FILE;
pub use save::{add_recent_path, save_settings};
pub use types::{Config, ExtractorSettings, Language, MAX_RECENT_PATHS, TranscoderSettings, UserSettings};
