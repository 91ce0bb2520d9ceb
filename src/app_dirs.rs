use directories::ProjectDirs;
use std::path::PathBuf;

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    /// Where diagnostics go while the terminal is in raw mode
    pub fn log_path() -> PathBuf {
        if let Ok(home) = std::env::var("HOME") {
            PathBuf::from(home)
                .join(".local")
                .join("state")
                .join("glovetype")
                .join("glovetype.log")
        } else {
            ProjectDirs::from("", "", "glovetype")
                .map(|proj_dirs| proj_dirs.data_local_dir().join("glovetype.log"))
                .unwrap_or_else(|| PathBuf::from("glovetype.log"))
        }
    }
}
