//! Data path utilities - engine state lives under ~/.local/share/framescan/

use std::path::{Path, PathBuf};

/// Default data directory.
/// Uses the platform data dir (~/.local/share on Linux, %APPDATA% on Windows).
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| {
            dirs::home_dir()
                .map(|h| h.join(".local").join("share"))
                .unwrap_or_else(|| PathBuf::from("."))
        })
        .join("framescan")
}

/// Resolve the data directory, honoring an explicit override.
pub fn data_dir(override_dir: Option<&Path>) -> PathBuf {
    override_dir
        .map(Path::to_path_buf)
        .unwrap_or_else(default_data_dir)
}

/// Saved report history
pub fn reports_path(data_dir: &Path) -> PathBuf {
    data_dir.join("reports.json")
}

/// Saved credit ledger
pub fn ledger_path(data_dir: &Path) -> PathBuf {
    data_dir.join("ledger.json")
}

/// Ensure the data directory exists.
pub fn ensure_data_dir(data_dir: &Path) -> std::io::Result<PathBuf> {
    std::fs::create_dir_all(data_dir)?;
    Ok(data_dir.to_path_buf())
}
