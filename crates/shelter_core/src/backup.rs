use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;

use crate::error::CodecError;

/// `chrono` format of the suffix appended to backup copies.
pub const BACKUP_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// `<path>.backup_<timestamp>`, next to the original.
pub fn backup_path(path: &Path, timestamp: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".backup_");
    name.push(timestamp);
    PathBuf::from(name)
}

/// Copies `path` to a timestamped sibling using the local clock.
pub fn create_backup(path: &Path) -> Result<PathBuf, CodecError> {
    let timestamp = Local::now().format(BACKUP_TIMESTAMP_FORMAT).to_string();
    let target = backup_path(path, &timestamp);
    fs::copy(path, &target).map_err(|e| CodecError::io(path, e))?;
    log::info!("backed up {} to {}", path.display(), target.display());
    Ok(target)
}
